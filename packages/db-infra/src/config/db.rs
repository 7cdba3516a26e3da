use std::env;
use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::error::DbInfraError;

/// Runtime environment; decides naming safety rules and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Prod,
    Test,
}

impl RuntimeEnv {
    /// Reads `SKETCHRELAY_ENV` (`prod` | `test`), defaulting to `prod`.
    pub fn from_env() -> Result<Self, DbInfraError> {
        match env::var("SKETCHRELAY_ENV") {
            Err(_) => Ok(RuntimeEnv::Prod),
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "" | "prod" | "production" => Ok(RuntimeEnv::Prod),
                "test" => Ok(RuntimeEnv::Test),
                other => Err(DbInfraError::config(format!(
                    "SKETCHRELAY_ENV must be 'prod' or 'test', got '{other}'"
                ))),
            },
        }
    }
}

/// Which database engine backs the shared game store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Postgres,
    SqliteFile,
    SqliteMemory,
}

impl DbKind {
    /// Reads `SKETCHRELAY_DB` (`postgres` | `sqlite-file` | `sqlite-memory`),
    /// defaulting to `sqlite-file`.
    pub fn from_env() -> Result<Self, DbInfraError> {
        match env::var("SKETCHRELAY_DB") {
            Err(_) => Ok(DbKind::SqliteFile),
            Ok(raw) => raw.parse(),
        }
    }

    pub fn is_sqlite(self) -> bool {
        matches!(self, DbKind::SqliteFile | DbKind::SqliteMemory)
    }
}

impl std::str::FromStr for DbKind {
    type Err = DbInfraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DbKind::Postgres),
            "" | "sqlite" | "sqlite-file" => Ok(DbKind::SqliteFile),
            "sqlite-memory" | "memory" => Ok(DbKind::SqliteMemory),
            other => Err(DbInfraError::config(format!(
                "unknown database kind '{other}' (expected postgres, sqlite-file or sqlite-memory)"
            ))),
        }
    }
}

impl From<DbKind> for sea_orm::DatabaseBackend {
    fn from(kind: DbKind) -> Self {
        match kind {
            DbKind::Postgres => sea_orm::DatabaseBackend::Postgres,
            DbKind::SqliteFile | DbKind::SqliteMemory => sea_orm::DatabaseBackend::Sqlite,
        }
    }
}

/// Per-connection session settings applied by the pool's connect hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbSettings {
    Postgres {
        app_name: String,
        statement_timeout: String,
        idle_in_transaction_timeout: String,
    },
    Sqlite {
        busy_timeout_ms: u64,
    },
}

/// Pool sizing for the shared application pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub pool_min: u32,
    pub pool_max: u32,
    pub acquire_timeout_ms: u64,
    pub db_settings: DbSettings,
}

impl PoolSettings {
    /// Defaults per engine, with `SKETCHRELAY_DB_POOL_MAX` and
    /// `SKETCHRELAY_DB_ACQUIRE_TIMEOUT_MS` overrides.
    pub fn for_kind(db_kind: DbKind) -> Result<Self, DbInfraError> {
        let acquire_timeout_ms = parse_var("SKETCHRELAY_DB_ACQUIRE_TIMEOUT_MS")?.unwrap_or(5_000);

        // Every connection to sqlite::memory: is its own database
        if db_kind == DbKind::SqliteMemory {
            return Ok(Self {
                pool_min: 1,
                pool_max: 1,
                acquire_timeout_ms,
                db_settings: DbSettings::Sqlite {
                    busy_timeout_ms: 5_000,
                },
            });
        }

        let pool_max = parse_var("SKETCHRELAY_DB_POOL_MAX")?.unwrap_or(match db_kind {
            DbKind::Postgres => 10,
            _ => 4,
        });
        if pool_max == 0 {
            return Err(DbInfraError::config("SKETCHRELAY_DB_POOL_MAX must be at least 1"));
        }

        let db_settings = match db_kind {
            DbKind::Postgres => DbSettings::Postgres {
                app_name: "sketchrelay".to_string(),
                statement_timeout: "5s".to_string(),
                idle_in_transaction_timeout: "10s".to_string(),
            },
            _ => DbSettings::Sqlite {
                busy_timeout_ms: 5_000,
            },
        };

        Ok(Self {
            pool_min: 1,
            pool_max,
            acquire_timeout_ms,
            db_settings,
        })
    }
}

/// Ordered session statements for a freshly opened connection.
/// SQLite file prerequisites (journal_mode, synchronous) are applied once at bootstrap instead.
pub fn build_session_statements(settings: &DbSettings) -> Vec<String> {
    match settings {
        DbSettings::Sqlite { busy_timeout_ms } => vec![
            "PRAGMA foreign_keys = ON;".to_string(),
            format!("PRAGMA busy_timeout = {busy_timeout_ms};"),
        ],
        DbSettings::Postgres {
            app_name,
            statement_timeout,
            idle_in_transaction_timeout,
        } => vec![
            format!("SET application_name = '{}';", app_name.replace('\'', "''")),
            "SET timezone = 'UTC';".to_string(),
            format!("SET statement_timeout = '{statement_timeout}';"),
            format!("SET idle_in_transaction_session_timeout = '{idle_in_transaction_timeout}';"),
        ],
    }
}

/// Reject configurations that could point tests at a real database.
pub fn validate_db_config(env: RuntimeEnv, db_kind: DbKind) -> Result<(), DbInfraError> {
    if env == RuntimeEnv::Test && db_kind == DbKind::Postgres {
        db_name(env)?;
    }
    Ok(())
}

/// Connection string for the given engine.
pub fn make_conn_spec(env: RuntimeEnv, db_kind: DbKind) -> Result<String, DbInfraError> {
    match db_kind {
        DbKind::Postgres => postgres_url(env),
        DbKind::SqliteFile => Ok(format!("sqlite://{}?mode=rwc", sqlite_file_spec(env)?)),
        DbKind::SqliteMemory => Ok("sqlite::memory:".to_string()),
    }
}

fn postgres_url(env: RuntimeEnv) -> Result<String, DbInfraError> {
    let host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".to_string());
    let name = db_name(env)?;
    let user = must_var("SKETCHRELAY_DB_USER")?;
    let password = must_var("SKETCHRELAY_DB_PASSWORD")?;

    let user = utf8_percent_encode(&user, NON_ALPHANUMERIC);
    let password = utf8_percent_encode(&password, NON_ALPHANUMERIC);
    Ok(format!("postgresql://{user}:{password}@{host}:{port}/{name}"))
}

fn db_name(env: RuntimeEnv) -> Result<String, DbInfraError> {
    let name = must_var("SKETCHRELAY_DB_NAME")?;
    // Test runs must never touch a non-test database
    if env == RuntimeEnv::Test && !name.ends_with("_test") {
        return Err(DbInfraError::config(format!(
            "Test environment requires database name to end with '_test', but got: '{name}'"
        )));
    }
    Ok(name)
}

/// SQLite database file path from `SKETCHRELAY_SQLITE_PATH`.
pub fn sqlite_file_spec(env: RuntimeEnv) -> Result<String, DbInfraError> {
    match env::var("SKETCHRELAY_SQLITE_PATH") {
        Ok(path) if !path.trim().is_empty() => Ok(path),
        _ => Ok(match env {
            RuntimeEnv::Prod => "./sketchrelay.db".to_string(),
            RuntimeEnv::Test => "./sketchrelay_test.db".to_string(),
        }),
    }
}

/// Lock file used to serialize migrations across processes sharing one SQLite file.
pub fn sqlite_lock_path(env: RuntimeEnv) -> Result<PathBuf, DbInfraError> {
    let spec = sqlite_file_spec(env)?;
    Ok(Path::new(&spec).with_extension("migrate.lock"))
}

fn must_var(name: &str) -> Result<String, DbInfraError> {
    env::var(name)
        .map_err(|_| DbInfraError::config(format!("Required environment variable '{name}' is not set")))
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, DbInfraError> {
    match env::var(name) {
        Err(_) => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| DbInfraError::config(format!("{name} has an invalid value: '{raw}'"))),
    }
}
