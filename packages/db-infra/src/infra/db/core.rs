use std::future::Future;
use std::str::FromStr;
use std::time::{Duration, Instant};

use migration::{migrate, MigrationCommand, Migrator, MigratorTrait};
use rand::Rng;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    SqlxPostgresConnector, SqlxSqliteConnector, Statement,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, trace, warn};

use crate::config::db::{
    build_session_statements, make_conn_spec, sqlite_lock_path, validate_db_config, DbKind,
    PoolSettings, RuntimeEnv,
};
use crate::error::DbInfraError;
use crate::infra::db::locking::{BootstrapLock, InMemoryLock, PgAdvisoryLock, SqliteFileLock};

fn get_db_engine(db_kind: DbKind) -> &'static str {
    match db_kind {
        DbKind::Postgres => "postgresql",
        DbKind::SqliteFile | DbKind::SqliteMemory => "sqlite",
    }
}

/// Retry with a fixed interval; returns the last error once attempts run out.
async fn retry_connection<T, F, Fut>(
    mut connect_fn: F,
    max_attempts: u32,
    interval_ms: u64,
) -> Result<T, DbInfraError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbInfraError>>,
{
    let mut attempt = 1;
    loop {
        match connect_fn().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(attempts = attempt, interval_ms, "connection_retry=success");
                }
                return Ok(result);
            }
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(_) => {
                warn!(attempt, max_attempts, interval_ms, "connection_retry=failed");
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                attempt += 1;
            }
        }
    }
}

/// Single-connection pool used for migrations and the Postgres advisory lock.
pub async fn build_admin_pool(
    env: RuntimeEnv,
    db_kind: DbKind,
) -> Result<DatabaseConnection, DbInfraError> {
    let url = make_conn_spec(env, db_kind)?;

    let mut opt = ConnectOptions::new(&url);
    opt.min_connections(1)
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(2))
        .sqlx_logging(false);

    if matches!(db_kind, DbKind::Postgres) {
        retry_connection(
            || {
                let opt = opt.clone();
                async move {
                    Database::connect(opt).await.map_err(|e| {
                        DbInfraError::connect(format!("failed to connect to Postgres (admin pool): {e}"))
                    })
                }
            },
            5,
            500,
        )
        .await
    } else {
        Database::connect(opt).await.map_err(|e| {
            DbInfraError::connect(format!("failed to connect to database (admin pool): {e}"))
        })
    }
}

/// Shared application pool with per-connection session settings.
pub async fn build_pool(
    env: RuntimeEnv,
    db_kind: DbKind,
    pool_cfg: &PoolSettings,
) -> Result<DatabaseConnection, DbInfraError> {
    let url = make_conn_spec(env, db_kind)?;

    match db_kind {
        DbKind::SqliteFile | DbKind::SqliteMemory => {
            let connect_opts = SqliteConnectOptions::from_str(&url)
                .map_err(|e| DbInfraError::config(format!("invalid SQLite connection options: {e}")))?
                .create_if_missing(true);

            let db_settings = pool_cfg.db_settings.clone();
            let mut pool_opts = SqlitePoolOptions::new()
                .min_connections(pool_cfg.pool_min)
                .max_connections(pool_cfg.pool_max)
                .acquire_timeout(Duration::from_millis(pool_cfg.acquire_timeout_ms))
                .after_connect(move |conn, _meta| {
                    let settings = db_settings.clone();
                    Box::pin(async move {
                        for stmt in build_session_statements(&settings) {
                            sqlx::query(&stmt).execute(&mut *conn).await?;
                        }
                        trace!("db=sqlite hook=after_connect ok");
                        Ok::<_, sqlx::Error>(())
                    })
                });

            if db_kind == DbKind::SqliteMemory {
                // Recycling the only connection would drop the whole database
                pool_opts = pool_opts.idle_timeout(None).max_lifetime(None);
            }

            let pool = pool_opts
                .connect_with(connect_opts)
                .await
                .map_err(|e| DbInfraError::connect(format!("failed to create SQLite pool: {e}")))?;

            info!(
                engine = "sqlite",
                min = pool_cfg.pool_min,
                max = pool_cfg.pool_max,
                acquire_timeout_ms = pool_cfg.acquire_timeout_ms,
                "pool=create"
            );
            Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
        }
        DbKind::Postgres => {
            let db_settings = pool_cfg.db_settings.clone();
            let pool_opts = PgPoolOptions::new()
                .min_connections(pool_cfg.pool_min)
                .max_connections(pool_cfg.pool_max)
                .acquire_timeout(Duration::from_millis(pool_cfg.acquire_timeout_ms))
                .idle_timeout(Duration::from_secs(30))
                .after_connect(move |conn, _meta| {
                    let settings = db_settings.clone();
                    Box::pin(async move {
                        for stmt in build_session_statements(&settings) {
                            sqlx::query(&stmt).execute(&mut *conn).await?;
                        }
                        Ok::<_, sqlx::Error>(())
                    })
                });

            let pool = retry_connection(
                || {
                    let opts = pool_opts.clone();
                    let url = url.clone();
                    async move {
                        opts.connect(&url).await.map_err(|e| {
                            DbInfraError::connect(format!("failed to connect to Postgres: {e}"))
                        })
                    }
                },
                5,
                500,
            )
            .await?;

            info!(
                engine = "postgres",
                min = pool_cfg.pool_min,
                max = pool_cfg.pool_max,
                acquire_timeout_ms = pool_cfg.acquire_timeout_ms,
                "pool=create"
            );
            Ok(SqlxPostgresConnector::from_sqlx_postgres_pool(pool))
        }
    }
}

/// Open the shared pool with the schema migrated to the latest version.
pub async fn bootstrap_db(env: RuntimeEnv, db_kind: DbKind) -> Result<DatabaseConnection, DbInfraError> {
    validate_db_config(env, db_kind)?;
    let pool_cfg = PoolSettings::for_kind(db_kind)?;

    info!(
        env = ?env,
        db_kind = ?db_kind,
        engine = get_db_engine(db_kind),
        "bootstrap=start"
    );

    let shared = match db_kind {
        DbKind::SqliteMemory => {
            // Migrate on the very connection that will be handed out
            let pool = build_pool(env, db_kind, &pool_cfg).await?;
            migrate_locked(&pool, env, db_kind, MigrationCommand::Up).await?;
            pool
        }
        _ => {
            let admin = build_admin_pool(env, db_kind).await?;
            migrate_locked(&admin, env, db_kind, MigrationCommand::Up).await?;
            admin.close().await.ok();
            build_pool(env, db_kind, &pool_cfg).await?
        }
    };

    info!("bootstrap=ready");
    Ok(shared)
}

/// Run a migration command end to end: connect, lock, migrate, verify.
pub async fn orchestrate_migration(
    env: RuntimeEnv,
    db_kind: DbKind,
    command: MigrationCommand,
) -> Result<(), DbInfraError> {
    validate_db_config(env, db_kind)?;
    let admin = build_admin_pool(env, db_kind).await?;

    if matches!(command, MigrationCommand::Status) {
        return migrate(&admin, command)
            .await
            .map_err(|e| DbInfraError::migration(format!("migration execution failed: {e}")));
    }

    migrate_locked(&admin, env, db_kind, command).await
}

async fn migrate_locked(
    pool: &DatabaseConnection,
    env: RuntimeEnv,
    db_kind: DbKind,
    command: MigrationCommand,
) -> Result<(), DbInfraError> {
    match db_kind {
        DbKind::Postgres => {
            let lock = PgAdvisoryLock::new(pool.clone(), "sketchrelay:migrate");
            migrate_with_lock(pool, lock, env, db_kind, command).await
        }
        DbKind::SqliteFile => {
            let lock = SqliteFileLock::new(&sqlite_lock_path(env)?);
            migrate_with_lock(pool, lock, env, db_kind, command).await
        }
        DbKind::SqliteMemory => migrate_with_lock(pool, InMemoryLock, env, db_kind, command).await,
    }
}

async fn schema_up_to_date(conn: &DatabaseConnection) -> Result<bool, DbInfraError> {
    let expected = Migrator::migrations()
        .last()
        .map(|m| m.name().to_string())
        .unwrap_or_default();

    match Migrator::get_applied_migrations(conn).await {
        Ok(applied) => Ok(applied.len() == Migrator::migrations().len()
            && applied.last().map(|m| m.name()) == Some(expected.as_str())),
        Err(DbErr::Exec(_)) => Ok(false),
        Err(e) => Err(DbInfraError::migration(format!(
            "failed to get applied migrations: {e}"
        ))),
    }
}

async fn migrate_with_lock<L>(
    pool: &DatabaseConnection,
    mut lock: L,
    env: RuntimeEnv,
    db_kind: DbKind,
    command: MigrationCommand,
) -> Result<(), DbInfraError>
where
    L: BootstrapLock,
{
    let acquire_budget = Duration::from_millis(match env {
        RuntimeEnv::Test => 3_000,
        RuntimeEnv::Prod => 10_000,
    });
    let start = Instant::now();
    let mut attempts: u32 = 0;

    let guard = loop {
        attempts += 1;

        // Another client may have finished the migration while we waited
        if matches!(command, MigrationCommand::Up) && schema_up_to_date(pool).await? {
            trace!(attempts, "migrate=skipped up_to_date=true");
            return Ok(());
        }

        if let Some(guard) = lock.try_acquire().await? {
            trace!(attempts, elapsed_ms = start.elapsed().as_millis() as u64, "lock=won");
            break guard;
        }

        let base_delay_ms = (5u64 << attempts.saturating_sub(1).min(8)).min(80);
        let delay_ms = base_delay_ms + rand::rng().random_range(0..4u64);

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        if start.elapsed() >= acquire_budget {
            return Err(DbInfraError::migration(format!(
                "migration lock acquisition timeout after {:?} ({attempts} attempts)",
                start.elapsed()
            )));
        }
    };

    let result = run_migration(pool, db_kind, command).await;

    if let Err(e) = guard.release().await {
        warn!(error = %e, "failed to release migration guard");
    }
    result
}

async fn run_migration(
    pool: &DatabaseConnection,
    db_kind: DbKind,
    command: MigrationCommand,
) -> Result<(), DbInfraError> {
    if matches!(db_kind, DbKind::SqliteFile) {
        for pragma in ["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"] {
            pool.execute(Statement::from_string(DatabaseBackend::Sqlite, pragma))
                .await
                .map_err(|e| DbInfraError::migration(format!("failed to apply '{pragma}': {e}")))?;
        }
    }
    if db_kind.is_sqlite() {
        pool.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "PRAGMA foreign_keys = ON;",
        ))
        .await
        .map_err(|e| DbInfraError::migration(format!("failed to enable foreign keys: {e}")))?;
    }

    migrate(pool, command)
        .await
        .map_err(|e| DbInfraError::migration(format!("migration execution failed: {e}")))?;

    let expected = Migrator::migrations().len();
    let applied = migration::count_applied_migrations(pool).await.unwrap_or(0);
    let ok = match command {
        MigrationCommand::Reset => applied == 0,
        MigrationCommand::Up | MigrationCommand::Fresh | MigrationCommand::Refresh => {
            applied == expected
        }
        MigrationCommand::Down | MigrationCommand::Status => true,
    };
    if !ok {
        return Err(DbInfraError::migration(format!(
            "post-migration check failed for {command:?}: expected {expected}, found {applied} applied"
        )));
    }

    info!(command = ?command, applied, expected, "migrator=ran");
    Ok(())
}
