use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::DbInfraError;

pub fn pg_lock_id(key: &str) -> i64 {
    xxh3_64(key.as_bytes()) as i64
}

enum Held {
    Postgres {
        admin_pool: DatabaseConnection,
        lock_key: i64,
    },
    SqliteFile {
        file: File,
        lock_path: PathBuf,
    },
    InMemory,
}

/// A held migration lock. Call [`Guard::release`] when done; dropping a file
/// guard also releases the OS lock.
pub struct Guard {
    held: Option<Held>,
}

impl Guard {
    pub async fn release(mut self) -> Result<(), DbInfraError> {
        match self.held.take() {
            None | Some(Held::InMemory) => Ok(()),
            Some(Held::SqliteFile { file, lock_path }) => {
                if let Err(e) = fs4::fs_std::FileExt::unlock(&file) {
                    // The handle is dropped right after, which releases the lock anyway
                    debug!(error = %e, lock_path = %lock_path.display(), "sqlite unlock returned error");
                }
                Ok(())
            }
            Some(Held::Postgres {
                admin_pool,
                lock_key,
            }) => {
                let stmt = Statement::from_sql_and_values(
                    DatabaseBackend::Postgres,
                    "SELECT pg_advisory_unlock($1) AS unlocked",
                    vec![lock_key.into()],
                );
                match admin_pool.query_one(stmt).await {
                    Ok(Some(row)) => {
                        let unlocked: bool = row.try_get("", "unlocked").map_err(|e| {
                            DbInfraError::migration(format!("failed to read unlock result: {e}"))
                        })?;
                        if !unlocked {
                            warn!(lock_key, "advisory lock unlock returned false");
                        }
                    }
                    Ok(None) => warn!(lock_key, "no result from advisory unlock"),
                    Err(e) => warn!(error = %e, lock_key, "failed to unlock advisory lock"),
                }
                Ok(())
            }
        }
    }
}

/// Non-blocking lock acquisition used to serialize schema migrations
/// across processes that share one database.
#[async_trait]
pub trait BootstrapLock {
    /// `Some(Guard)` when acquired, `None` when another process holds it.
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError>;
}

/// PostgreSQL session advisory lock.
///
/// The admin pool must be min=max=1 so unlock runs on the session that locked.
pub struct PgAdvisoryLock {
    admin_pool: DatabaseConnection,
    lock_key: i64,
}

impl PgAdvisoryLock {
    pub fn new(admin_pool: DatabaseConnection, key: &str) -> Self {
        Self {
            admin_pool,
            lock_key: pg_lock_id(key),
        }
    }
}

#[async_trait]
impl BootstrapLock for PgAdvisoryLock {
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError> {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT pg_try_advisory_lock($1) AS locked",
            vec![self.lock_key.into()],
        );

        let row = self
            .admin_pool
            .query_one(stmt)
            .await
            .map_err(|e| DbInfraError::migration(format!("failed to acquire advisory lock: {e}")))?
            .ok_or_else(|| DbInfraError::migration("pg_try_advisory_lock returned no row"))?;

        let locked: bool = row
            .try_get("", "locked")
            .map_err(|e| DbInfraError::migration(format!("failed to read lock result: {e}")))?;

        if !locked {
            return Ok(None);
        }

        Ok(Some(Guard {
            held: Some(Held::Postgres {
                admin_pool: self.admin_pool.clone(),
                lock_key: self.lock_key,
            }),
        }))
    }
}

/// Exclusive OS file lock on `<db>.migrate.lock`.
pub struct SqliteFileLock {
    lock_path: PathBuf,
}

impl SqliteFileLock {
    pub fn new(lock_path: &Path) -> Self {
        Self {
            lock_path: lock_path.to_path_buf(),
        }
    }
}

#[async_trait]
impl BootstrapLock for SqliteFileLock {
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError> {
        use fs4::fs_std::FileExt;

        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbInfraError::migration(format!("failed to create lock file directory: {e}"))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| DbInfraError::migration(format!("failed to open lock file: {e}")))?;

        match file.try_lock_exclusive() {
            Ok(true) => {
                debug!(lock_path = %self.lock_path.display(), "sqlite file lock acquired");
                Ok(Some(Guard {
                    held: Some(Held::SqliteFile {
                        file,
                        lock_path: self.lock_path.clone(),
                    }),
                }))
            }
            Ok(false) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(DbInfraError::migration(format!(
                "failed to acquire sqlite file lock: {e}"
            ))),
        }
    }
}

/// In-memory databases are private to one process.
pub struct InMemoryLock;

#[async_trait]
impl BootstrapLock for InMemoryLock {
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError> {
        Ok(Some(Guard {
            held: Some(Held::InMemory),
        }))
    }
}
