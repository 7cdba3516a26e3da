use db_infra::{bootstrap_db, DbKind, RuntimeEnv};
use sea_orm::DatabaseConnection;

use crate::error::AppError;

/// Open the shared store for `kind`, migrating it first.
pub async fn connect(env: RuntimeEnv, kind: DbKind) -> Result<DatabaseConnection, AppError> {
    Ok(bootstrap_db(env, kind).await?)
}
