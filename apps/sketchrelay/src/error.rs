use thiserror::Error;

use crate::errors::domain::{DomainError, InfraErrorKind};

/// Top-level error for the binaries and bootstrap paths.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Configuration error: {detail}")]
    Config { detail: String },
    #[error(transparent)]
    DbInfra(#[from] db_infra::DbInfraError),
    #[error("Realtime feed error: {detail}")]
    Feed {
        detail: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {detail}")]
    Internal { detail: String },
}

impl AppError {
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    pub fn feed(
        detail: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Feed {
            detail: detail.into(),
            source: Box::new(source),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code, printed by the CLI next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::Validation(..)) => "VALIDATION",
            AppError::Domain(DomainError::Conflict(..)) => "CONFLICT",
            AppError::Domain(DomainError::NotFound(..)) => "NOT_FOUND",
            AppError::Domain(DomainError::Infra(InfraErrorKind::Timeout, _)) => "DB_TIMEOUT",
            AppError::Domain(DomainError::Infra(InfraErrorKind::DbUnavailable, _)) => {
                "DB_UNAVAILABLE"
            }
            AppError::Domain(DomainError::Infra(..)) => "DB_ERROR",
            AppError::Config { .. } => "CONFIG_ERROR",
            AppError::DbInfra(_) => "DB_INFRA_ERROR",
            AppError::Feed { .. } => "FEED_ERROR",
            AppError::Json(_) => "SERIALIZATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal { .. } => "INTERNAL",
        }
    }

    /// Process exit code: 2 for rejected input, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Domain(DomainError::Validation(..))
            | AppError::Domain(DomainError::NotFound(..))
            | AppError::Config { .. } => 2,
            _ => 1,
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        AppError::Domain(crate::infra::db_errors::map_db_err(e))
    }
}
