use weblog_core::error::ThemeError;

use crate::config::ConfigError;

/// Application-level error type.
///
/// Wraps the engine's [`ThemeError`] and the infrastructure errors raised
/// while bootstrapping the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A theme engine error from `weblog_core`.
    #[error(transparent)]
    Theme(#[from] ThemeError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for application results.
pub type AppResult<T> = Result<T, AppError>;
