use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ProfStoreError {
    #[error("Profiler result {0} not found")]
    NotFound(Uuid),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
