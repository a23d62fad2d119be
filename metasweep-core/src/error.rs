use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Query failed: {message}")]
    QueryFailed { message: String },

    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    #[error("Operation cancelled: confirmation declined")]
    ConfirmationDeclined,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SweepError>;
