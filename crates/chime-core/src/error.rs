use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChimeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),
}

pub type Result<T> = std::result::Result<T, ChimeError>;
