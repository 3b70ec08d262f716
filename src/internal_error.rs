use std::io;
use std::sync::PoisonError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InternalError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Both the primary and the fallback tier refused the operation.
    #[error("all storage tiers failed (primary: {primary}; fallback: {fallback})")]
    TiersExhausted { primary: String, fallback: String },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),
}

impl<T> From<PoisonError<T>> for InternalError {
    fn from(e: PoisonError<T>) -> InternalError {
        InternalError::Storage(e.to_string())
    }
}

impl From<rusqlite::Error> for InternalError {
    fn from(e: rusqlite::Error) -> InternalError {
        InternalError::Storage(e.to_string())
    }
}

impl From<io::Error> for InternalError {
    fn from(e: io::Error) -> InternalError {
        InternalError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for InternalError {
    fn from(e: serde_json::Error) -> InternalError {
        InternalError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for InternalError {
    fn from(e: toml::de::Error) -> InternalError {
        InternalError::Config(e.to_string())
    }
}

pub type InternalResult<T> = Result<T, InternalError>;
