//! Registry error types.

use mms_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Perpetuals error: {0}")]
    Perpetuals(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
