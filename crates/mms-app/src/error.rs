//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generated market map error: {0}")]
    GeneratedMap(String),

    #[error("Core error: {0}")]
    Core(#[from] mms_core::CoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] mms_registry::RegistryError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] mms_dispatch::DispatchError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] mms_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown requested")]
    Shutdown,
}

pub type AppResult<T> = Result<T, AppError>;
