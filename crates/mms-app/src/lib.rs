//! Market-map sync application.
//!
//! Orchestrates one reconciliation run:
//! - On-chain and generated market map reads
//! - Consolidation, merge and cross-margin override
//! - Upsert diff, batching, gas estimation and signing
//! - Simulated output or sequential submission

pub mod app;
pub mod config;
pub mod error;

pub use app::{load_generated, Application, Components, RunReport};
pub use config::{AppConfig, OperatingMode, UpsertConfig};
pub use error::{AppError, AppResult};
