//! Application configuration.

use crate::error::{AppError, AppResult};
use mms_core::Options;
use mms_dispatch::{ChainConfig, DispatchConfig, SIMULATE_SIGNER};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Build and sign transactions, print them, submit nothing.
    #[default]
    Simulate,
    /// Submit transactions and wait for each to be included.
    Dispatch,
}

/// Upsert diff settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertConfig {
    /// Market keys that are never written, even when they differ.
    #[serde(default)]
    pub deny_list: Vec<String>,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mode: OperatingMode,
    /// Module authority placed in every upsert message.
    #[serde(default)]
    pub authority: String,
    /// JSON file holding the generated market map.
    #[serde(default = "default_generated_path")]
    pub generated_path: PathBuf,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub merge: Options,
    #[serde(default)]
    pub upserts: UpsertConfig,
}

fn default_generated_path() -> PathBuf {
    PathBuf::from("market_map.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            authority: String::new(),
            generated_path: default_generated_path(),
            chain: ChainConfig::default(),
            dispatch: DispatchConfig::default(),
            merge: Options::default(),
            upserts: UpsertConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn is_simulate_mode(&self) -> bool {
        self.mode == OperatingMode::Simulate
    }

    /// Reject settings that would fail later in the run.
    pub fn validate(&self) -> AppResult<()> {
        if self.chain.chain_id.is_empty() {
            return Err(AppError::Config("chain.chain_id must be set".to_string()));
        }
        if self.authority.is_empty() {
            return Err(AppError::Config("authority must be set".to_string()));
        }

        let tx = &self.dispatch.tx;
        if !(tx.gas_adjustment > 0.0) {
            return Err(AppError::Config(format!(
                "dispatch.tx.gas_adjustment must be positive, got {}",
                tx.gas_adjustment
            )));
        }
        if tx.max_bytes_per_tx == 0 {
            return Err(AppError::Config(
                "dispatch.tx.max_bytes_per_tx must be positive".to_string(),
            ));
        }

        let submitter = &self.dispatch.submitter;
        if submitter.polling_frequency_ms == 0 {
            return Err(AppError::Config(
                "dispatch.submitter.polling_frequency_ms must be positive".to_string(),
            ));
        }
        if submitter.polling_duration_ms < submitter.polling_frequency_ms {
            return Err(AppError::Config(format!(
                "dispatch.submitter.polling_duration_ms ({}) is shorter than polling_frequency_ms ({})",
                submitter.polling_duration_ms, submitter.polling_frequency_ms
            )));
        }

        if self.mode == OperatingMode::Dispatch
            && self.dispatch.signing.signer_type == SIMULATE_SIGNER
        {
            return Err(AppError::Config(
                "dispatch mode needs a signing backend other than simulate".to_string(),
            ));
        }
        Ok(())
    }
}
