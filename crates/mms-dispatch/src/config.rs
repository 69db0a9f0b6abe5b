//! Dispatch and chain configuration.
//!
//! Deserialized from the `[chain]` and `[dispatch.*]` tables of the app
//! config; every field has a default so partial tables load.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Fixed timeout for a single broadcast call.
pub const BROADCAST_TIMEOUT: Duration = Duration::from_secs(20);

/// Decimal coin amount, e.g. a minimum gas price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Decimal,
}

impl DecCoin {
    pub fn new(denom: impl Into<String>, amount: Decimal) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

/// Integer coin amount as it appears in a transaction fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// Chain endpoints and identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// CometBFT RPC (broadcast and tx queries).
    #[serde(default = "default_rpc_address")]
    pub rpc_address: String,
    #[serde(default = "default_grpc_address")]
    pub grpc_address: String,
    /// REST gateway (market map, perpetuals, accounts, simulation).
    #[serde(default = "default_rest_address")]
    pub rest_address: String,
    #[serde(default)]
    pub chain_id: String,
    /// Bech32 account prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub version: String,
    /// Selects the dYdX message type URL and enables the cross-margin override.
    #[serde(default)]
    pub is_dydx_variant: bool,
}

fn default_rpc_address() -> String {
    "http://localhost:26657".to_string()
}

fn default_grpc_address() -> String {
    "localhost:9090".to_string()
}

fn default_rest_address() -> String {
    "http://localhost:1317".to_string()
}

fn default_prefix() -> String {
    "cosmos".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_address: default_rpc_address(),
            grpc_address: default_grpc_address(),
            rest_address: default_rest_address(),
            chain_id: String::new(),
            prefix: default_prefix(),
            version: String::new(),
            is_dydx_variant: false,
        }
    }
}

/// Transaction sizing and fee parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxConfig {
    /// Byte budget for the markets packed into one transaction.
    #[serde(default = "default_max_bytes_per_tx")]
    pub max_bytes_per_tx: usize,
    /// Gas ceiling for a single transaction.
    #[serde(default = "default_max_gas")]
    pub max_gas: u64,
    /// Multiplier applied to simulated gas.
    #[serde(default = "default_gas_adjustment")]
    pub gas_adjustment: f64,
    #[serde(default = "default_min_gas_price")]
    pub min_gas_price: DecCoin,
}

fn default_max_bytes_per_tx() -> usize {
    1_000_000
}

fn default_max_gas() -> u64 {
    1_000_000_000
}

fn default_gas_adjustment() -> f64 {
    1.5
}

fn default_min_gas_price() -> DecCoin {
    DecCoin::new("stake", Decimal::ZERO)
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            max_bytes_per_tx: default_max_bytes_per_tx(),
            max_gas: default_max_gas(),
            gas_adjustment: default_gas_adjustment(),
            min_gas_price: default_min_gas_price(),
        }
    }
}

/// Signing backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Registered signer name: `local` or `simulate`.
    #[serde(default = "default_signer_type")]
    pub signer_type: String,
    /// Bech32 address of the signing account.
    #[serde(default)]
    pub address: String,
    /// Environment variable holding the hex private key.
    #[serde(default)]
    pub key_env_var: Option<String>,
    /// File holding the hex private key. Takes precedence over `key_env_var`.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

fn default_signer_type() -> String {
    "local".to_string()
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            signer_type: default_signer_type(),
            address: String::new(),
            key_env_var: None,
            key_file: None,
        }
    }
}

/// Inclusion polling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitterConfig {
    #[serde(default = "default_polling_frequency_ms")]
    pub polling_frequency_ms: u64,
    #[serde(default = "default_polling_duration_ms")]
    pub polling_duration_ms: u64,
}

fn default_polling_frequency_ms() -> u64 {
    2_000
}

fn default_polling_duration_ms() -> u64 {
    60_000
}

impl SubmitterConfig {
    pub fn polling_frequency(&self) -> Duration {
        Duration::from_millis(self.polling_frequency_ms)
    }

    pub fn polling_duration(&self) -> Duration {
        Duration::from_millis(self.polling_duration_ms)
    }
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            polling_frequency_ms: default_polling_frequency_ms(),
            polling_duration_ms: default_polling_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub tx: TxConfig,
    #[serde(default)]
    pub signing: SigningConfig,
    #[serde(default)]
    pub submitter: SubmitterConfig,
}
