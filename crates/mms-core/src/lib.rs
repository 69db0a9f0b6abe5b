//! Core domain types for the market-map sync pipeline.
//!
//! This crate provides the types every other stage consumes:
//! - `CurrencyPair`: Base/quote pair, optionally DeFi-qualified
//! - `Ticker`, `ProviderConfig`, `Market`: A single market's on-chain configuration
//! - `MarketMap`: Canonical-key -> market mapping
//! - `Perpetual`: Read-only perpetual metadata used by the cross-margin override
//! - `Options`: Merge policy flags
//!
//! Schema validation for single markets and whole maps lives in [`validation`].

pub mod error;
pub mod market;
pub mod metadata;
pub mod options;
pub mod perpetual;
pub mod validation;
pub mod wire;

pub use error::{CoreError, CoreResult, ValidationErrors};
pub use market::{CurrencyPair, Market, MarketMap, ProviderConfig, Ticker, DEFI_SEPARATOR};
pub use metadata::{AggregateId, TickerMetadata, COINMARKETCAP_VENUE};
pub use options::Options;
pub use perpetual::{Perpetual, PerpetualMarketType, PerpetualParams};
pub use validation::{MAX_DECIMALS, MAX_METADATA_JSON_LEN};
