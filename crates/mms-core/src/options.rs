//! Merge policy flags.

use serde::{Deserialize, Serialize};

/// Policy applied when combining on-chain and generated market maps.
///
/// Immutable for the duration of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Allow generated values to replace markets that are already enabled on chain.
    #[serde(default)]
    pub update_enabled: bool,

    /// Replace provider lists wholesale instead of appending unseen providers.
    #[serde(default)]
    pub overwrite_providers: bool,

    /// Only touch markets that already exist on chain.
    #[serde(default)]
    pub existing_only: bool,

    /// Keep DeFi-qualified tickers out of aggregator-ID matching.
    #[serde(default)]
    pub disable_defi_market_merging: bool,
}
