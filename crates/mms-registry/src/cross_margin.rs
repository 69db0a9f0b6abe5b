//! Cross-margin perpetual override.
//!
//! Cross-margin perpetuals are fully chain-governed: whatever the merge
//! produced for them is replaced by the on-chain market, regardless of merge
//! policy. Isolated perpetuals are left to the ordinary merge rules.

use crate::error::{RegistryError, RegistryResult};
use mms_core::{MarketMap, Perpetual};
use tracing::{debug, info};

/// Pin every cross-margin perpetual's market to its on-chain state.
///
/// Fails closed: a missing perpetuals response, an unparseable perpetual
/// ticker, or a perpetual whose market is not on chain aborts the override.
pub fn override_cross_margin(
    mut combined: MarketMap,
    actual: &MarketMap,
    generated: &MarketMap,
    perpetuals: Option<&[Perpetual]>,
) -> RegistryResult<MarketMap> {
    let perpetuals = perpetuals.ok_or_else(|| {
        RegistryError::Perpetuals("no perpetuals response, refusing to override".to_string())
    })?;

    let mut overridden = 0usize;
    for perpetual in perpetuals {
        let pair = perpetual.currency_pair()?;
        let key = pair.to_string();

        let onchain = actual.get(&key).ok_or_else(|| {
            RegistryError::MarketNotFound(format!(
                "perpetual {} has no on-chain market {key}",
                perpetual.ticker()
            ))
        })?;

        if let Some(proposed) = generated.get(&key) {
            if proposed != onchain {
                info!(
                    market = %key,
                    market_type = ?perpetual.market_type(),
                    "Generated market differs from chain for perpetual"
                );
            }
        }

        if perpetual.is_cross() {
            combined.insert(onchain.clone());
            overridden += 1;
        }
    }

    debug!(
        perpetuals = perpetuals.len(),
        overridden, "Applied cross-margin override"
    );
    Ok(combined)
}
