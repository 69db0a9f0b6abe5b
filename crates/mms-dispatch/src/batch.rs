//! Packing of ordered upserts into size-bounded messages.
//!
//! Markets are taken in the order the diff produced them and cut into
//! contiguous windows whose summed encoded size fits the per-transaction
//! budget. Order across message boundaries is preserved, so a normalize
//! target is always written in the same or an earlier transaction than its
//! dependents.

use crate::error::{DispatchError, DispatchResult};
use mms_core::Market;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Type URL of the upsert message on oracle-only chains.
pub const UPSERT_MARKETS_TYPE_URL: &str = "/slinky.marketmap.v1.MsgUpsertMarkets";

/// Type URL of the upsert message on dYdX chains.
pub const DYDX_UPSERT_MARKETS_TYPE_URL: &str = "/dydxprotocol.marketmap.v1.MsgUpsertMarkets";

pub fn upsert_type_url(is_dydx_variant: bool) -> &'static str {
    if is_dydx_variant {
        DYDX_UPSERT_MARKETS_TYPE_URL
    } else {
        UPSERT_MARKETS_TYPE_URL
    }
}

/// Create-or-update of a batch of markets, signed by the governance authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpsertMarkets {
    #[serde(rename = "@type")]
    pub type_url: String,
    pub authority: String,
    pub markets: Vec<Market>,
}

impl MsgUpsertMarkets {
    pub fn new(type_url: impl Into<String>, authority: impl Into<String>, markets: Vec<Market>) -> Self {
        Self {
            type_url: type_url.into(),
            authority: authority.into(),
            markets,
        }
    }

    pub fn market_keys(&self) -> Vec<String> {
        self.markets.iter().map(Market::key).collect()
    }
}

/// Split `upserts` into messages of at most `max_bytes_per_tx` market bytes.
///
/// A market larger than the budget on its own is a [`DispatchError::SizeLimit`]
/// and no messages are returned.
pub fn convert_upserts_to_messages(
    upserts: &[Market],
    max_bytes_per_tx: usize,
    authority: &str,
    is_dydx_variant: bool,
) -> DispatchResult<Vec<MsgUpsertMarkets>> {
    let type_url = upsert_type_url(is_dydx_variant);
    let mut messages = Vec::new();
    let mut start = 0;
    let mut window_bytes = 0usize;

    for (i, market) in upserts.iter().enumerate() {
        let size = market.encoded_len()?;
        if size > max_bytes_per_tx {
            return Err(DispatchError::SizeLimit {
                market: market.key(),
                size,
                max: max_bytes_per_tx,
            });
        }

        if window_bytes + size > max_bytes_per_tx {
            messages.push(seal(&upserts[start..i], type_url, authority, window_bytes));
            start = i;
            window_bytes = 0;
        }
        window_bytes += size;
    }

    if start < upserts.len() {
        messages.push(seal(&upserts[start..], type_url, authority, window_bytes));
    }

    Ok(messages)
}

fn seal(window: &[Market], type_url: &str, authority: &str, bytes: usize) -> MsgUpsertMarkets {
    debug!(markets = window.len(), bytes, "Sealed upsert message");
    MsgUpsertMarkets::new(type_url, authority, window.to_vec())
}
