//! Consolidation of markets across ticker spellings.
//!
//! The same underlying asset may be listed on chain as `PEPE,UNISWAP_V3,0x.../USD`
//! while the generator proposes `PEPE/USD` (or the other way round). Both
//! carry the same aggregator ID in their metadata. Before merging, generated
//! entries are re-keyed to the spelling already on chain so the asset is
//! treated as one market instead of two.

use mms_core::{CurrencyPair, MarketMap, Options};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Build an aggregator-ID -> canonical-key map.
///
/// Markets without metadata, without an aggregator ID, or with an ID that does
/// not parse are skipped. An ID claimed by more than one key is ambiguous and
/// dropped entirely. DeFi-qualified keys take part only when `include_defi`.
pub fn build_id_map(map: &MarketMap, include_defi: bool) -> HashMap<u64, String> {
    let mut ids: HashMap<u64, String> = HashMap::new();
    let mut ambiguous: HashSet<u64> = HashSet::new();

    for (key, market) in map.iter() {
        if !include_defi && market.currency_pair().is_defi() {
            continue;
        }

        let id = match market.metadata() {
            Ok(Some(meta)) => meta.coinmarketcap_id(),
            Ok(None) => None,
            Err(e) => {
                debug!(market = %key, error = %e, "Skipping market with unparseable metadata");
                None
            }
        };
        let Some(id) = id else {
            continue;
        };

        if ambiguous.contains(&id) {
            continue;
        }
        if let Some(existing) = ids.get(&id) {
            warn!(
                id,
                first = %existing,
                second = %key,
                "Aggregator ID shared by multiple markets, ignoring it"
            );
            ids.remove(&id);
            ambiguous.insert(id);
            continue;
        }
        ids.insert(id, key.clone());
    }

    ids
}

/// Re-key generated markets to the spelling used on chain.
///
/// For every generated market whose aggregator ID belongs to a different key
/// in `actual`, the market moves to that key and its ticker pair is rewritten
/// to match. References to the old pair from other generated markets'
/// `normalize_by_pair` are redirected. If `generated` already holds a market
/// under the target key, the alias is dropped instead.
///
/// All renamed markets leave their old keys before any is re-inserted, so a
/// chain (`A -> B` while `B -> C`) or a swap moves every market exactly once
/// and each reference is rewritten by a single lookup on its original pair.
pub fn consolidate(actual: &MarketMap, generated: MarketMap, options: &Options) -> MarketMap {
    let include_defi = !options.disable_defi_market_merging;
    let actual_ids = build_id_map(actual, include_defi);
    if actual_ids.is_empty() {
        return generated;
    }
    let generated_ids = build_id_map(&generated, include_defi);

    // old key -> target pair, in key order so results are reproducible.
    let renames: BTreeMap<String, CurrencyPair> = generated_ids
        .iter()
        .filter_map(|(id, generated_key)| {
            let actual_key = actual_ids.get(id)?;
            if actual_key == generated_key {
                return None;
            }
            let pair = actual.get(actual_key)?.currency_pair().clone();
            Some((generated_key.clone(), pair))
        })
        .collect();

    if renames.is_empty() {
        return generated;
    }

    let mut out = generated;
    let mut redirects: HashMap<CurrencyPair, CurrencyPair> = HashMap::new();

    let mut moved = Vec::with_capacity(renames.len());
    for (old_key, new_pair) in renames {
        let Some(market) = out.remove(&old_key) else {
            continue;
        };
        redirects.insert(market.currency_pair().clone(), new_pair.clone());
        moved.push((old_key, new_pair, market));
    }

    for (old_key, new_pair, mut market) in moved {
        let new_key = new_pair.to_string();
        if out.contains_key(&new_key) {
            info!(
                alias = %old_key,
                market = %new_key,
                "Generated map already has the on-chain spelling, dropping alias"
            );
            continue;
        }

        info!(from = %old_key, to = %new_key, "Consolidating generated market onto on-chain key");
        market.ticker.currency_pair = new_pair;
        out.insert(market);
    }

    for market in out.markets.values_mut() {
        for provider in &mut market.provider_configs {
            if let Some(target) = provider
                .normalize_by_pair
                .as_ref()
                .and_then(|pair| redirects.get(pair))
            {
                provider.normalize_by_pair = Some(target.clone());
            }
        }
    }

    out
}
