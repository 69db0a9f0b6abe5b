//! Policy-driven merge of on-chain and generated market maps.
//!
//! Rules, per ticker:
//! - generated only: dropped under `existing_only`, otherwise added disabled
//! - both, on-chain enabled and `!update_enabled`: on-chain market kept verbatim
//! - both, otherwise: generated market with decimals, min provider count and
//!   enabled taken from chain; providers replaced or unioned per
//!   `overwrite_providers`
//! - on chain only: enabled markets are kept (never silently delisted),
//!   disabled ones are reported as removals

use crate::consolidate::consolidate;
use mms_core::{Market, MarketMap, Options, ProviderConfig};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Result of a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Market map to converge on.
    pub combined: MarketMap,
    /// Keys of disabled on-chain markets absent from the generated map.
    pub removals: Vec<String>,
}

/// Consolidate `generated` against `actual`, then merge.
pub fn merge_market_maps(
    actual: &MarketMap,
    generated: MarketMap,
    options: &Options,
) -> MergeOutcome {
    let consolidated = consolidate(actual, generated, options);
    merge_consolidated(actual, &consolidated, options)
}

/// Merge an already consolidated generated map.
pub fn merge_consolidated(
    actual: &MarketMap,
    generated: &MarketMap,
    options: &Options,
) -> MergeOutcome {
    let mut combined = MarketMap::new();

    for (key, proposed) in generated.iter() {
        match actual.get(key) {
            None if options.existing_only => {
                debug!(market = %key, "Skipping new market (existing_only)");
            }
            None => {
                let mut market = proposed.clone();
                market.ticker.enabled = false;
                combined.insert(market);
            }
            Some(onchain) if onchain.is_enabled() && !options.update_enabled => {
                combined.insert(onchain.clone());
            }
            Some(onchain) => {
                combined.insert(merge_market(onchain, proposed, options.overwrite_providers));
            }
        }
    }

    let mut removals = Vec::new();
    for (key, onchain) in actual.iter() {
        if generated.contains_key(key) {
            continue;
        }
        if onchain.is_enabled() {
            warn!(
                market = %key,
                "Enabled on-chain market missing from generated map, keeping it"
            );
            combined.insert(onchain.clone());
        } else {
            removals.push(key.clone());
        }
    }

    MergeOutcome { combined, removals }
}

/// Combine one market present on both sides.
fn merge_market(onchain: &Market, proposed: &Market, overwrite_providers: bool) -> Market {
    let mut market = proposed.clone();
    market.ticker.decimals = onchain.ticker.decimals;
    market.ticker.min_provider_count = onchain.ticker.min_provider_count;
    market.ticker.enabled = onchain.ticker.enabled;

    if !overwrite_providers {
        market.provider_configs =
            union_providers(&onchain.provider_configs, &proposed.provider_configs);
    }
    market
}

/// On-chain providers untouched, followed by generated providers with unseen names.
fn union_providers(onchain: &[ProviderConfig], proposed: &[ProviderConfig]) -> Vec<ProviderConfig> {
    let mut seen: HashSet<&str> = onchain.iter().map(|p| p.name.as_str()).collect();
    let mut out = onchain.to_vec();
    for provider in proposed {
        if seen.insert(provider.name.as_str()) {
            out.push(provider.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mms_core::{CurrencyPair, Ticker};

    fn market(base: &str, enabled: bool, providers: &[&str]) -> Market {
        Market {
            ticker: Ticker {
                currency_pair: CurrencyPair::new(base, "USD"),
                decimals: 8,
                min_provider_count: 1,
                enabled,
                metadata_json: String::new(),
            },
            provider_configs: providers
                .iter()
                .map(|name| ProviderConfig::new(*name, format!("{base}USD")))
                .collect(),
        }
    }

    fn names(market: &Market) -> Vec<&str> {
        market.provider_configs.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_disabled_actual_only_is_removal() {
        let actual = MarketMap::from_markets(vec![market("BTC", false, &["test"])]);
        let out = merge_market_maps(&actual, MarketMap::new(), &Options::default());
        assert!(out.combined.is_empty());
        assert_eq!(out.removals, vec!["BTC/USD".to_string()]);
    }

    #[test]
    fn test_provider_union() {
        let actual = MarketMap::from_markets(vec![market("BTC", false, &["test"])]);
        let generated = MarketMap::from_markets(vec![market("BTC", false, &["test_new"])]);
        let out = merge_market_maps(&actual, generated, &Options::default());
        assert_eq!(names(out.combined.get("BTC/USD").unwrap()), vec!["test", "test_new"]);
        assert!(out.removals.is_empty());
    }

    #[test]
    fn test_provider_union_keeps_existing_entries() {
        let actual = MarketMap::from_markets(vec![market("BTC", false, &["a"])]);
        let mut proposed = market("BTC", false, &["a", "b"]);
        proposed.provider_configs[0].off_chain_ticker = "CHANGED".to_string();
        let generated = MarketMap::from_markets(vec![proposed]);

        let out = merge_market_maps(&actual, generated, &Options::default());
        let merged = out.combined.get("BTC/USD").unwrap();
        assert_eq!(names(merged), vec!["a", "b"]);
        assert_eq!(merged.provider_configs[0].off_chain_ticker, "BTCUSD");
    }

    #[test]
    fn test_overwrite_providers() {
        let actual = MarketMap::from_markets(vec![market("BTC", false, &["test"])]);
        let generated = MarketMap::from_markets(vec![market("BTC", false, &["test_new"])]);
        let options = Options {
            overwrite_providers: true,
            ..Default::default()
        };
        let out = merge_market_maps(&actual, generated, &options);
        assert_eq!(names(out.combined.get("BTC/USD").unwrap()), vec!["test_new"]);
    }

    #[test]
    fn test_new_market_added_disabled() {
        let generated = MarketMap::from_markets(vec![market("ETH", true, &["a"])]);
        let out = merge_market_maps(&MarketMap::new(), generated, &Options::default());
        let eth = out.combined.get("ETH/USD").unwrap();
        assert!(!eth.is_enabled());
    }

    #[test]
    fn test_existing_only_drops_new_markets() {
        let generated = MarketMap::from_markets(vec![market("ETH", true, &["a"])]);
        let options = Options {
            existing_only: true,
            ..Default::default()
        };
        let out = merge_market_maps(&MarketMap::new(), generated, &options);
        assert!(out.combined.is_empty());
    }

    #[test]
    fn test_enabled_market_protected() {
        let onchain = market("BTC", true, &["a"]);
        let actual = MarketMap::from_markets(vec![onchain.clone()]);
        let mut proposed = market("BTC", true, &["b", "c"]);
        proposed.ticker.metadata_json = r#"{"reference_price":1}"#.to_string();
        let generated = MarketMap::from_markets(vec![proposed]);

        let out = merge_market_maps(&actual, generated, &Options::default());
        assert_eq!(out.combined.get("BTC/USD"), Some(&onchain));
    }

    #[test]
    fn test_update_enabled_allows_drift_but_keeps_governed_fields() {
        let mut onchain = market("BTC", true, &["a"]);
        onchain.ticker.decimals = 5;
        onchain.ticker.min_provider_count = 1;
        let actual = MarketMap::from_markets(vec![onchain]);

        let mut proposed = market("BTC", false, &["b"]);
        proposed.ticker.decimals = 10;
        proposed.ticker.min_provider_count = 2;
        proposed.ticker.metadata_json = r#"{"liquidity":9}"#.to_string();
        let generated = MarketMap::from_markets(vec![proposed]);

        let options = Options {
            update_enabled: true,
            ..Default::default()
        };
        let out = merge_market_maps(&actual, generated, &options);
        let merged = out.combined.get("BTC/USD").unwrap();
        assert_eq!(merged.ticker.decimals, 5);
        assert_eq!(merged.ticker.min_provider_count, 1);
        assert!(merged.is_enabled());
        assert_eq!(merged.ticker.metadata_json, r#"{"liquidity":9}"#);
        assert_eq!(names(merged), vec!["a", "b"]);
    }

    #[test]
    fn test_enabled_actual_only_is_retained() {
        let onchain = market("BTC", true, &["a"]);
        let actual = MarketMap::from_markets(vec![onchain.clone()]);
        let out = merge_market_maps(&actual, MarketMap::new(), &Options::default());
        assert_eq!(out.combined.get("BTC/USD"), Some(&onchain));
        assert!(out.removals.is_empty());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let actual = MarketMap::from_markets(vec![
            market("BTC", true, &["a"]),
            market("ETH", false, &["a"]),
            market("SOL", true, &["a"]),
        ]);
        let generated = MarketMap::from_markets(vec![
            market("BTC", true, &["b"]),
            market("ETH", true, &["b"]),
            market("DOGE", true, &["a"]),
        ]);
        let options = Options::default();

        let first = merge_market_maps(&actual, generated, &options);
        let second = merge_market_maps(&actual, first.combined.clone(), &options);

        assert!(second.removals.is_empty());
        assert_eq!(second.combined, first.combined);
    }
}
