//! Read-side seams for chain state.
//!
//! The pipeline reads the on-chain market map and the perpetuals list through
//! these traits so tests and dry runs can substitute in-memory state.

use crate::error::{RegistryError, RegistryResult};
use mms_core::{MarketMap, Perpetual};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by source and client traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Provider of the current on-chain market map.
pub trait MarketMapSource: Send + Sync {
    fn market_map(&self) -> BoxFuture<'_, RegistryResult<MarketMap>>;
}

/// Provider of every perpetual listed on chain.
///
/// Implementations must return the complete list; a partial list would let
/// the cross-margin override skip markets.
pub trait PerpetualsSource: Send + Sync {
    fn all_perpetuals(&self) -> BoxFuture<'_, RegistryResult<Vec<Perpetual>>>;
}

/// In-memory market map.
#[derive(Debug, Default)]
pub struct StaticMarketMapSource {
    map: Mutex<MarketMap>,
}

impl StaticMarketMapSource {
    pub fn new(map: MarketMap) -> Self {
        Self {
            map: Mutex::new(map),
        }
    }

    /// Replace the served map.
    pub fn set(&self, map: MarketMap) {
        *self.map.lock() = map;
    }

    pub fn get(&self) -> MarketMap {
        self.map.lock().clone()
    }
}

impl MarketMapSource for StaticMarketMapSource {
    fn market_map(&self) -> BoxFuture<'_, RegistryResult<MarketMap>> {
        let map = self.get();
        Box::pin(async move { Ok(map) })
    }
}

/// In-memory perpetuals list. `None` simulates a missing response.
#[derive(Debug, Default)]
pub struct StaticPerpetualsSource {
    perpetuals: Option<Vec<Perpetual>>,
}

impl StaticPerpetualsSource {
    pub fn new(perpetuals: Vec<Perpetual>) -> Self {
        Self {
            perpetuals: Some(perpetuals),
        }
    }

    pub fn unavailable() -> Self {
        Self { perpetuals: None }
    }
}

impl PerpetualsSource for StaticPerpetualsSource {
    fn all_perpetuals(&self) -> BoxFuture<'_, RegistryResult<Vec<Perpetual>>> {
        Box::pin(async move {
            self.perpetuals
                .clone()
                .ok_or_else(|| RegistryError::Perpetuals("perpetuals unavailable".to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mms_core::{CurrencyPair, Market, PerpetualMarketType, ProviderConfig, Ticker};
    use tokio_test::block_on;

    fn btc() -> Market {
        Market {
            ticker: Ticker {
                currency_pair: CurrencyPair::new("BTC", "USD"),
                decimals: 8,
                min_provider_count: 1,
                enabled: true,
                metadata_json: String::new(),
            },
            provider_configs: vec![ProviderConfig::new("a", "BTCUSD")],
        }
    }

    #[test]
    fn test_static_market_map_source() {
        let source = StaticMarketMapSource::default();
        assert!(block_on(source.market_map()).unwrap().is_empty());

        source.set(MarketMap::from_markets(vec![btc()]));
        let map = block_on(source.market_map()).unwrap();
        assert!(map.contains_key("BTC/USD"));
    }

    #[tokio::test]
    async fn test_static_perpetuals_source() {
        let source = StaticPerpetualsSource::new(vec![Perpetual::new(
            "BTC-USD",
            PerpetualMarketType::Cross,
        )]);
        assert_eq!(source.all_perpetuals().await.unwrap().len(), 1);

        let missing = StaticPerpetualsSource::unavailable();
        assert!(matches!(
            missing.all_perpetuals().await,
            Err(RegistryError::Perpetuals(_))
        ));
    }
}
