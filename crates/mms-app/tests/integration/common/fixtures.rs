//! Market fixtures and pipeline wiring for integration tests.

use mms_app::{AppConfig, Application, Components, OperatingMode};
use mms_core::{CurrencyPair, Market, MarketMap, Perpetual, ProviderConfig, Ticker};
use mms_dispatch::{MockBroadcastClient, MockGasEstimator, SimulateSigningAgent};
use mms_registry::{StaticMarketMapSource, StaticPerpetualsSource};
use std::sync::Arc;

pub const AUTHORITY: &str = "cosmos10d07y265gmmuvt4z0w9aw880jnsr700j6zn9kn";

/// Single-provider `BASE/USD` market.
pub fn market(base: &str, enabled: bool) -> Market {
    Market {
        ticker: Ticker {
            currency_pair: CurrencyPair::new(base, "USD"),
            decimals: 8,
            min_provider_count: 1,
            enabled,
            metadata_json: String::new(),
        },
        provider_configs: vec![ProviderConfig::new("binance", format!("{base}USDT"))],
    }
}

pub fn with_provider(mut market: Market, name: &str) -> Market {
    let ticker = format!("{}USD", market.ticker.currency_pair.base);
    market.provider_configs.push(ProviderConfig::new(name, ticker));
    market
}

pub fn base_config(mode: OperatingMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.mode = mode;
    config.authority = AUTHORITY.to_string();
    config.chain.chain_id = "localnet-1".to_string();
    config
}

/// Handles the tests inspect after a run.
pub struct Harness {
    pub app: Application,
    pub estimator: Arc<MockGasEstimator>,
    pub broadcaster: Arc<MockBroadcastClient>,
}

pub fn harness(config: AppConfig, actual: MarketMap, perpetuals: Option<Vec<Perpetual>>) -> Harness {
    let estimator = Arc::new(MockGasEstimator::new(50_000));
    let broadcaster = Arc::new(MockBroadcastClient::new());
    let perpetuals = match perpetuals {
        Some(list) => StaticPerpetualsSource::new(list),
        None => StaticPerpetualsSource::unavailable(),
    };
    let components = Components {
        market_maps: Arc::new(StaticMarketMapSource::new(actual)),
        perpetuals: Arc::new(perpetuals),
        estimator: estimator.clone(),
        signer: Arc::new(SimulateSigningAgent::default()),
        broadcaster: broadcaster.clone(),
    };
    Harness {
        app: Application::new(config, components),
        estimator,
        broadcaster,
    }
}
