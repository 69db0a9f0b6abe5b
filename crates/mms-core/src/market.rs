//! Market identification and configuration types.
//!
//! A market is keyed by its currency pair rendered as `BASE/QUOTE`. DeFi
//! markets qualify the base with venue and contract address
//! (`SYMBOL,VENUE,ADDRESS/QUOTE`) so pool pricing and exchange pricing of the
//! same asset live under different keys.

use crate::error::{CoreError, CoreResult};
use crate::metadata::TickerMetadata;
use crate::wire;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Separator between symbol, venue and contract address in a DeFi base.
pub const DEFI_SEPARATOR: char = ',';

const PAIR_SEPARATOR: char = '/';
const PERPETUAL_SEPARATOR: char = '-';

/// Base/quote asset pair.
///
/// Field names follow the chain's JSON encoding (`Base`, `Quote`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    #[serde(rename = "Base")]
    pub base: String,
    #[serde(rename = "Quote")]
    pub quote: String,
}

impl CurrencyPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Whether the base carries venue and contract address.
    pub fn is_defi(&self) -> bool {
        self.base.contains(DEFI_SEPARATOR)
    }

    /// Base symbol with any DeFi qualification stripped.
    pub fn base_symbol(&self) -> &str {
        self.base
            .split(DEFI_SEPARATOR)
            .next()
            .unwrap_or(self.base.as_str())
    }

    /// Parse a perpetual ticker (`BTC-USD`) into a pair.
    pub fn from_perpetual_ticker(ticker: &str) -> CoreResult<Self> {
        match ticker.split_once(PERPETUAL_SEPARATOR) {
            Some((base, quote))
                if !base.is_empty() && !quote.is_empty() && !quote.contains(PERPETUAL_SEPARATOR) =>
            {
                Ok(Self::new(base, quote))
            }
            _ => Err(CoreError::InvalidPerpetualTicker(ticker.to_string())),
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.base, PAIR_SEPARATOR, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidCurrencyPair {
            pair: s.to_string(),
            reason: reason.to_string(),
        };

        let (base, quote) = s
            .split_once(PAIR_SEPARATOR)
            .ok_or_else(|| invalid("missing '/' separator"))?;
        if base.is_empty() || quote.is_empty() {
            return Err(invalid("empty base or quote"));
        }
        if quote.contains(PAIR_SEPARATOR) {
            return Err(invalid("more than one '/' separator"));
        }
        Ok(Self::new(base, quote))
    }
}

/// Governance-controlled ticker parameters of a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub currency_pair: CurrencyPair,

    /// Price decimals reported on chain.
    #[serde(default, with = "wire::u64_string_default")]
    pub decimals: u64,

    /// Minimum number of providers that must report for a valid price.
    #[serde(default, with = "wire::u64_string_default")]
    pub min_provider_count: u64,

    #[serde(default)]
    pub enabled: bool,

    /// Free-form JSON blob; see [`TickerMetadata`] for the known shape.
    #[serde(rename = "metadata_JSON", default)]
    pub metadata_json: String,
}

impl Ticker {
    /// Canonical map key for this ticker.
    pub fn key(&self) -> String {
        self.currency_pair.to_string()
    }
}

/// Per-exchange price source binding for a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name (e.g. "binance_ws"). Unique within a market.
    pub name: String,

    /// Ticker as the provider spells it (e.g. "BTCUSDT").
    pub off_chain_ticker: String,

    /// Market in the same map this provider's price is normalized against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize_by_pair: Option<CurrencyPair>,

    #[serde(default)]
    pub invert: bool,

    #[serde(rename = "metadata_JSON", default)]
    pub metadata_json: String,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, off_chain_ticker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            off_chain_ticker: off_chain_ticker.into(),
            normalize_by_pair: None,
            invert: false,
            metadata_json: String::new(),
        }
    }

    pub fn with_normalize_by(mut self, pair: CurrencyPair) -> Self {
        self.normalize_by_pair = Some(pair);
        self
    }
}

/// A market: ticker parameters plus its provider bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub ticker: Ticker,

    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub provider_configs: Vec<ProviderConfig>,
}

impl Market {
    /// Canonical map key (`BASE/QUOTE`).
    pub fn key(&self) -> String {
        self.ticker.key()
    }

    pub fn currency_pair(&self) -> &CurrencyPair {
        &self.ticker.currency_pair
    }

    pub fn is_enabled(&self) -> bool {
        self.ticker.enabled
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.provider_configs.iter().find(|p| p.name == name)
    }

    /// Pairs this market's providers normalize against, in provider order.
    ///
    /// A pair referenced by several providers is yielded once per provider.
    pub fn normalize_targets(&self) -> impl Iterator<Item = &CurrencyPair> {
        self.provider_configs
            .iter()
            .filter_map(|p| p.normalize_by_pair.as_ref())
    }

    /// Parsed ticker metadata; `None` when the blob is empty.
    pub fn metadata(&self) -> CoreResult<Option<TickerMetadata>> {
        TickerMetadata::parse(&self.ticker.metadata_json).map_err(|e| CoreError::Metadata {
            market: self.key(),
            reason: e.to_string(),
        })
    }

    /// Size of this market's wire encoding in bytes.
    pub fn encoded_len(&self) -> CoreResult<usize> {
        Ok(serde_json::to_vec(self)?.len())
    }
}

/// Canonical-key -> market mapping.
///
/// Backed by a `BTreeMap`, so iteration is key-sorted. Stages that need a
/// specific order (dependency reordering, batching) still work over an
/// explicit `Vec<Market>` rather than relying on this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMap {
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub markets: BTreeMap<String, Market>,
}

impl MarketMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map keying each market by its canonical key.
    ///
    /// Later duplicates replace earlier ones.
    pub fn from_markets(markets: impl IntoIterator<Item = Market>) -> Self {
        let mut map = Self::new();
        for market in markets {
            map.insert(market);
        }
        map
    }

    pub fn get(&self, key: &str) -> Option<&Market> {
        self.markets.get(key)
    }

    pub fn get_pair(&self, pair: &CurrencyPair) -> Option<&Market> {
        self.markets.get(&pair.to_string())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.markets.contains_key(key)
    }

    pub fn contains_pair(&self, pair: &CurrencyPair) -> bool {
        self.markets.contains_key(&pair.to_string())
    }

    /// Insert under the market's canonical key, returning any replaced market.
    pub fn insert(&mut self, market: Market) -> Option<Market> {
        self.markets.insert(market.key(), market)
    }

    pub fn remove(&mut self, key: &str) -> Option<Market> {
        self.markets.remove(key)
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Market)> {
        self.markets.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.markets.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    /// Markets in key order.
    pub fn into_markets(self) -> Vec<Market> {
        self.markets.into_values().collect()
    }
}

impl FromIterator<Market> for MarketMap {
    fn from_iter<I: IntoIterator<Item = Market>>(iter: I) -> Self {
        Self::from_markets(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc_usd() -> Market {
        Market {
            ticker: Ticker {
                currency_pair: CurrencyPair::new("BTC", "USD"),
                decimals: 8,
                min_provider_count: 1,
                enabled: true,
                metadata_json: String::new(),
            },
            provider_configs: vec![ProviderConfig::new("binance_ws", "BTCUSDT")
                .with_normalize_by(CurrencyPair::new("USDT", "USD"))],
        }
    }

    #[test]
    fn test_currency_pair_display_and_parse() {
        let pair = CurrencyPair::new("ETH", "USD");
        assert_eq!(pair.to_string(), "ETH/USD");
        assert_eq!("ETH/USD".parse::<CurrencyPair>().unwrap(), pair);
    }

    #[test]
    fn test_currency_pair_parse_rejects_malformed() {
        assert!("ETHUSD".parse::<CurrencyPair>().is_err());
        assert!("/USD".parse::<CurrencyPair>().is_err());
        assert!("ETH/".parse::<CurrencyPair>().is_err());
        assert!("A/B/C".parse::<CurrencyPair>().is_err());
    }

    #[test]
    fn test_defi_pair() {
        let pair: CurrencyPair = "PEPE,UNISWAP_V3,0xABC/USD".parse().unwrap();
        assert!(pair.is_defi());
        assert_eq!(pair.base_symbol(), "PEPE");
        assert!(!CurrencyPair::new("PEPE", "USD").is_defi());
    }

    #[test]
    fn test_perpetual_ticker() {
        let pair = CurrencyPair::from_perpetual_ticker("BTC-USD").unwrap();
        assert_eq!(pair, CurrencyPair::new("BTC", "USD"));
        assert!(CurrencyPair::from_perpetual_ticker("BTCUSD").is_err());
        assert!(CurrencyPair::from_perpetual_ticker("-USD").is_err());
        assert!(CurrencyPair::from_perpetual_ticker("A-B-C").is_err());
    }

    #[test]
    fn test_market_json_shape() {
        let json = r#"{
            "ticker": {
                "currency_pair": {"Base": "BTC", "Quote": "USD"},
                "decimals": "8",
                "min_provider_count": "1",
                "enabled": true,
                "metadata_JSON": ""
            },
            "provider_configs": [{
                "name": "binance_ws",
                "off_chain_ticker": "BTCUSDT",
                "normalize_by_pair": {"Base": "USDT", "Quote": "USD"},
                "invert": false,
                "metadata_JSON": ""
            }]
        }"#;
        let market: Market = serde_json::from_str(json).unwrap();
        assert_eq!(market, btc_usd());

        let encoded = serde_json::to_string(&market).unwrap();
        assert!(encoded.contains(r#""decimals":"8""#));
        assert!(encoded.contains(r#""metadata_JSON":"""#));
    }

    #[test]
    fn test_proto_json_omitted_defaults() {
        // Zero values and empty lists are omitted or null on the wire.
        let json = r#"{"ticker": {"currency_pair": {"Base": "X", "Quote": "Y"}}, "provider_configs": null}"#;
        let market: Market = serde_json::from_str(json).unwrap();
        assert_eq!(market.ticker.decimals, 0);
        assert!(!market.is_enabled());
        assert!(market.provider_configs.is_empty());
    }

    #[test]
    fn test_normalize_targets() {
        let market = btc_usd();
        let targets: Vec<_> = market.normalize_targets().collect();
        assert_eq!(targets, vec![&CurrencyPair::new("USDT", "USD")]);
    }

    #[test]
    fn test_market_map_keys_by_ticker() {
        let map = MarketMap::from_markets(vec![btc_usd()]);
        assert!(map.contains_key("BTC/USD"));
        assert!(map.contains_pair(&CurrencyPair::new("BTC", "USD")));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_market_map_null_markets() {
        let map: MarketMap = serde_json::from_str(r#"{"markets": null}"#).unwrap();
        assert!(map.is_empty());
        let map: MarketMap = serde_json::from_str("{}").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_encoded_len_matches_json() {
        let market = btc_usd();
        let expected = serde_json::to_vec(&market).unwrap().len();
        assert_eq!(market.encoded_len().unwrap(), expected);
    }
}
