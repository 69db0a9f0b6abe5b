//! Perpetual market metadata consumed by the cross-margin override.

use crate::error::CoreResult;
use crate::market::CurrencyPair;
use serde::{Deserialize, Serialize};

/// Risk-isolation mode of a perpetual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerpetualMarketType {
    #[default]
    #[serde(rename = "PERPETUAL_MARKET_TYPE_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "PERPETUAL_MARKET_TYPE_CROSS")]
    Cross,
    #[serde(rename = "PERPETUAL_MARKET_TYPE_ISOLATED")]
    Isolated,
}

/// Perpetual parameters as returned by the perpetuals query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpetualParams {
    #[serde(default)]
    pub id: u32,
    /// Ticker in `BASE-QUOTE` form.
    pub ticker: String,
    #[serde(default)]
    pub market_id: u32,
    #[serde(default)]
    pub market_type: PerpetualMarketType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perpetual {
    pub params: PerpetualParams,
}

impl Perpetual {
    pub fn new(ticker: impl Into<String>, market_type: PerpetualMarketType) -> Self {
        Self {
            params: PerpetualParams {
                id: 0,
                ticker: ticker.into(),
                market_id: 0,
                market_type,
            },
        }
    }

    pub fn ticker(&self) -> &str {
        &self.params.ticker
    }

    pub fn market_type(&self) -> PerpetualMarketType {
        self.params.market_type
    }

    pub fn is_cross(&self) -> bool {
        self.params.market_type == PerpetualMarketType::Cross
    }

    /// Asset pair this perpetual tracks.
    pub fn currency_pair(&self) -> CoreResult<CurrencyPair> {
        CurrencyPair::from_perpetual_ticker(&self.params.ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perpetual_json() {
        let json = r#"{"params":{"id":0,"ticker":"BTC-USD","market_id":0,"atomic_resolution":-10,"market_type":"PERPETUAL_MARKET_TYPE_CROSS"},"funding_index":"0","open_interest":"0"}"#;
        let perp: Perpetual = serde_json::from_str(json).unwrap();
        assert!(perp.is_cross());
        assert_eq!(perp.currency_pair().unwrap(), CurrencyPair::new("BTC", "USD"));
    }

    #[test]
    fn test_missing_market_type_is_unspecified() {
        let json = r#"{"params":{"ticker":"ETH-USD"}}"#;
        let perp: Perpetual = serde_json::from_str(json).unwrap();
        assert_eq!(perp.market_type(), PerpetualMarketType::Unspecified);
        assert!(!perp.is_cross());
    }
}
