//! Ticker metadata blob.
//!
//! The chain stores ticker metadata as an opaque JSON string. Generators fill
//! it with reference price, liquidity and third-party aggregator IDs; the
//! aggregator IDs are what consolidation uses to match the same asset across
//! differently spelled tickers.

use serde::{Deserialize, Serialize};

/// Venue name of the reference-data aggregator used for market matching.
pub const COINMARKETCAP_VENUE: &str = "coinmarketcap";

/// One third-party identifier for the underlying asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateId {
    pub venue: String,
    #[serde(rename = "ID")]
    pub id: String,
}

/// Known shape of `Ticker::metadata_json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerMetadata {
    #[serde(default)]
    pub reference_price: u64,
    #[serde(default)]
    pub liquidity: u64,
    #[serde(default)]
    pub aggregate_ids: Vec<AggregateId>,
}

impl TickerMetadata {
    /// Parse a metadata blob. Empty or whitespace-only input is `None`.
    pub fn parse(json: &str) -> Result<Option<Self>, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(json).map(Some)
    }

    pub fn aggregate_id(&self, venue: &str) -> Option<&str> {
        self.aggregate_ids
            .iter()
            .find(|a| a.venue == venue)
            .map(|a| a.id.as_str())
    }

    /// Numeric aggregator ID; `None` if absent or not a number.
    pub fn coinmarketcap_id(&self) -> Option<u64> {
        self.aggregate_id(COINMARKETCAP_VENUE)
            .and_then(|id| id.trim().parse::<u64>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_is_none() {
        assert_eq!(TickerMetadata::parse("").unwrap(), None);
        assert_eq!(TickerMetadata::parse("  ").unwrap(), None);
    }

    #[test]
    fn test_parse_full() {
        let json = r#"{"reference_price":100,"liquidity":5,"aggregate_ids":[{"venue":"coingecko","ID":"bitcoin"},{"venue":"coinmarketcap","ID":"1"}]}"#;
        let meta = TickerMetadata::parse(json).unwrap().unwrap();
        assert_eq!(meta.reference_price, 100);
        assert_eq!(meta.aggregate_id("coingecko"), Some("bitcoin"));
        assert_eq!(meta.coinmarketcap_id(), Some(1));
    }

    #[test]
    fn test_unparseable_id_is_none() {
        let json = r#"{"aggregate_ids":[{"venue":"coinmarketcap","ID":"abc"}]}"#;
        let meta = TickerMetadata::parse(json).unwrap().unwrap();
        assert_eq!(meta.coinmarketcap_id(), None);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(TickerMetadata::parse("{not json").is_err());
    }
}
