//! REST client for chain state.
//!
//! Reads the oracle market map and the perpetuals list from the chain's REST
//! gateway. Both endpoints return proto-JSON.

use crate::error::{RegistryError, RegistryResult};
use crate::source::{BoxFuture, MarketMapSource, PerpetualsSource};
use mms_core::{MarketMap, Perpetual};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MARKET_MAP_PATH: &str = "/slinky/marketmap/v1/marketmap";
const PERPETUALS_PATH: &str = "/dydxprotocol/perpetuals/perpetual";

/// Response of the market map query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketMapResponse {
    #[serde(default)]
    pub market_map: MarketMap,
}

/// Cosmos pagination cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResponse {
    /// Opaque key of the next page; empty or absent on the last page.
    #[serde(default)]
    pub next_key: Option<String>,
}

impl PageResponse {
    fn next(&self) -> Option<&str> {
        self.next_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// One page of the perpetuals query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerpetualsPage {
    /// `None` when the field is missing from the response.
    #[serde(default)]
    pub perpetual: Option<Vec<Perpetual>>,
    #[serde(default)]
    pub pagination: Option<PageResponse>,
}

/// Client for the chain REST gateway.
#[derive(Debug, Clone)]
pub struct ChainRestClient {
    client: Client,
    base_url: String,
}

impl ChainRestClient {
    /// Create a client for `base_url` (e.g. `http://localhost:1317`).
    pub fn new(base_url: impl Into<String>) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> RegistryResult<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::HttpClient(format!("HTTP {status} from {path}: {body}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("Failed to read response: {e}")))?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch the current on-chain market map.
    pub async fn fetch_market_map(&self) -> RegistryResult<MarketMap> {
        info!(url = %self.base_url, "Fetching market map from chain");
        let response: MarketMapResponse = self.get_json(MARKET_MAP_PATH, &[]).await?;
        info!(markets = response.market_map.len(), "Fetched market map");
        Ok(response.market_map)
    }

    /// Fetch every perpetual, following pagination to the end.
    pub async fn fetch_perpetuals(&self) -> RegistryResult<Vec<Perpetual>> {
        info!(url = %self.base_url, "Fetching perpetuals from chain");
        let perpetuals = collect_pages(|key| async move {
            let query: Vec<(&str, &str)> = match key.as_deref() {
                Some(key) => vec![("pagination.key", key)],
                None => Vec::new(),
            };
            self.get_json::<PerpetualsPage>(PERPETUALS_PATH, &query).await
        })
        .await?;
        info!(perpetuals = perpetuals.len(), "Fetched perpetuals");
        Ok(perpetuals)
    }
}

/// Drain a paginated perpetuals query.
///
/// `fetch` receives the next-page key (`None` for the first page). A page
/// without a `perpetual` field, or a cursor that repeats, is an error.
pub(crate) async fn collect_pages<F, Fut>(mut fetch: F) -> RegistryResult<Vec<Perpetual>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = RegistryResult<PerpetualsPage>>,
{
    let mut out = Vec::new();
    let mut key: Option<String> = None;
    let mut seen_keys: Vec<String> = Vec::new();

    loop {
        let page = fetch(key.clone()).await?;
        let perpetuals = page.perpetual.ok_or_else(|| {
            RegistryError::Perpetuals("perpetuals response has no perpetual list".to_string())
        })?;
        out.extend(perpetuals);

        let next = page
            .pagination
            .as_ref()
            .and_then(PageResponse::next)
            .map(str::to_string);
        match next {
            None => return Ok(out),
            Some(next) if seen_keys.contains(&next) => {
                return Err(RegistryError::Perpetuals(format!(
                    "pagination key {next} repeated"
                )));
            }
            Some(next) => {
                debug!(fetched = out.len(), "Fetching next perpetuals page");
                seen_keys.push(next.clone());
                key = Some(next);
            }
        }
    }
}

impl MarketMapSource for ChainRestClient {
    fn market_map(&self) -> BoxFuture<'_, RegistryResult<MarketMap>> {
        Box::pin(self.fetch_market_map())
    }
}

impl PerpetualsSource for ChainRestClient {
    fn all_perpetuals(&self) -> BoxFuture<'_, RegistryResult<Vec<Perpetual>>> {
        Box::pin(self.fetch_perpetuals())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mms_core::PerpetualMarketType;
    use std::collections::HashMap;

    #[test]
    fn test_market_map_response_deserialize() {
        let body = r#"{
            "market_map": {
                "markets": {
                    "BTC/USD": {
                        "ticker": {
                            "currency_pair": {"Base": "BTC", "Quote": "USD"},
                            "decimals": "8",
                            "min_provider_count": "1",
                            "enabled": true,
                            "metadata_JSON": ""
                        },
                        "provider_configs": [
                            {"name": "binance_ws", "off_chain_ticker": "BTCUSDT",
                             "normalize_by_pair": {"Base": "USDT", "Quote": "USD"},
                             "invert": false, "metadata_JSON": ""}
                        ]
                    }
                }
            },
            "last_updated": "42",
            "chain_id": "test"
        }"#;

        let response: MarketMapResponse = serde_json::from_str(body).unwrap();
        let btc = response.market_map.get("BTC/USD").unwrap();
        assert_eq!(btc.ticker.decimals, 8);
        assert!(btc.is_enabled());
        assert_eq!(btc.normalize_targets().count(), 1);
    }

    #[test]
    fn test_empty_market_map_response() {
        let response: MarketMapResponse = serde_json::from_str(r#"{"market_map":{}}"#).unwrap();
        assert!(response.market_map.is_empty());

        let response: MarketMapResponse =
            serde_json::from_str(r#"{"market_map":{"markets":null}}"#).unwrap();
        assert!(response.market_map.is_empty());
    }

    #[test]
    fn test_perpetuals_page_deserialize() {
        let body = r#"{
            "perpetual": [
                {"params": {"id": 0, "ticker": "BTC-USD", "market_id": 0,
                            "market_type": "PERPETUAL_MARKET_TYPE_CROSS"}},
                {"params": {"id": 1, "ticker": "ETH-USD", "market_id": 1,
                            "market_type": "PERPETUAL_MARKET_TYPE_ISOLATED"}}
            ],
            "pagination": {"next_key": null, "total": "2"}
        }"#;
        let page: PerpetualsPage = serde_json::from_str(body).unwrap();
        let perps = page.perpetual.unwrap();
        assert_eq!(perps.len(), 2);
        assert_eq!(perps[0].market_type(), PerpetualMarketType::Cross);
        assert!(page.pagination.unwrap().next().is_none());
    }

    #[test]
    fn test_page_without_list_is_none() {
        let page: PerpetualsPage = serde_json::from_str(r#"{"pagination":{}}"#).unwrap();
        assert!(page.perpetual.is_none());
    }

    fn page(tickers: &[&str], next: Option<&str>) -> PerpetualsPage {
        PerpetualsPage {
            perpetual: Some(
                tickers
                    .iter()
                    .map(|t| Perpetual::new(*t, PerpetualMarketType::Isolated))
                    .collect(),
            ),
            pagination: Some(PageResponse {
                next_key: next.map(str::to_string),
            }),
        }
    }

    #[tokio::test]
    async fn test_collect_pages_follows_cursor() {
        let mut pages: HashMap<Option<String>, PerpetualsPage> = HashMap::new();
        pages.insert(None, page(&["BTC-USD"], Some("k1")));
        pages.insert(Some("k1".into()), page(&["ETH-USD"], Some("k2")));
        pages.insert(Some("k2".into()), page(&["SOL-USD"], Some("")));

        let out = collect_pages(|key| {
            let page = pages.get(&key).cloned();
            async move { page.ok_or_else(|| RegistryError::HttpClient("no page".into())) }
        })
        .await
        .unwrap();

        let tickers: Vec<&str> = out.iter().map(Perpetual::ticker).collect();
        assert_eq!(tickers, vec!["BTC-USD", "ETH-USD", "SOL-USD"]);
    }

    #[tokio::test]
    async fn test_collect_pages_missing_list_errors() {
        let err = collect_pages(|_| async {
            Ok(PerpetualsPage {
                perpetual: None,
                pagination: None,
            })
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RegistryError::Perpetuals(_)));
    }

    #[tokio::test]
    async fn test_collect_pages_repeated_cursor_errors() {
        let err = collect_pages(|_| async { Ok(page(&["BTC-USD"], Some("same"))) })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Perpetuals(_)));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = ChainRestClient::new("http://localhost:1317/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:1317");
    }
}
