//! On-chain account lookup for the signing account.

use crate::error::{DispatchError, DispatchResult};
use crate::BoxFuture;
use mms_core::wire::u64_string_default;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Type URL of the only account type that can sign governance transactions.
pub const BASE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.BaseAccount";

const ACCOUNTS_PATH: &str = "/cosmos/auth/v1beta1/accounts";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Auth-module base account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseAccount {
    #[serde(default)]
    pub address: String,
    /// Proto-JSON `Any` of the public key; `null` until the account first signs.
    #[serde(default)]
    pub pub_key: Option<serde_json::Value>,
    #[serde(default, with = "u64_string_default")]
    pub account_number: u64,
    #[serde(default, with = "u64_string_default")]
    pub sequence: u64,
}

/// Decode an `{"account": Any}` response, rejecting non-base account types.
pub fn decode_account(body: &serde_json::Value) -> DispatchResult<BaseAccount> {
    let account = body
        .get("account")
        .ok_or_else(|| DispatchError::Account("response has no account".to_string()))?;

    let type_url = account.get("@type").and_then(|t| t.as_str()).unwrap_or_default();
    if type_url != BASE_ACCOUNT_TYPE_URL {
        return Err(DispatchError::Account(format!(
            "unsupported account type {type_url:?}, expected {BASE_ACCOUNT_TYPE_URL}"
        )));
    }

    Ok(serde_json::from_value(account.clone())?)
}

/// Source of account state.
pub trait AccountSource: Send + Sync {
    fn account<'a>(&'a self, address: &'a str) -> BoxFuture<'a, DispatchResult<BaseAccount>>;
}

/// Account lookup over the chain REST gateway.
#[derive(Debug, Clone)]
pub struct RestAccountSource {
    client: Client,
    base_url: String,
}

impl RestAccountSource {
    pub fn new(rest_address: &str) -> DispatchResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: rest_address.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, address: &str) -> DispatchResult<BaseAccount> {
        let url = format!("{}{ACCOUNTS_PATH}/{address}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DispatchError::Account(format!("account request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Account(format!("account {address}: HTTP {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DispatchError::Account(format!("bad account response: {e}")))?;
        let account = decode_account(&body)?;
        debug!(
            address,
            account_number = account.account_number,
            sequence = account.sequence,
            "Fetched signing account"
        );
        Ok(account)
    }
}

impl AccountSource for RestAccountSource {
    fn account<'a>(&'a self, address: &'a str) -> BoxFuture<'a, DispatchResult<BaseAccount>> {
        Box::pin(self.fetch(address))
    }
}

/// Fixed account state.
#[derive(Debug, Clone, Default)]
pub struct StaticAccountSource {
    account: BaseAccount,
}

impl StaticAccountSource {
    pub fn new(account: BaseAccount) -> Self {
        Self { account }
    }
}

impl AccountSource for StaticAccountSource {
    fn account<'a>(&'a self, _address: &'a str) -> BoxFuture<'a, DispatchResult<BaseAccount>> {
        let account = self.account.clone();
        Box::pin(async move { Ok(account) })
    }
}
