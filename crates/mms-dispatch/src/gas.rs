//! Gas estimation.

use crate::error::{DispatchError, DispatchResult};
use crate::tx::UnsignedTx;
use crate::BoxFuture;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use mms_core::wire::u64_string;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SIMULATE_PATH: &str = "/cosmos/tx/v1beta1/simulate";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Estimates gas for a transaction skeleton.
pub trait GasEstimator: Send + Sync {
    /// Simulated gas for `tx`, multiplied by `adjustment` and rounded up.
    fn estimate<'a>(&'a self, tx: &'a UnsignedTx, adjustment: f64) -> BoxFuture<'a, DispatchResult<u64>>;
}

/// Apply an adjustment factor to simulated gas.
pub fn adjust_gas(simulated: u64, adjustment: f64) -> u64 {
    let adjusted = (simulated as f64 * adjustment).ceil();
    if adjusted >= u64::MAX as f64 {
        u64::MAX
    } else {
        adjusted as u64
    }
}

#[derive(Debug, Serialize)]
struct SimulateRequest {
    tx_bytes: String,
}

impl SimulateRequest {
    /// `TxRaw` with one empty signature; the node skips signature checks on simulate.
    fn for_tx(tx: &UnsignedTx) -> Self {
        Self {
            tx_bytes: BASE64.encode(tx.encode_raw(vec![Vec::new()])),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SimulateResponse {
    gas_info: GasInfo,
}

#[derive(Debug, Deserialize)]
struct GasInfo {
    #[serde(with = "u64_string")]
    gas_used: u64,
}

/// Estimator backed by the chain REST `simulate` endpoint.
#[derive(Debug, Clone)]
pub struct RestGasEstimator {
    client: Client,
    url: String,
}

impl RestGasEstimator {
    pub fn new(rest_address: &str) -> DispatchResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}{SIMULATE_PATH}", rest_address.trim_end_matches('/')),
        })
    }

    async fn simulate(&self, tx: &UnsignedTx) -> DispatchResult<u64> {
        let request = SimulateRequest::for_tx(tx);
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DispatchError::GasEstimation(format!("simulate request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::GasEstimation(format!("simulate HTTP {status}: {body}")));
        }

        let body: SimulateResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::GasEstimation(format!("bad simulate response: {e}")))?;
        Ok(body.gas_info.gas_used)
    }
}

impl GasEstimator for RestGasEstimator {
    fn estimate<'a>(&'a self, tx: &'a UnsignedTx, adjustment: f64) -> BoxFuture<'a, DispatchResult<u64>> {
        Box::pin(async move {
            let simulated = self.simulate(tx).await?;
            let gas = adjust_gas(simulated, adjustment);
            debug!(simulated, adjustment, gas, "Estimated gas");
            Ok(gas)
        })
    }
}

/// Mock estimator returning a fixed simulated amount.
#[derive(Debug)]
pub struct MockGasEstimator {
    simulated: u64,
    failure: Option<String>,
    calls: Mutex<Vec<UnsignedTx>>,
}

impl MockGasEstimator {
    pub fn new(simulated: u64) -> Self {
        Self {
            simulated,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Estimator whose every call fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            simulated: 0,
            failure: Some(reason.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Skeletons passed to `estimate`, in call order.
    pub fn calls(&self) -> Vec<UnsignedTx> {
        self.calls.lock().clone()
    }
}

impl GasEstimator for MockGasEstimator {
    fn estimate<'a>(&'a self, tx: &'a UnsignedTx, adjustment: f64) -> BoxFuture<'a, DispatchResult<u64>> {
        Box::pin(async move {
            self.calls.lock().push(tx.clone());
            match &self.failure {
                Some(reason) => Err(DispatchError::GasEstimation(reason.clone())),
                None => Ok(adjust_gas(self.simulated, adjustment)),
            }
        })
    }
}
