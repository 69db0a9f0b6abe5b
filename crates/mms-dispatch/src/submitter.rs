//! Transaction submission.
//!
//! Each transaction goes through:
//!
//! ```text
//! Broadcast -> CheckTxOk -> PollInclusion -> Included
//!                                         -> ExecutionFailed
//!                                         -> TimedOut
//! ```
//!
//! Broadcast has a fixed timeout and its transport errors are fatal, as is a
//! non-zero check code. Inclusion queries that error are retried until the
//! polling deadline, and a query still outstanding at the deadline is
//! abandoned. Cancellation aborts any stage immediately.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{SubmitterConfig, BROADCAST_TIMEOUT};
use crate::error::{DispatchError, DispatchResult};
use crate::BoxFuture;

/// Result of `broadcast_tx_sync`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastResponse {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub log: String,
    pub hash: String,
}

/// Execution result of an included transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TxExecution {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub log: String,
}

/// Included transaction as returned by a hash query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TxQueryResponse {
    pub hash: String,
    #[serde(default, with = "mms_core::wire::u64_string_default")]
    pub height: u64,
    pub tx_result: TxExecution,
}

/// Broadcast and query RPC.
pub trait BroadcastClient: Send + Sync {
    fn broadcast_tx_sync<'a>(&'a self, tx: &'a [u8]) -> BoxFuture<'a, DispatchResult<BroadcastResponse>>;

    /// Look up an included transaction. Errors while it is still pending.
    fn tx_by_hash<'a>(&'a self, hash: &'a str) -> BoxFuture<'a, DispatchResult<TxQueryResponse>>;
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
    pub hash: String,
    pub height: u64,
    pub latency: Duration,
}

pub struct Submitter {
    client: Arc<dyn BroadcastClient>,
    polling_frequency: Duration,
    polling_duration: Duration,
    broadcast_timeout: Duration,
}

impl Submitter {
    pub fn new(client: Arc<dyn BroadcastClient>, config: &SubmitterConfig) -> Self {
        Self {
            client,
            polling_frequency: config.polling_frequency(),
            polling_duration: config.polling_duration(),
            broadcast_timeout: BROADCAST_TIMEOUT,
        }
    }

    /// Broadcast `tx` and wait for it to be included.
    pub async fn submit(&self, tx: &[u8], cancel: &CancellationToken) -> DispatchResult<SubmittedTx> {
        let started = Instant::now();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
            result = tokio::time::timeout(self.broadcast_timeout, self.client.broadcast_tx_sync(tx)) => {
                match result {
                    Err(_) => {
                        return Err(DispatchError::Broadcast(format!(
                            "no response within {}s",
                            self.broadcast_timeout.as_secs()
                        )))
                    }
                    Ok(Err(e @ DispatchError::Broadcast(_))) => return Err(e),
                    Ok(Err(e)) => return Err(DispatchError::Broadcast(e.to_string())),
                    Ok(Ok(response)) => response,
                }
            }
        };

        if response.code != 0 {
            return Err(DispatchError::CheckTx {
                hash: response.hash,
                code: response.code,
                log: response.log,
            });
        }
        debug!(tx_hash = %response.hash, "CheckTx passed, polling for inclusion");

        let included = self.poll_inclusion(&response.hash, started, cancel).await?;
        if included.tx_result.code != 0 {
            return Err(DispatchError::DeliverTx {
                hash: response.hash,
                code: included.tx_result.code,
                log: included.tx_result.log,
            });
        }

        let latency = started.elapsed();
        info!(
            tx_hash = %response.hash,
            height = included.height,
            latency_ms = latency.as_millis() as u64,
            "Transaction included"
        );
        Ok(SubmittedTx {
            hash: response.hash,
            height: included.height,
            latency,
        })
    }

    async fn poll_inclusion(
        &self,
        hash: &str,
        started: Instant,
        cancel: &CancellationToken,
    ) -> DispatchResult<TxQueryResponse> {
        let deadline = Instant::now() + self.polling_duration;
        let timed_out = || {
            warn!(tx_hash = %hash, "Gave up waiting for inclusion");
            DispatchError::Timeout {
                hash: hash.to_string(),
                waited_ms: started.elapsed().as_millis() as u64,
            }
        };
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
                _ = tokio::time::sleep(self.polling_frequency) => {}
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
                result = self.client.tx_by_hash(hash) => result,
                _ = tokio::time::sleep_until(deadline) => return Err(timed_out()),
            };
            match result {
                Ok(found) => return Ok(found),
                Err(e) => debug!(tx_hash = %hash, error = %e, "Transaction not found yet"),
            }

            if Instant::now() >= deadline {
                return Err(timed_out());
            }
        }
    }
}

// =============================================================================
// CometBFT RPC client
// =============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

/// CometBFT URI-style RPC client.
#[derive(Debug, Clone)]
pub struct CometRpcClient {
    client: Client,
    base_url: String,
}

impl CometRpcClient {
    pub fn new(rpc_address: &str) -> DispatchResult<Self> {
        let client = Client::builder()
            .timeout(BROADCAST_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: rpc_address.trim_end_matches('/').to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, query: &[(&str, String)]) -> DispatchResult<T> {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| DispatchError::HttpClient(format!("{method} request failed: {e}")))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| DispatchError::HttpClient(format!("{method} response read failed: {e}")))?;
        decode_rpc(method, &body)
    }
}

fn decode_rpc<T: DeserializeOwned>(method: &str, body: &[u8]) -> DispatchResult<T> {
    let response: RpcResponse<T> = serde_json::from_slice(body)?;
    if let Some(error) = response.error {
        return Err(DispatchError::HttpClient(format!(
            "{method} RPC error {}: {} {}",
            error.code,
            error.message,
            error.data.unwrap_or_default()
        )));
    }
    response
        .result
        .ok_or_else(|| DispatchError::HttpClient(format!("{method} returned no result")))
}

impl BroadcastClient for CometRpcClient {
    fn broadcast_tx_sync<'a>(&'a self, tx: &'a [u8]) -> BoxFuture<'a, DispatchResult<BroadcastResponse>> {
        Box::pin(async move {
            self.call("broadcast_tx_sync", &[("tx", format!("0x{}", hex::encode(tx)))])
                .await
                .map_err(|e| DispatchError::Broadcast(e.to_string()))
        })
    }

    fn tx_by_hash<'a>(&'a self, hash: &'a str) -> BoxFuture<'a, DispatchResult<TxQueryResponse>> {
        Box::pin(async move {
            self.call("tx", &[("hash", format!("0x{}", hash.to_uppercase()))])
                .await
        })
    }
}

// =============================================================================
// Mock
// =============================================================================

/// Scripted broadcast client.
///
/// Scripted results are consumed in order; once a script is empty, broadcasts
/// succeed with a generated hash and queries report successful inclusion.
#[derive(Debug, Default)]
pub struct MockBroadcastClient {
    broadcasts: Mutex<Vec<Vec<u8>>>,
    queries: Mutex<Vec<String>>,
    broadcast_script: Mutex<VecDeque<Result<BroadcastResponse, String>>>,
    query_script: Mutex<VecDeque<Result<TxExecution, String>>>,
    next_hash: AtomicU64,
}

impl MockBroadcastClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_broadcast(&self, result: Result<BroadcastResponse, String>) {
        self.broadcast_script.lock().push_back(result);
    }

    pub fn push_query(&self, result: Result<TxExecution, String>) {
        self.query_script.lock().push_back(result);
    }

    /// Raw transactions broadcast so far.
    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.broadcasts.lock().clone()
    }

    /// Hashes queried so far, one entry per query.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

impl BroadcastClient for MockBroadcastClient {
    fn broadcast_tx_sync<'a>(&'a self, tx: &'a [u8]) -> BoxFuture<'a, DispatchResult<BroadcastResponse>> {
        Box::pin(async move {
            self.broadcasts.lock().push(tx.to_vec());
            let scripted = self.broadcast_script.lock().pop_front();
            match scripted {
                Some(Ok(response)) => Ok(response),
                Some(Err(msg)) => Err(DispatchError::Broadcast(msg)),
                None => Ok(BroadcastResponse {
                    code: 0,
                    log: String::new(),
                    hash: format!("HASH{}", self.next_hash.fetch_add(1, Ordering::SeqCst)),
                }),
            }
        })
    }

    fn tx_by_hash<'a>(&'a self, hash: &'a str) -> BoxFuture<'a, DispatchResult<TxQueryResponse>> {
        Box::pin(async move {
            self.queries.lock().push(hash.to_string());
            let scripted = self.query_script.lock().pop_front();
            let execution = match scripted {
                Some(Ok(execution)) => execution,
                Some(Err(msg)) => return Err(DispatchError::HttpClient(msg)),
                None => TxExecution {
                    code: 0,
                    log: String::new(),
                },
            };
            Ok(TxQueryResponse {
                hash: hash.to_string(),
                height: 1,
                tx_result: execution,
            })
        })
    }
}
