//! Sequential dispatch of generated transactions.
//!
//! Transaction `i + 1` is broadcast only after `i` is included: later
//! transactions carry later account sequences and may normalize against
//! markets written by earlier ones. The first failure stops the run; the
//! transactions already included travel with the error.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{DispatchError, DispatchResult};
use crate::generator::GeneratedTx;
use crate::submitter::{SubmittedTx, Submitter};

/// Summary of a completed dispatch.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub included: Vec<SubmittedTx>,
}

impl DispatchReport {
    pub fn hashes(&self) -> Vec<&str> {
        self.included.iter().map(|tx| tx.hash.as_str()).collect()
    }
}

pub struct Dispatcher {
    submitter: Submitter,
}

impl Dispatcher {
    pub fn new(submitter: Submitter) -> Self {
        Self { submitter }
    }

    /// Submit `txs` strictly in order.
    ///
    /// On failure returns [`DispatchError::Submission`] naming the failed
    /// index and how many transactions were never sent.
    pub async fn dispatch(
        &self,
        txs: &[GeneratedTx],
        cancel: &CancellationToken,
    ) -> DispatchResult<DispatchReport> {
        let started_at = Utc::now();
        let mut included = Vec::with_capacity(txs.len());

        for (index, tx) in txs.iter().enumerate() {
            info!(
                index,
                total = txs.len(),
                sequence = tx.sequence,
                markets = tx.markets.len(),
                "Submitting transaction"
            );
            match self.submitter.submit(&tx.bytes, cancel).await {
                Ok(submitted) => {
                    info!(
                        index,
                        tx_hash = %submitted.hash,
                        height = submitted.height,
                        markets = ?tx.markets,
                        "Markets written"
                    );
                    included.push(submitted);
                }
                Err(e) => {
                    let remaining = txs.len() - index - 1;
                    error!(
                        index,
                        remaining,
                        included = included.len(),
                        error = %e,
                        "Submission failed, halting dispatch"
                    );
                    return Err(DispatchError::Submission {
                        index,
                        remaining,
                        included,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(DispatchReport {
            started_at,
            finished_at: Utc::now(),
            included,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DecCoin, SubmitterConfig};
    use crate::submitter::{BroadcastResponse, MockBroadcastClient};
    use crate::tx::UnsignedTx;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    fn generated(n: usize) -> Vec<GeneratedTx> {
        (0..n)
            .map(|i| GeneratedTx {
                bytes: format!("tx{i}").into_bytes(),
                tx: UnsignedTx::new("test-1", 0, i as u64, 100, &DecCoin::new("stake", dec!(0)), vec![])
                    .unwrap(),
                sequence: i as u64,
                gas_limit: 100,
                markets: vec![format!("M{i}/USD")],
            })
            .collect()
    }

    fn dispatcher(client: Arc<MockBroadcastClient>) -> Dispatcher {
        Dispatcher::new(Submitter::new(client, &SubmitterConfig::default()))
    }

    #[tokio::test]
    async fn test_all_included_in_order() {
        tokio::time::pause();
        let client = Arc::new(MockBroadcastClient::new());

        let report = assert_ok!(
            dispatcher(client.clone())
                .dispatch(&generated(3), &CancellationToken::new())
                .await
        );

        assert_eq!(report.hashes(), vec!["HASH0", "HASH1", "HASH2"]);
        let sent: Vec<Vec<u8>> = client.broadcasts();
        assert_eq!(sent, vec![b"tx0".to_vec(), b"tx1".to_vec(), b"tx2".to_vec()]);
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn test_first_failure_halts_remaining() {
        tokio::time::pause();
        let client = Arc::new(MockBroadcastClient::new());
        client.push_broadcast(Ok(BroadcastResponse {
            code: 0,
            log: String::new(),
            hash: "OK0".to_string(),
        }));
        client.push_broadcast(Ok(BroadcastResponse {
            code: 19,
            log: "tx already in mempool".to_string(),
            hash: "BAD1".to_string(),
        }));

        let err = dispatcher(client.clone())
            .dispatch(&generated(4), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            DispatchError::Submission {
                index,
                remaining,
                included,
                source,
            } => {
                assert_eq!(index, 1);
                assert_eq!(remaining, 2);
                let hashes: Vec<&str> = included.iter().map(|tx| tx.hash.as_str()).collect();
                assert_eq!(hashes, vec!["OK0"]);
                assert!(matches!(*source, DispatchError::CheckTx { code: 19, .. }));
            }
            other => panic!("expected submission error, got {other}"),
        }
        assert_eq!(client.broadcasts().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_after_inclusions_keeps_included() {
        tokio::time::pause();
        let client = Arc::new(MockBroadcastClient::new());
        // tx0 and tx1 included on first query, tx2 never found
        client.push_query(Ok(Default::default()));
        client.push_query(Ok(Default::default()));
        for _ in 0..100 {
            client.push_query(Err("tx not found".into()));
        }

        let err = dispatcher(client.clone())
            .dispatch(&generated(3), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.outcome(), "timed_out");
        let hashes: Vec<&str> = err.included().iter().map(|tx| tx.hash.as_str()).collect();
        assert_eq!(hashes, vec!["HASH0", "HASH1"]);
        assert!(matches!(err, DispatchError::Submission { index: 2, remaining: 0, .. }));
    }

    #[tokio::test]
    async fn test_empty_dispatch() {
        let client = Arc::new(MockBroadcastClient::new());
        let report = dispatcher(client)
            .dispatch(&[], &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.included.is_empty());
    }
}
