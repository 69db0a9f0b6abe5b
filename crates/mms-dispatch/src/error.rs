//! Dispatch error types.

use crate::signer::KeyError;
use crate::submitter::SubmittedTx;
use mms_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Market {market} encodes to {size} bytes, over the {max} byte transaction budget")]
    SizeLimit {
        market: String,
        size: usize,
        max: usize,
    },

    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("Adjusted gas {estimated} exceeds ceiling {max}")]
    GasCeiling { estimated: u64, max: u64 },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Account error: {0}")]
    Account(String),

    #[error("Unknown signer type: {0}")]
    UnknownSigner(String),

    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    #[error("CheckTx rejected transaction {hash} with code {code}: {log}")]
    CheckTx { hash: String, code: u32, log: String },

    #[error("DeliverTx failed for transaction {hash} with code {code}: {log}")]
    DeliverTx { hash: String, code: u32, log: String },

    #[error("Transaction {hash} not included after {waited_ms}ms")]
    Timeout { hash: String, waited_ms: u64 },

    #[error("Cancelled")]
    Cancelled,

    #[error("Transaction {index} failed, {remaining} not submitted: {source}")]
    Submission {
        index: usize,
        remaining: usize,
        /// Transactions before `index`, all included.
        included: Vec<SubmittedTx>,
        source: Box<DispatchError>,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl DispatchError {
    /// Metric label for a submission failure.
    pub fn outcome(&self) -> &'static str {
        match self {
            DispatchError::CheckTx { .. } => "check_tx_failed",
            DispatchError::DeliverTx { .. } => "deliver_tx_failed",
            DispatchError::Timeout { .. } => "timed_out",
            DispatchError::Cancelled => "cancelled",
            DispatchError::Submission { source, .. } => source.outcome(),
            _ => "broadcast_failed",
        }
    }

    /// Transactions included before a submission failure.
    pub fn included(&self) -> &[SubmittedTx] {
        match self {
            DispatchError::Submission { included, .. } => included,
            _ => &[],
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
