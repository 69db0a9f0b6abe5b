//! Dispatch of market-map upserts to the chain.
//!
//! # Key Components
//!
//! - [`convert_upserts_to_messages`]: Packs ordered upserts into size-bounded messages
//! - [`TxGenerator`]: Gas estimation, fee computation and signing with consecutive sequences
//! - [`SigningAgent`]: Local-key and simulate-only signing backends
//! - [`SignerRegistry`]: Name -> factory map for signing backends
//! - [`Submitter`]: Broadcast and inclusion polling for a single transaction
//! - [`Dispatcher`]: Strictly sequential submission with halt-on-first-failure
//!
//! # Pipeline
//!
//! 1. Batch upserts into `MsgUpsertMarkets` messages
//! 2. Estimate gas for every message at the run's starting sequence
//! 3. Sign each transaction at consecutive account sequences
//! 4. Broadcast, wait for inclusion, then move to the next

use std::future::Future;
use std::pin::Pin;

pub mod account;
pub mod batch;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gas;
pub mod generator;
pub mod proto;
pub mod registry;
pub mod sequence;
pub mod signer;
pub mod submitter;
pub mod tx;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Accounts
pub use account::{AccountSource, BaseAccount, RestAccountSource, StaticAccountSource};

// Batching
pub use batch::{convert_upserts_to_messages, upsert_type_url, MsgUpsertMarkets};

// Configuration
pub use config::{
    ChainConfig, Coin, DecCoin, DispatchConfig, SigningConfig, SubmitterConfig, TxConfig,
    BROADCAST_TIMEOUT,
};

// Dispatch
pub use dispatcher::{DispatchReport, Dispatcher};

// Error types
pub use error::{DispatchError, DispatchResult};

// Gas
pub use gas::{adjust_gas, GasEstimator, MockGasEstimator, RestGasEstimator};

// Transaction generation
pub use generator::{GeneratedTx, TxGenerator};
pub use sequence::SequenceTracker;
pub use tx::{compute_fee, UnsignedTx};

// Signing
pub use registry::{SignerFactory, SignerRegistry, LOCAL_SIGNER, SIMULATE_SIGNER};
pub use signer::{
    sign_doc_digest, KeyError, KeyManager, KeySource, LocalSigningAgent, SigningAccount,
    SigningAgent, SimulateSigningAgent,
};

// Submission
pub use submitter::{
    BroadcastClient, BroadcastResponse, CometRpcClient, MockBroadcastClient, SubmittedTx,
    Submitter, TxExecution, TxQueryResponse,
};
