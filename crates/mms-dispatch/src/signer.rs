//! Signing agents.
//!
//! A [`SigningAgent`] turns an [`UnsignedTx`] into broadcastable bytes and
//! reports the account it signs for. Two backends exist:
//! - [`LocalSigningAgent`]: secp256k1 key loaded from env or file, account
//!   state looked up on chain
//! - [`SimulateSigningAgent`]: no key, returns the `TxRaw` with an empty
//!   signature for dry runs
//!
//! Both produce protobuf `TxRaw` bytes. The local agent signs
//! `SIGN_MODE_DIRECT`: SHA-256 of the encoded `SignDoc`, 64-byte `r || s`.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::B256;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as AlloySigner;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::account::AccountSource;
use crate::error::{DispatchError, DispatchResult};
use crate::tx::UnsignedTx;
use crate::BoxFuture;

// =============================================================================
// KeySource and KeyManager
// =============================================================================

/// Source of the private key.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// Holds the signing key.
///
/// Key material is read into a zeroized buffer and never logged.
pub struct KeyManager {
    signer: PrivateKeySigner,
}

impl KeyManager {
    /// Load the key from `source` (hex, optional `0x` prefix, surrounding
    /// whitespace ignored).
    pub fn load(source: &KeySource) -> Result<Self, KeyError> {
        let secret_bytes: Zeroizing<Vec<u8>> = match source {
            KeySource::EnvVar { var_name } => {
                let hex = Zeroizing::new(
                    std::env::var(var_name).map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
                );
                parse_hex_key(&hex)?
            }
            KeySource::File { path } => {
                let content = Zeroizing::new(std::fs::read_to_string(path)?);
                parse_hex_key(&content)?
            }
        };
        Self::from_bytes(&secret_bytes)
    }

    pub fn from_bytes(secret_bytes: &[u8]) -> Result<Self, KeyError> {
        let signer = PrivateKeySigner::from_slice(secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self { signer })
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Compressed SEC1 public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signer
            .credential()
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }
}

fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let trimmed = hex_str.trim().trim_start_matches("0x");
    Ok(Zeroizing::new(hex::decode(trimmed)?))
}

/// Key management errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// SigningAgent
// =============================================================================

/// Account state needed to build transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningAccount {
    pub sequence: u64,
    pub account_number: u64,
    /// Compressed secp256k1 public key, if known.
    pub pub_key: Option<Vec<u8>>,
}

/// Signs transactions for one account.
pub trait SigningAgent: Send + Sync {
    fn sign<'a>(&'a self, tx: &'a UnsignedTx) -> BoxFuture<'a, DispatchResult<Vec<u8>>>;

    fn signing_account(&self) -> BoxFuture<'_, DispatchResult<SigningAccount>>;

    /// Registered name of the backend.
    fn name(&self) -> &'static str;
}

/// Signs with a locally held secp256k1 key.
pub struct LocalSigningAgent {
    keys: KeyManager,
    address: String,
    accounts: Arc<dyn AccountSource>,
}

impl LocalSigningAgent {
    pub fn new(keys: KeyManager, address: impl Into<String>, accounts: Arc<dyn AccountSource>) -> Self {
        Self {
            keys,
            address: address.into(),
            accounts,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn sign_tx(&self, tx: &UnsignedTx) -> DispatchResult<Vec<u8>> {
        let digest = sign_doc_digest(tx);

        // Do not log the signature
        let signature = self
            .keys
            .signer()
            .sign_hash(&digest)
            .await
            .map_err(|e| DispatchError::Signing(e.to_string()))?;

        debug!(sequence = tx.sequence, gas = tx.gas_limit, "Signed transaction");
        Ok(tx.encode_raw(vec![signature.as_bytes()[..64].to_vec()]))
    }

    async fn lookup_account(&self) -> DispatchResult<SigningAccount> {
        let account = self.accounts.account(&self.address).await?;
        Ok(SigningAccount {
            sequence: account.sequence,
            account_number: account.account_number,
            pub_key: Some(self.keys.public_key_bytes()),
        })
    }
}

impl SigningAgent for LocalSigningAgent {
    fn sign<'a>(&'a self, tx: &'a UnsignedTx) -> BoxFuture<'a, DispatchResult<Vec<u8>>> {
        Box::pin(self.sign_tx(tx))
    }

    fn signing_account(&self) -> BoxFuture<'_, DispatchResult<SigningAccount>> {
        Box::pin(self.lookup_account())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// SHA-256 of the encoded `SignDoc`.
pub fn sign_doc_digest(tx: &UnsignedTx) -> B256 {
    B256::from_slice(&Sha256::digest(tx.sign_doc_bytes()))
}

/// Keyless agent for dry runs.
#[derive(Debug, Clone, Default)]
pub struct SimulateSigningAgent {
    account: SigningAccount,
}

impl SimulateSigningAgent {
    pub fn new(account: SigningAccount) -> Self {
        Self { account }
    }
}

impl SigningAgent for SimulateSigningAgent {
    fn sign<'a>(&'a self, tx: &'a UnsignedTx) -> BoxFuture<'a, DispatchResult<Vec<u8>>> {
        Box::pin(async move { Ok(tx.encode_raw(vec![Vec::new()])) })
    }

    fn signing_account(&self) -> BoxFuture<'_, DispatchResult<SigningAccount>> {
        let account = self.account.clone();
        Box::pin(async move { Ok(account) })
    }

    fn name(&self) -> &'static str {
        "simulate"
    }
}

// =============================================================================
// Tests
// =============================================================================
