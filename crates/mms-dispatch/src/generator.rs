//! Transaction generation: gas estimation, fee computation, signing.
//!
//! A run estimates every message first and only then signs, so a gas
//! failure on any message leaves nothing signed.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, info};

use crate::batch::MsgUpsertMarkets;
use crate::config::TxConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::gas::GasEstimator;
use crate::sequence::SequenceTracker;
use crate::signer::SigningAgent;
use crate::tx::UnsignedTx;

/// Signed transaction bytes plus the parameters they were built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTx {
    /// Encoded `TxRaw`.
    pub bytes: Vec<u8>,
    /// The transaction that was signed.
    pub tx: UnsignedTx,
    pub sequence: u64,
    pub gas_limit: u64,
    pub markets: Vec<String>,
}

impl GeneratedTx {
    /// Base64 of [`bytes`](Self::bytes), as the broadcast RPC takes it.
    pub fn encoded(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

pub struct TxGenerator {
    chain_id: String,
    config: TxConfig,
    estimator: Arc<dyn GasEstimator>,
    signer: Arc<dyn SigningAgent>,
}

impl TxGenerator {
    pub fn new(
        chain_id: impl Into<String>,
        config: TxConfig,
        estimator: Arc<dyn GasEstimator>,
        signer: Arc<dyn SigningAgent>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            config,
            estimator,
            signer,
        }
    }

    /// Sign one transaction per message, in order, with consecutive sequences.
    ///
    /// Any estimation, ceiling, account or signing failure aborts the run and
    /// returns no transactions.
    pub async fn generate(&self, messages: Vec<MsgUpsertMarkets>) -> DispatchResult<Vec<GeneratedTx>> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let account = self.signer.signing_account().await?;
        let mut sequence = SequenceTracker::new(account.sequence);
        let max_gas = self.config.max_gas;
        let price = &self.config.min_gas_price;

        let mut estimated = Vec::with_capacity(messages.len());
        for (index, message) in messages.into_iter().enumerate() {
            let skeleton = UnsignedTx::new(
                &self.chain_id,
                account.account_number,
                sequence.simulation(),
                max_gas,
                price,
                vec![message],
            )?
            .with_pub_key(account.pub_key.clone());

            let gas = self
                .estimator
                .estimate(&skeleton, self.config.gas_adjustment)
                .await?;
            if gas > max_gas {
                return Err(DispatchError::GasCeiling {
                    estimated: gas,
                    max: max_gas,
                });
            }
            debug!(index, gas, "Gas estimate within ceiling");
            estimated.push((skeleton, gas));
        }

        let mut out = Vec::with_capacity(estimated.len());
        for (mut tx, gas) in estimated {
            tx.reprice(sequence.current(), gas, price)?;
            let bytes = self.signer.sign(&tx).await?;
            let used = sequence.advance();

            out.push(GeneratedTx {
                bytes,
                sequence: used,
                gas_limit: gas,
                markets: tx.messages.iter().flat_map(MsgUpsertMarkets::market_keys).collect(),
                tx,
            });
        }

        info!(
            txs = out.len(),
            first_sequence = sequence.simulation(),
            signer = self.signer.name(),
            "Generated transactions"
        );
        Ok(out)
    }
}
