//! Transaction envelope and fee computation.

use crate::batch::MsgUpsertMarkets;
use crate::config::{Coin, DecCoin};
use crate::error::{DispatchError, DispatchResult};
use crate::proto;
use mms_core::wire::u64_string;
use prost::Message;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction ready to be signed.
///
/// Encoded as a protobuf `TxRaw` with a single `SIGN_MODE_DIRECT` signer.
/// The JSON form is only used for printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTx {
    pub chain_id: String,
    #[serde(with = "u64_string")]
    pub account_number: u64,
    #[serde(with = "u64_string")]
    pub sequence: u64,
    #[serde(with = "u64_string")]
    pub gas_limit: u64,
    pub fee: Vec<Coin>,
    #[serde(default)]
    pub memo: String,
    pub messages: Vec<MsgUpsertMarkets>,
    /// Compressed secp256k1 key of the signer, when known.
    #[serde(skip)]
    pub pub_key: Option<Vec<u8>>,
}

impl UnsignedTx {
    /// Build a transaction paying `ceil(gas_limit * gas_price)`.
    pub fn new(
        chain_id: impl Into<String>,
        account_number: u64,
        sequence: u64,
        gas_limit: u64,
        gas_price: &DecCoin,
        messages: Vec<MsgUpsertMarkets>,
    ) -> DispatchResult<Self> {
        Ok(Self {
            chain_id: chain_id.into(),
            account_number,
            sequence,
            gas_limit,
            fee: vec![compute_fee(gas_limit, gas_price)?],
            memo: String::new(),
            messages,
            pub_key: None,
        })
    }

    pub fn with_pub_key(mut self, pub_key: Option<Vec<u8>>) -> Self {
        self.pub_key = pub_key;
        self
    }

    /// Move to `sequence` with a new gas limit and the matching fee.
    pub fn reprice(&mut self, sequence: u64, gas_limit: u64, gas_price: &DecCoin) -> DispatchResult<()> {
        self.fee = vec![compute_fee(gas_limit, gas_price)?];
        self.sequence = sequence;
        self.gas_limit = gas_limit;
        Ok(())
    }

    /// Encoded `TxBody`.
    pub fn body_bytes(&self) -> Vec<u8> {
        proto::TxBody {
            messages: self.messages.iter().map(MsgUpsertMarkets::to_any).collect(),
            memo: self.memo.clone(),
            timeout_height: 0,
        }
        .encode_to_vec()
    }

    /// Encoded `AuthInfo`.
    pub fn auth_info_bytes(&self) -> Vec<u8> {
        let signer = proto::SignerInfo {
            public_key: self.pub_key.as_deref().map(proto::Secp256k1PubKey::to_any),
            mode_info: Some(proto::ModeInfo {
                single: Some(proto::ModeInfoSingle {
                    mode: proto::SIGN_MODE_DIRECT,
                }),
            }),
            sequence: self.sequence,
        };
        proto::AuthInfo {
            signer_infos: vec![signer],
            fee: Some(proto::Fee {
                amount: self
                    .fee
                    .iter()
                    .map(|c| proto::Coin {
                        denom: c.denom.clone(),
                        amount: c.amount.clone(),
                    })
                    .collect(),
                gas_limit: self.gas_limit,
                payer: String::new(),
                granter: String::new(),
            }),
        }
        .encode_to_vec()
    }

    /// Encoded `SignDoc`; its SHA-256 digest is what gets signed.
    pub fn sign_doc_bytes(&self) -> Vec<u8> {
        proto::SignDoc {
            body_bytes: self.body_bytes(),
            auth_info_bytes: self.auth_info_bytes(),
            chain_id: self.chain_id.clone(),
            account_number: self.account_number,
        }
        .encode_to_vec()
    }

    /// Encoded `TxRaw` carrying `signatures`.
    pub fn encode_raw(&self, signatures: Vec<Vec<u8>>) -> Vec<u8> {
        proto::TxRaw {
            body_bytes: self.body_bytes(),
            auth_info_bytes: self.auth_info_bytes(),
            signatures,
        }
        .encode_to_vec()
    }

    /// Number of markets across all messages.
    pub fn market_count(&self) -> usize {
        self.messages.iter().map(|m| m.markets.len()).sum()
    }
}

/// Fee for `gas_limit` units at `gas_price`, rounded up to a whole unit.
pub fn compute_fee(gas_limit: u64, gas_price: &DecCoin) -> DispatchResult<Coin> {
    let amount = Decimal::from(gas_limit)
        .checked_mul(gas_price.amount)
        .ok_or_else(|| {
            DispatchError::GasEstimation(format!(
                "fee overflow for {gas_limit} gas at {}{}",
                gas_price.amount, gas_price.denom
            ))
        })?
        .ceil();

    Ok(Coin {
        denom: gas_price.denom.clone(),
        amount: amount.normalize().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_rounds_up() {
        let fee = compute_fee(1_001, &DecCoin::new("stake", dec!(0.025))).unwrap();
        assert_eq!(fee.amount, "26");
        assert_eq!(fee.denom, "stake");
    }

    #[test]
    fn test_fee_exact() {
        let fee = compute_fee(2_000, &DecCoin::new("stake", dec!(0.025))).unwrap();
        assert_eq!(fee.amount, "50");
    }

    #[test]
    fn test_zero_price() {
        let fee = compute_fee(2_000, &DecCoin::new("stake", Decimal::ZERO)).unwrap();
        assert_eq!(fee.amount, "0");
    }

    fn upsert_tx() -> UnsignedTx {
        let msg = MsgUpsertMarkets::new(
            "/slinky.marketmap.v1.MsgUpsertMarkets",
            "cosmos1gov",
            vec![],
        );
        UnsignedTx::new("test-1", 7, 3, 100, &DecCoin::new("stake", dec!(1)), vec![msg]).unwrap()
    }

    #[test]
    fn test_sign_doc_fields() {
        let tx = upsert_tx();
        let doc = proto::SignDoc::decode(tx.sign_doc_bytes().as_slice()).unwrap();
        assert_eq!(doc.chain_id, "test-1");
        assert_eq!(doc.account_number, 7);
        assert_eq!(doc.body_bytes, tx.body_bytes());

        let body = proto::TxBody::decode(doc.body_bytes.as_slice()).unwrap();
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].type_url, "/slinky.marketmap.v1.MsgUpsertMarkets");

        let auth = proto::AuthInfo::decode(doc.auth_info_bytes.as_slice()).unwrap();
        assert_eq!(auth.signer_infos[0].sequence, 3);
        assert!(auth.signer_infos[0].public_key.is_none());
        assert_eq!(
            auth.signer_infos[0].mode_info.as_ref().unwrap().single.as_ref().unwrap().mode,
            proto::SIGN_MODE_DIRECT
        );
        let fee = auth.fee.unwrap();
        assert_eq!(fee.gas_limit, 100);
        assert_eq!(fee.amount[0].amount, "100");
    }

    #[test]
    fn test_pub_key_in_signer_info() {
        let tx = upsert_tx().with_pub_key(Some(vec![3u8; 33]));
        let auth = proto::AuthInfo::decode(tx.auth_info_bytes().as_slice()).unwrap();
        let key = auth.signer_infos[0].public_key.as_ref().unwrap();
        assert_eq!(key.type_url, proto::SECP256K1_PUBKEY_TYPE_URL);
    }

    #[test]
    fn test_reprice_changes_auth_info_only() {
        let mut tx = upsert_tx();
        let body = tx.body_bytes();
        let auth = tx.auth_info_bytes();

        tx.reprice(4, 2_000, &DecCoin::new("stake", dec!(0.025))).unwrap();

        assert_eq!(tx.body_bytes(), body);
        assert_ne!(tx.auth_info_bytes(), auth);
        assert_eq!(tx.fee[0].amount, "50");
        assert_eq!(tx.sequence, 4);
    }

    #[test]
    fn test_raw_carries_signatures() {
        let tx = upsert_tx();
        let raw = proto::TxRaw::decode(tx.encode_raw(vec![Vec::new()]).as_slice()).unwrap();
        assert_eq!(raw.signatures, vec![Vec::<u8>::new()]);
        assert_eq!(raw.auth_info_bytes, tx.auth_info_bytes());
    }
}
