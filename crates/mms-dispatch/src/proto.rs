//! Protobuf wire types for transactions.
//!
//! Declared by hand with `prost` derives rather than generated: only the
//! handful of Cosmos SDK tx envelope messages and the market-map upsert
//! message are needed. Field tags follow the upstream `.proto` files.

use crate::batch::MsgUpsertMarkets;
use mms_core::{CurrencyPair, Market, ProviderConfig, Ticker};
use prost::Message;
use prost_types::Any;

/// Type URL of a secp256k1 public key.
pub const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";

/// `SIGN_MODE_DIRECT`
pub const SIGN_MODE_DIRECT: i32 = 1;

// =============================================================================
// cosmos.tx.v1beta1
// =============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct TxBody {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<Any>,
    #[prost(string, tag = "2")]
    pub memo: String,
    #[prost(uint64, tag = "3")]
    pub timeout_height: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct AuthInfo {
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfo>,
    #[prost(message, optional, tag = "2")]
    pub fee: Option<Fee>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignerInfo {
    /// Absent until the account's key is known on chain; simulation accepts that.
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<Any>,
    #[prost(message, optional, tag = "2")]
    pub mode_info: Option<ModeInfo>,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

/// `ModeInfo` restricted to its `single` arm (oneof field 1).
#[derive(Clone, PartialEq, Message)]
pub struct ModeInfo {
    #[prost(message, optional, tag = "1")]
    pub single: Option<ModeInfoSingle>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ModeInfoSingle {
    #[prost(int32, tag = "1")]
    pub mode: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct Fee {
    #[prost(message, repeated, tag = "1")]
    pub amount: Vec<Coin>,
    #[prost(uint64, tag = "2")]
    pub gas_limit: u64,
    #[prost(string, tag = "3")]
    pub payer: String,
    #[prost(string, tag = "4")]
    pub granter: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Coin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignDoc {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(string, tag = "3")]
    pub chain_id: String,
    #[prost(uint64, tag = "4")]
    pub account_number: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct TxRaw {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

/// `cosmos.crypto.secp256k1.PubKey`
#[derive(Clone, PartialEq, Message)]
pub struct Secp256k1PubKey {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

impl Secp256k1PubKey {
    /// Compressed key wrapped in `Any`.
    pub fn to_any(key: &[u8]) -> Any {
        Any {
            type_url: SECP256K1_PUBKEY_TYPE_URL.to_string(),
            value: Self { key: key.to_vec() }.encode_to_vec(),
        }
    }
}

// =============================================================================
// marketmap.v1
// =============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct ProtoCurrencyPair {
    #[prost(string, tag = "1")]
    pub base: String,
    #[prost(string, tag = "2")]
    pub quote: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoTicker {
    #[prost(message, optional, tag = "1")]
    pub currency_pair: Option<ProtoCurrencyPair>,
    #[prost(uint64, tag = "2")]
    pub decimals: u64,
    #[prost(uint64, tag = "3")]
    pub min_provider_count: u64,
    #[prost(bool, tag = "14")]
    pub enabled: bool,
    #[prost(string, tag = "15")]
    pub metadata_json: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoProviderConfig {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub off_chain_ticker: String,
    #[prost(message, optional, tag = "3")]
    pub normalize_by_pair: Option<ProtoCurrencyPair>,
    #[prost(bool, tag = "4")]
    pub invert: bool,
    #[prost(string, tag = "15")]
    pub metadata_json: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoMarket {
    #[prost(message, optional, tag = "1")]
    pub ticker: Option<ProtoTicker>,
    #[prost(message, repeated, tag = "2")]
    pub provider_configs: Vec<ProtoProviderConfig>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoMsgUpsertMarkets {
    #[prost(string, tag = "1")]
    pub authority: String,
    #[prost(message, repeated, tag = "2")]
    pub markets: Vec<ProtoMarket>,
}

impl From<&CurrencyPair> for ProtoCurrencyPair {
    fn from(pair: &CurrencyPair) -> Self {
        Self {
            base: pair.base.clone(),
            quote: pair.quote.clone(),
        }
    }
}

impl From<&Ticker> for ProtoTicker {
    fn from(ticker: &Ticker) -> Self {
        Self {
            currency_pair: Some((&ticker.currency_pair).into()),
            decimals: ticker.decimals,
            min_provider_count: ticker.min_provider_count,
            enabled: ticker.enabled,
            metadata_json: ticker.metadata_json.clone(),
        }
    }
}

impl From<&ProviderConfig> for ProtoProviderConfig {
    fn from(provider: &ProviderConfig) -> Self {
        Self {
            name: provider.name.clone(),
            off_chain_ticker: provider.off_chain_ticker.clone(),
            normalize_by_pair: provider.normalize_by_pair.as_ref().map(Into::into),
            invert: provider.invert,
            metadata_json: provider.metadata_json.clone(),
        }
    }
}

impl From<&Market> for ProtoMarket {
    fn from(market: &Market) -> Self {
        Self {
            ticker: Some((&market.ticker).into()),
            provider_configs: market.provider_configs.iter().map(Into::into).collect(),
        }
    }
}

impl MsgUpsertMarkets {
    /// Message packed into `Any` under its configured type URL.
    pub fn to_any(&self) -> Any {
        let msg = ProtoMsgUpsertMarkets {
            authority: self.authority.clone(),
            markets: self.markets.iter().map(Into::into).collect(),
        };
        Any {
            type_url: self.type_url.clone(),
            value: msg.encode_to_vec(),
        }
    }
}
