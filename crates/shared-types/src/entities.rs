//! # Core Domain Entities
//!
//! - **Identifiers**: [`Address`], [`H256`], [`BlockNumber`]
//! - **Chain**: [`Header`], as returned by `eth_getBlockByNumber(n, false)`

use crate::encoding::{quantity, Bytes};
use crate::errors::ParseError;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub use primitive_types::{H160, H256, U256};

/// A 20-byte account address.
pub type Address = H160;

/// Block selector for header queries.
///
/// `Latest` is not a stable identity and is never used as a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockNumber {
    /// Current chain head.
    Latest,
    /// A specific height.
    Number(u64),
}

impl BlockNumber {
    /// JSON-RPC argument form: `"latest"` or minimal lowercase hex.
    pub fn to_rpc_arg(&self) -> String {
        match self {
            BlockNumber::Latest => "latest".to_string(),
            BlockNumber::Number(n) => quantity::format(*n),
        }
    }

    /// The concrete height, if any.
    pub fn as_number(&self) -> Option<u64> {
        match self {
            BlockNumber::Latest => None,
            BlockNumber::Number(n) => Some(*n),
        }
    }
}

impl From<u64> for BlockNumber {
    fn from(n: u64) -> Self {
        BlockNumber::Number(n)
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockNumber::Latest => f.write_str("latest"),
            BlockNumber::Number(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for BlockNumber {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(BlockNumber::Latest),
            other if other.starts_with("0x") || other.starts_with("0X") => {
                quantity::parse(other).map(BlockNumber::Number)
            }
            other => other
                .parse::<u64>()
                .map(BlockNumber::Number)
                .map_err(|_| ParseError::InvalidBlockTag(other.to_string())),
        }
    }
}

impl Serialize for BlockNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_rpc_arg())
    }
}

/// Block header with every field covered by the consensus signing hash.
///
/// Immutable once fetched; identified by `number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub parent_hash: H256,
    #[serde(rename = "sha3Uncles")]
    pub uncles_hash: H256,
    #[serde(rename = "miner")]
    pub coinbase: Address,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bytes,
    pub difficulty: U256,
    #[serde(with = "quantity")]
    pub number: u64,
    #[serde(with = "quantity")]
    pub gas_limit: u64,
    #[serde(with = "quantity")]
    pub gas_used: u64,
    #[serde(with = "quantity")]
    pub timestamp: u64,
    pub extra_data: Bytes,
    #[serde(rename = "mixHash")]
    pub mix_digest: H256,
    pub nonce: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
    /// Hash as reported by the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<H256>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parent_hash: H256::zero(),
            uncles_hash: H256::zero(),
            coinbase: Address::zero(),
            state_root: H256::zero(),
            transactions_root: H256::zero(),
            receipts_root: H256::zero(),
            logs_bloom: Bytes(vec![0u8; 256]),
            difficulty: U256::one(),
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Bytes::new(),
            mix_digest: H256::zero(),
            nonce: Bytes(vec![0u8; 8]),
            base_fee_per_gas: None,
            hash: None,
        }
    }
}
