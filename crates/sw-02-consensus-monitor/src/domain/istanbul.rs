//! # Istanbul BFT Extra-Data
//!
//! Layout of `Header::extra_data`:
//!
//! ```text
//! vanity (32 bytes) ‖ RLP([validators: [address], seal: bytes, committedSeals: [bytes]])
//! ```
//!
//! ## Digests
//!
//! - Signing hash: keccak256 of the header RLP with the seal and the committed
//!   seals emptied.
//! - Block hash: for headers whose mix digest is [`ISTANBUL_DIGEST`], keccak256
//!   of the header RLP with only the committed seals emptied. Other headers
//!   hash their plain RLP.
//! - Proposer digest: keccak256(signing hash).
//! - Commit digest: keccak256(block hash ‖ [`MSG_COMMIT`]).

use super::RecoveryError;
use primitive_types::H256;
use rlp::{Rlp, RlpStream};
use shared_types::{keccak256, Address, Header};

/// Fixed prefix of the extra-data field.
pub const VANITY_LEN: usize = 32;

/// Length of a seal (`r ‖ s ‖ v`).
pub const SEAL_LEN: usize = 65;

/// Message code of a commit in the Istanbul protocol.
pub const MSG_COMMIT: u8 = 2;

/// Mix digest marking Istanbul headers ("Istanbul practical byzantine fault tolerance").
pub const ISTANBUL_DIGEST: H256 = H256([
    0x63, 0x74, 0x69, 0x63, 0x61, 0x6c, 0x20, 0x62, 0x79, 0x7a, 0x61, 0x6e, 0x74, 0x69, 0x6e, 0x65,
    0x20, 0x66, 0x61, 0x75, 0x6c, 0x74, 0x20, 0x74, 0x6f, 0x6c, 0x65, 0x72, 0x61, 0x6e, 0x63, 0x65,
]);

/// Decoded Istanbul extra-data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IstanbulExtra {
    pub vanity: [u8; VANITY_LEN],
    pub validators: Vec<Address>,
    pub seal: Vec<u8>,
    pub committed_seals: Vec<Vec<u8>>,
}

impl IstanbulExtra {
    /// Decode the extra-data field of a header.
    pub fn decode(extra: &[u8]) -> Result<Self, RecoveryError> {
        if extra.len() < VANITY_LEN {
            return Err(RecoveryError::ExtraDataTooShort {
                len: extra.len(),
                min: VANITY_LEN,
            });
        }

        let mut vanity = [0u8; VANITY_LEN];
        vanity.copy_from_slice(&extra[..VANITY_LEN]);

        let body = &extra[VANITY_LEN..];
        let rlp = Rlp::new(body);
        let malformed = |e: rlp::DecoderError| RecoveryError::MalformedExtra(e.to_string());

        let info = rlp.payload_info().map_err(malformed)?;
        if info.total() != body.len() {
            return Err(RecoveryError::MalformedExtra(format!(
                "{} trailing bytes",
                body.len().saturating_sub(info.total())
            )));
        }
        if !rlp.is_list() || rlp.item_count().map_err(malformed)? != 3 {
            return Err(RecoveryError::MalformedExtra(
                "expected a list of three items".to_string(),
            ));
        }

        Ok(Self {
            vanity,
            validators: rlp.list_at(0).map_err(malformed)?,
            seal: rlp.val_at(1).map_err(malformed)?,
            committed_seals: rlp.list_at(2).map_err(malformed)?,
        })
    }

    /// Encode back into the extra-data layout.
    pub fn encode(&self) -> Vec<u8> {
        self.encode_with(&self.seal, &self.committed_seals)
    }

    /// Extra-data as covered by a digest: committed seals always emptied,
    /// the proposer seal kept only when `keep_seal` is set.
    pub fn filtered(&self, keep_seal: bool) -> Vec<u8> {
        let seal: &[u8] = if keep_seal { &self.seal } else { &[] };
        self.encode_with(seal, &[])
    }

    fn encode_with(&self, seal: &[u8], committed_seals: &[Vec<u8>]) -> Vec<u8> {
        let mut stream = RlpStream::new_list(3);
        stream.begin_list(self.validators.len());
        for validator in &self.validators {
            stream.append(validator);
        }
        stream.append(&seal.to_vec());
        stream.begin_list(committed_seals.len());
        for committed in committed_seals {
            stream.append(committed);
        }

        let mut out = Vec::with_capacity(VANITY_LEN + 128);
        out.extend_from_slice(&self.vanity);
        out.extend_from_slice(&stream.out());
        out
    }
}

/// RLP encoding of `header` with its extra-data replaced by `extra`.
pub fn header_rlp(header: &Header, extra: &[u8]) -> Vec<u8> {
    let fields = if header.base_fee_per_gas.is_some() { 16 } else { 15 };
    let mut stream = RlpStream::new_list(fields);
    stream.append(&header.parent_hash);
    stream.append(&header.uncles_hash);
    stream.append(&header.coinbase);
    stream.append(&header.state_root);
    stream.append(&header.transactions_root);
    stream.append(&header.receipts_root);
    stream.append(&header.logs_bloom.0);
    stream.append(&header.difficulty);
    stream.append(&header.number);
    stream.append(&header.gas_limit);
    stream.append(&header.gas_used);
    stream.append(&header.timestamp);
    stream.append(&extra.to_vec());
    stream.append(&header.mix_digest);
    stream.append(&header.nonce.0);
    if let Some(base_fee) = &header.base_fee_per_gas {
        stream.append(base_fee);
    }
    stream.out().to_vec()
}

/// Hash covered by the proposer seal.
pub fn sig_hash(header: &Header, extra: &IstanbulExtra) -> H256 {
    keccak256(&header_rlp(header, &extra.filtered(false)))
}

/// Block hash as computed by the network.
pub fn block_hash(header: &Header, extra: &IstanbulExtra) -> H256 {
    if header.mix_digest == ISTANBUL_DIGEST {
        keccak256(&header_rlp(header, &extra.filtered(true)))
    } else {
        keccak256(&header_rlp(header, header.extra_data.as_slice()))
    }
}

/// Digest the proposer seal signs.
pub fn proposer_digest(header: &Header, extra: &IstanbulExtra) -> H256 {
    keccak256(sig_hash(header, extra).as_bytes())
}

/// Digest every committed seal signs.
pub fn commit_digest(block_hash: &H256) -> H256 {
    let mut data = Vec::with_capacity(33);
    data.extend_from_slice(block_hash.as_bytes());
    data.push(MSG_COMMIT);
    keccak256(&data)
}
