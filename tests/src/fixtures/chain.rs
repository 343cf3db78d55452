//! Istanbul chains sealed with real secp256k1 keys.

use k256::ecdsa::SigningKey;
use shared_types::{Address, Bytes, Header, H256};
use sw_02_consensus_monitor::adapters::address_from_key;
use sw_02_consensus_monitor::domain::{
    block_hash, commit_digest, proposer_digest, IstanbulExtra, ISTANBUL_DIGEST, VANITY_LEN,
};
use sw_02_consensus_monitor::{ValidatorInfo, ValidatorRegistry, ValidatorSet};

pub const GENESIS_TIMESTAMP: u64 = 1_600_000_000;
pub const BLOCK_PERIOD: u64 = 5;
pub const GAS_LIMIT: u64 = 0x1fff_ffff_ffff;

/// Private key `n` (big-endian, left padded).
pub fn signing_key(n: u8) -> SigningKey {
    let mut bytes = [0u8; 32];
    bytes[31] = n;
    SigningKey::from_slice(&bytes).expect("non-zero scalar")
}

pub fn address_of(key: &SigningKey) -> Address {
    address_from_key(key.verifying_key())
}

fn sign(key: &SigningKey, digest: &H256) -> Vec<u8> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(digest.as_bytes())
        .expect("32-byte prehash");
    let mut seal = signature.to_bytes().to_vec();
    seal.push(recovery_id.to_byte());
    seal
}

/// A validator set and the chain it sealed.
///
/// Block `n` is proposed by the validator at position `n % len` of the
/// canonical order and committed by every validator.
pub struct Chain {
    keys: Vec<SigningKey>,
    headers: Vec<Header>,
}

impl Chain {
    /// `validators` keys, blocks `1..=blocks`.
    pub fn new(validators: u8, blocks: u64) -> Self {
        let keys: Vec<SigningKey> = (1..=validators).map(signing_key).collect();
        let set = ValidatorSet::new(keys.iter().map(address_of));
        let mut keys_in_order = Vec::with_capacity(keys.len());
        for address in set.members() {
            if let Some(key) = keys.iter().find(|k| address_of(k) == *address) {
                keys_in_order.push(key.clone());
            }
        }

        let mut chain = Self {
            keys: keys_in_order,
            headers: Vec::new(),
        };
        for _ in 0..blocks {
            chain.mine();
        }
        chain
    }

    /// Canonical validator order.
    pub fn validators(&self) -> Vec<Address> {
        self.keys.iter().map(address_of).collect()
    }

    pub fn proposer_of(&self, number: u64) -> Address {
        address_of(&self.keys[(number % self.keys.len() as u64) as usize])
    }

    pub fn head(&self) -> &Header {
        self.headers.last().expect("chain has blocks")
    }

    pub fn header(&self, number: u64) -> Option<&Header> {
        self.headers.iter().find(|h| h.number == number)
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Seal the next block and return it.
    pub fn mine(&mut self) -> Header {
        let number = self.headers.last().map_or(1, |h| h.number + 1);
        let parent_hash = self
            .headers
            .last()
            .and_then(|h| h.hash)
            .unwrap_or_default();
        let proposer = &self.keys[(number % self.keys.len() as u64) as usize];

        let mut extra = IstanbulExtra {
            vanity: [0u8; VANITY_LEN],
            validators: self.validators(),
            seal: Vec::new(),
            committed_seals: Vec::new(),
        };
        let mut header = Header {
            parent_hash,
            coinbase: address_of(proposer),
            number,
            gas_limit: GAS_LIMIT,
            gas_used: 21_000 * number,
            timestamp: GENESIS_TIMESTAMP + number * BLOCK_PERIOD,
            mix_digest: ISTANBUL_DIGEST,
            extra_data: Bytes(extra.encode()),
            ..Header::default()
        };

        extra.seal = sign(proposer, &proposer_digest(&header, &extra));
        let hash = block_hash(&header, &extra);
        let commit = commit_digest(&hash);
        extra.committed_seals = self.keys.iter().map(|k| sign(k, &commit)).collect();
        header.extra_data = Bytes(extra.encode());
        header.hash = Some(hash);

        self.headers.push(header.clone());
        header
    }

    /// Registry naming validator `i` (canonical order) `Operator-i`.
    pub fn registry(&self) -> ValidatorRegistry {
        let mut registry = ValidatorRegistry::new();
        for (i, address) in self.validators().into_iter().enumerate() {
            registry.insert(ValidatorInfo::new(address, format!("Operator-{}", i)));
        }
        registry
    }
}
