//! secp256k1 signer recovery backed by `k256`.

use crate::domain::{RecoveryError, SEAL_LEN};
use crate::ports::SignerRecovery;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use shared_types::{keccak256, Address, H256};

/// Recovers Ethereum addresses from 65-byte `r ‖ s ‖ v` seals.
///
/// `v` may be 0/1 or the legacy 27/28. High-`s` seals are accepted, as the
/// node accepts them.
#[derive(Debug, Default, Clone, Copy)]
pub struct Secp256k1Recovery;

impl Secp256k1Recovery {
    pub fn new() -> Self {
        Self
    }
}

impl SignerRecovery for Secp256k1Recovery {
    fn recover_signer(&self, digest: &H256, seal: &[u8]) -> Result<Address, RecoveryError> {
        if seal.len() != SEAL_LEN {
            return Err(RecoveryError::InvalidSealLength(seal.len()));
        }

        let v = seal[64];
        let recovery_id = parse_recovery_id(v)?;
        let signature =
            Signature::from_slice(&seal[..64]).map_err(|_| RecoveryError::InvalidSignature)?;

        // k256 only recovers low-s signatures; (r, n - s) with the opposite
        // y parity recovers the same key.
        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        };

        let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &signature, recovery_id)
            .map_err(|_| RecoveryError::RecoveryFailed)?;
        Ok(address_from_key(&key))
    }
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, RecoveryError> {
    let normalized = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return Err(RecoveryError::InvalidRecoveryId(v)),
    };
    RecoveryId::from_byte(normalized).ok_or(RecoveryError::InvalidRecoveryId(v))
}

/// Address of an uncompressed public key: last 20 bytes of keccak256(x ‖ y).
pub fn address_from_key(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
