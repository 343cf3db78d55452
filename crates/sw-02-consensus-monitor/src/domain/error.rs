//! Error types for the consensus monitor

use shared_types::{Address, BlockNumber};
use sw_01_rpc_transport::TransportError;

/// Failures while decoding consensus extra-data or recovering a signer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    #[error("extra-data too short: {len} bytes, need at least {min}")]
    ExtraDataTooShort { len: usize, min: usize },

    #[error("malformed Istanbul extra-data: {0}")]
    MalformedExtra(String),

    #[error("invalid seal length: {0} bytes, expected 65")]
    InvalidSealLength(usize),

    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("public key recovery failed")]
    RecoveryFailed,
}

/// Consensus monitor error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MonitorError {
    #[error("fetch failed: {0}")]
    Transport(#[from] TransportError),

    #[error("block {0} not found")]
    BlockNotFound(BlockNumber),

    #[error("{0} not available")]
    NotFound(String),

    #[error("signer recovery failed: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("proposer {0:?} is not in the active validator set")]
    UnknownProposer(Address),

    #[error("validator set is empty")]
    EmptyValidatorSet,

    #[error("invalid validator registry: {0}")]
    Registry(String),

    #[error("invalid monitor configuration: {0}")]
    InvalidConfig(String),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
