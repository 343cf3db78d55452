//! Transport error taxonomy.
//!
//! Every variant is `Clone`: a single termination cause is handed to every
//! call that was still pending when the session ended.

use crate::codec::CodecError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Standard JSON-RPC 2.0 error codes
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Structured error object returned by the remote method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("remote error {code}: {message}")]
pub struct RemoteError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RemoteError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Errors surfaced by the session and the client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Dial or handshake failed; no session was created.
    #[error("cannot connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The connection failed mid-session.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The session was closed locally.
    #[error("session closed")]
    Closed,

    /// No response within the call's timeout.
    #[error("{method} timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The result does not have the shape the caller asked for.
    #[error("cannot decode result of {method}: {reason}")]
    Decode { method: String, reason: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Label used for the `outcome` dimension of call metrics.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            TransportError::Connect { .. } => "connect_error",
            TransportError::ConnectionLost(_) => "connection_lost",
            TransportError::Closed => "closed",
            TransportError::Timeout { .. } => "timeout",
            TransportError::Remote(_) => "remote_error",
            TransportError::Decode { .. } => "decode_error",
            TransportError::Codec(_) => "codec_error",
            TransportError::InvalidConfig(_) => "invalid_config",
        }
    }

    /// Whether the session that produced this error is no longer usable.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionLost(_) | TransportError::Closed
        )
    }
}
