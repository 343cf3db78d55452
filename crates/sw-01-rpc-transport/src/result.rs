//! Tagged call results.

use serde_json::Value;

/// Which result form the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Parsed JSON value.
    Structured,
    /// Exact JSON text of `result`, unparsed.
    Raw,
}

/// Outcome of a successful call, in the form the caller selected.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResult {
    Structured(Value),
    Raw(Vec<u8>),
}

impl RpcResult {
    pub fn kind(&self) -> ResultKind {
        match self {
            RpcResult::Structured(_) => ResultKind::Structured,
            RpcResult::Raw(_) => ResultKind::Raw,
        }
    }

    pub fn into_structured(self) -> Option<Value> {
        match self {
            RpcResult::Structured(value) => Some(value),
            RpcResult::Raw(_) => None,
        }
    }

    pub fn into_raw(self) -> Option<Vec<u8>> {
        match self {
            RpcResult::Raw(bytes) => Some(bytes),
            RpcResult::Structured(_) => None,
        }
    }
}
