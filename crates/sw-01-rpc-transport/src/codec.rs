//! JSON-RPC 2.0 wire codec.
//!
//! One text message carries one frame. Incoming frames are classified as:
//!
//! - **Response**: has an `id` and no `method`. A missing `result` without an
//!   `error` is a `null` result.
//! - **Notification**: has a `method`, no `id`, and
//!   `params.subscription` (or `params.subscriptionId`).
//! - **Request**: has both `method` and `id`. Only test peers decode these.

use crate::error::RemoteError;
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{json, Value};
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// Method used for subscription notifications by Ethereum nodes.
pub const SUBSCRIPTION_METHOD: &str = "eth_subscription";

/// Decoding failures. The receive loop logs and skips these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed JSON frame: {0}")]
    Malformed(String),

    #[error("unsupported request id: {0}")]
    UnsupportedId(String),

    #[error("notification without subscription id")]
    MissingSubscription,

    #[error("error frame without id: {0}")]
    Uncorrelated(String),

    #[error("unrecognized frame")]
    Unrecognized,
}

/// A decoded frame.
#[derive(Debug, Clone)]
pub enum Frame {
    Request {
        id: u64,
        method: String,
        params: Vec<Value>,
    },
    Response {
        id: u64,
        /// The exact JSON text of `result`, or the remote error.
        outcome: Result<Box<RawValue>, RemoteError>,
    },
    Notification {
        subscription: String,
        payload: Value,
    },
}

#[derive(Deserialize)]
struct WireFrame {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Box<RawValue>>,
    #[serde(default)]
    error: Option<RemoteError>,
}

/// Encode a request frame.
pub fn encode_request(id: u64, method: &str, params: &[Value]) -> String {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "method": method,
        "params": params,
    })
    .to_string()
}

/// Encode a successful response frame.
pub fn encode_response(id: u64, result: &Value) -> String {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
    .to_string()
}

/// Encode an error response frame.
pub fn encode_error(id: u64, error: &RemoteError) -> String {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": error,
    })
    .to_string()
}

/// Encode a subscription notification frame.
pub fn encode_notification(subscription: &str, payload: &Value) -> String {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": SUBSCRIPTION_METHOD,
        "params": {
            "subscription": subscription,
            "result": payload,
        },
    })
    .to_string()
}

/// Normalise a subscription id to its map key.
///
/// Nodes return hex strings; numeric ids are accepted as well.
pub fn subscription_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode one incoming frame.
pub fn decode(text: &str) -> Result<Frame, CodecError> {
    let wire: WireFrame =
        serde_json::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))?;

    match (wire.method, wire.id) {
        (Some(method), Some(id)) => Ok(Frame::Request {
            id: request_id(&id)?,
            method,
            params: match wire.params {
                Some(Value::Array(params)) => params,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => vec![other],
            },
        }),
        (Some(_), None) => {
            let mut params = match wire.params {
                Some(Value::Object(params)) => params,
                _ => return Err(CodecError::MissingSubscription),
            };
            let subscription = params
                .get("subscription")
                .or_else(|| params.get("subscriptionId"))
                .and_then(subscription_key)
                .ok_or(CodecError::MissingSubscription)?;
            let payload = params.remove("result").unwrap_or(Value::Null);
            Ok(Frame::Notification {
                subscription,
                payload,
            })
        }
        (None, Some(id)) => {
            let id = request_id(&id)?;
            let outcome = match (wire.error, wire.result) {
                (Some(error), _) => Err(error),
                (None, Some(result)) => Ok(result),
                (None, None) => Ok(null_result()?),
            };
            Ok(Frame::Response { id, outcome })
        }
        (None, None) => match wire.error {
            Some(error) => Err(CodecError::Uncorrelated(error.message)),
            None => Err(CodecError::Unrecognized),
        },
    }
}

fn request_id(value: &Value) -> Result<u64, CodecError> {
    value
        .as_u64()
        .ok_or_else(|| CodecError::UnsupportedId(value.to_string()))
}

fn null_result() -> Result<Box<RawValue>, CodecError> {
    RawValue::from_string("null".to_string()).map_err(|e| CodecError::Malformed(e.to_string()))
}
