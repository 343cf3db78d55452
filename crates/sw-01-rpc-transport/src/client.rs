//! RPC client façade.
//!
//! Stateless apart from the shared session and the default timeout. Results
//! are decoded into the caller's type; a shape mismatch, including a `null`
//! result for a non-optional type, is a `Decode` error.

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::result::{ResultKind, RpcResult};
use crate::session::Session;
use crate::subscription::Subscription;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Method used to create subscriptions.
pub const SUBSCRIBE_METHOD: &str = "eth_subscribe";

/// Call and subscribe façade over a shared [`Session`].
#[derive(Clone)]
pub struct RpcClient {
    session: Arc<Session>,
    default_timeout: Duration,
}

impl RpcClient {
    /// Open a session to `config.url`.
    pub async fn connect(config: &TransportConfig) -> Result<Self, TransportError> {
        let session = Session::open(config).await?;
        Ok(Self::from_session(Arc::new(session), config.default_timeout))
    }

    pub fn from_session(session: Arc<Session>, default_timeout: Duration) -> Self {
        Self {
            session,
            default_timeout,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Call with the default timeout.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        self.call_with_timeout(method, params, self.default_timeout)
            .await
    }

    /// Call with an explicit timeout.
    pub async fn call_with_timeout<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<T, TransportError> {
        let value = self
            .session
            .call(method, params, ResultKind::Structured, timeout)
            .await
            .and_then(|result| expect_kind(method, ResultKind::Structured, result))?
            .into_structured()
            .unwrap_or_default();

        serde_json::from_value(value).map_err(|e| TransportError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }

    /// Call and return the exact JSON text of the result.
    pub async fn call_raw(
        &self,
        method: &str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let result = self
            .session
            .call(method, params, ResultKind::Raw, timeout)
            .await
            .and_then(|result| expect_kind(method, ResultKind::Raw, result))?;
        Ok(result.into_raw().unwrap_or_default())
    }

    /// Subscribe to a node event stream (`newHeads`, ...).
    pub async fn subscribe(&self, event: &str) -> Result<Subscription, TransportError> {
        self.session
            .subscribe(
                SUBSCRIBE_METHOD,
                vec![Value::String(event.to_string())],
                self.default_timeout,
            )
            .await
    }

    /// Close the underlying session. Idempotent.
    pub async fn close(&self) {
        self.session.close().await;
    }
}

/// The session returns the kind it was asked for; anything else is a decode error.
fn expect_kind(
    method: &str,
    expected: ResultKind,
    result: RpcResult,
) -> Result<RpcResult, TransportError> {
    if result.kind() == expected {
        Ok(result)
    } else {
        Err(TransportError::Decode {
            method: method.to_string(),
            reason: format!("expected a {:?} result, got {:?}", expected, result.kind()),
        })
    }
}
