//! # RPC Transport Subsystem
//!
//! JSON-RPC 2.0 over a persistent WebSocket connection.
//!
//! ## Components
//!
//! - [`codec`]: request, response and notification frames
//! - [`Session`]: owns the connection, one receive loop, correlated calls,
//!   subscriptions and shutdown
//! - [`RpcClient`]: typed call/subscribe façade with per-call timeouts
//!
//! ## Guarantees
//!
//! - Responses reach the call with the matching id, whatever their order.
//! - A timed-out call is removed from the table; its late response is dropped
//!   and its id is never reused.
//! - A slow subscriber never stalls the receive loop: each subscription has a
//!   bounded buffer that overwrites its oldest event.
//! - `close()` returns only after the receive loop has exited and every
//!   pending call has been resolved.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = RpcClient::connect(&TransportConfig::for_url("ws://127.0.0.1:22001")).await?;
//! let head: Option<Header> = client.call("eth_getBlockByNumber", vec!["latest".into(), false.into()]).await?;
//! let mut heads = client.subscribe("newHeads").await?;
//! while let Some(event) = heads.recv().await { /* ... */ }
//! client.close().await;
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod result;
pub mod session;
pub mod subscription;

pub use client::{RpcClient, SUBSCRIBE_METHOD};
pub use codec::{CodecError, Frame};
pub use config::{TransportConfig, DEFAULT_CALL_TIMEOUT};
pub use error::{RemoteError, TransportError};
pub use result::{ResultKind, RpcResult};
pub use session::Session;
pub use subscription::{Subscription, SubscriptionId};
