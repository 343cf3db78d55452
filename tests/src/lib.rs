//! # Signer-Watch Test Suite
//!
//! End-to-end tests that drive the real transport, monitor and runtime
//! against a scripted node over an in-memory WebSocket.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── lib.rs
//! │   ├── fixtures/
//! │   │   ├── chain.rs         # Istanbul chains sealed with real keys
//! │   │   └── node.rs          # FakeNode: JSON-RPC over a duplex stream
//! │   └── integration/
//! │       ├── transport_flows.rs
//! │       ├── monitor_flows.rs
//! │       └── runtime_flows.rs
//! ```
//!
//! ## Running
//!
//! ```bash
//! cargo test -p sw-tests
//! cargo test -p sw-tests runtime_flows
//! ```

pub mod fixtures;
pub mod integration;
