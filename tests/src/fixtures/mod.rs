//! Shared fixtures for the integration flows.

pub mod chain;
pub mod node;

pub use chain::{address_of, signing_key, Chain, BLOCK_PERIOD, GENESIS_TIMESTAMP};
pub use node::{eventually, header_json, FakeNode, NODE_ENODE, SUBSCRIPTION_ID};
