//! Adapters layer (Hexagonal Architecture)
//!
//! - rpc: node gateway over the JSON-RPC client
//! - recovery: secp256k1 signer recovery

mod recovery;
mod rpc;

pub use recovery::*;
pub use rpc::*;
