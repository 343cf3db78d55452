//! # Shared Types Crate
//!
//! Chain value types used by every Signer-Watch crate.
//!
//! ## Design Principles
//!
//! - **Wire-faithful**: types deserialize directly from Ethereum JSON-RPC
//!   payloads (`0x`-prefixed hex quantities and byte strings).
//! - **Immutable values**: a [`Header`] is never mutated after it is fetched.
//! - **Canonical addresses**: [`to_checksum`] produces the EIP-55 form whose
//!   string order defines proposer succession.

pub mod encoding;
pub mod entities;
pub mod errors;

pub use encoding::{decode_hex, keccak256, parse_address, quantity, to_checksum, Bytes};
pub use entities::*;
pub use errors::*;
