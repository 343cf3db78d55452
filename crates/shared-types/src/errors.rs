//! # Error Types
//!
//! Parse errors for the textual forms of chain values.

use thiserror::Error;

/// Errors raised while parsing hex strings, quantities or block tags.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The string is not valid hexadecimal.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// The quantity does not fit into 64 bits.
    #[error("Quantity out of range: {0}")]
    QuantityOverflow(String),

    /// Unknown block tag.
    #[error("Invalid block tag: {0}")]
    InvalidBlockTag(String),
}
