//! Domain layer for the consensus monitor
//!
//! - cache: LRU header cache
//! - istanbul: extra-data decoding and seal digests
//! - validator: canonical validator set and operator registry
//! - statistics: counters, watermark and report types
//! - node: admin API result types

mod cache;
mod config;
mod error;
mod istanbul;
mod node;
mod statistics;
mod validator;

pub use cache::*;
pub use config::*;
pub use error::*;
pub use istanbul::*;
pub use node::*;
pub use statistics::*;
pub use validator::*;
