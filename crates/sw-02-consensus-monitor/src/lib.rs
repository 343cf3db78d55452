//! # sw-02-consensus-monitor
//!
//! Block production monitor for Istanbul BFT networks.
//!
//! ## Architecture
//!
//! ```text
//! newHeads / polling ──→ ConsensusMonitor ──→ NodeGateway (RpcNodeGateway)
//!                              │
//!                              ├──→ HeaderCache (LRU, own lock)
//!                              ├──→ SignerRecovery (Secp256k1Recovery)
//!                              └──→ Statistics (RwLock: counters + watermark)
//! ```
//!
//! For every header the monitor decodes the Istanbul extra-data, recovers
//! the proposer from the seal and the endorsers from the committed seals,
//! and counts them once. The watermark makes re-submission of a block
//! harmless, so a subscription loop and a polling loop may feed the same
//! monitor.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sw_02_consensus_monitor::{
//!     ConsensusMonitor, MonitorConfig, MonitorDependencies, RpcNodeGateway, Secp256k1Recovery,
//!     ValidatorRegistry,
//! };
//!
//! let monitor = ConsensusMonitor::new(MonitorDependencies {
//!     gateway: Arc::new(RpcNodeGateway::new(client)),
//!     recovery: Arc::new(Secp256k1Recovery),
//!     registry: ValidatorRegistry::redt()?,
//!     config: MonitorConfig::default(),
//! })
//! .await?;
//!
//! monitor.initialize_statistics(100).await?;
//! let report = monitor.report_for_header(&header, previous_timestamp).await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{RpcNodeGateway, Secp256k1Recovery};
pub use domain::{
    BlockReport, HeaderCache, IstanbulExtra, MonitorConfig, MonitorError, MonitorResult,
    NodeInfo, PeerInfo, RecoveryError, SignerData, StatisticsSnapshot, ValidatorInfo,
    ValidatorRegistry, ValidatorRow, ValidatorSet,
};
pub use ports::{MonitorApi, NodeGateway, SignerRecovery};
pub use service::{ConsensusMonitor, MonitorDependencies};
