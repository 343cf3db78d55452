//! Driven ports (Outbound dependencies)

use crate::domain::{MonitorResult, NodeInfo, PeerInfo, RecoveryError};
use async_trait::async_trait;
use shared_types::{Address, BlockNumber, Header, H256};
use std::time::Duration;

/// Queries against the monitored node.
///
/// A `null` result from the node maps to `Ok(None)`; callers decide whether
/// absence is an error.
#[async_trait]
pub trait NodeGateway: Send + Sync {
    /// `eth_getBlockByNumber(number, false)`
    async fn header_by_number(
        &self,
        number: BlockNumber,
        timeout: Duration,
    ) -> MonitorResult<Option<Header>>;

    /// `istanbul_getValidators(number)`, in the order the node returns them
    async fn validators(&self, at: BlockNumber, timeout: Duration) -> MonitorResult<Vec<Address>>;

    /// `admin_nodeInfo`
    async fn node_info(&self, timeout: Duration) -> MonitorResult<Option<NodeInfo>>;

    /// `admin_peers`
    async fn peers(&self, timeout: Duration) -> MonitorResult<Option<Vec<PeerInfo>>>;
}

/// Recovers the signer of a 65-byte `r ‖ s ‖ v` seal over a 32-byte digest.
pub trait SignerRecovery: Send + Sync {
    fn recover_signer(&self, digest: &H256, seal: &[u8]) -> Result<Address, RecoveryError>;
}
