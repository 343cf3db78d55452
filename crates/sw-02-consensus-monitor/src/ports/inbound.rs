//! Driving ports (Inbound API)

use crate::domain::{
    BlockReport, MonitorResult, SignerData, StatisticsSnapshot, ValidatorInfo,
};
use async_trait::async_trait;
use shared_types::{Address, BlockNumber, Header};
use std::sync::Arc;

/// API offered to presentation and persistence collaborators.
#[async_trait]
pub trait MonitorApi: Send + Sync {
    /// Header by number; `Latest` always goes to the node.
    async fn header_by_number(&self, number: BlockNumber) -> MonitorResult<Arc<Header>>;

    /// Proposer and endorsers of a header, without touching statistics.
    fn extract_signers(&self, header: &Header) -> MonitorResult<(Address, Vec<Address>)>;

    /// Count a header. Headers at or below the watermark are not counted
    /// again; their signers are still returned.
    async fn update_statistics(&self, header: &Header) -> MonitorResult<(Address, Vec<Address>)>;

    /// Reset the counters and replay the last `window` blocks.
    async fn initialize_statistics(&self, window: u64) -> MonitorResult<()>;

    /// Round-robin successor of `current`.
    fn next_proposer(&self, current: &Address) -> MonitorResult<Address>;

    async fn snapshot(&self) -> StatisticsSnapshot;

    /// Active validators in canonical order.
    fn validators(&self) -> &[Address];

    fn validator_info(&self, address: &Address) -> Option<&ValidatorInfo>;

    async fn signer_data_for_block(&self, number: BlockNumber) -> MonitorResult<SignerData>;

    async fn report_for_header(
        &self,
        header: &Header,
        previous_timestamp: u64,
    ) -> MonitorResult<BlockReport>;
}
