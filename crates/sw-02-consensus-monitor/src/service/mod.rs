//! Consensus Monitor - Core business logic
//!
//! # Locking
//! - Statistics (counters + watermark) sit behind one async `RwLock`:
//!   updates and initialization take it exclusively, snapshots share it.
//! - The header cache is synchronized on its own, so concurrent header
//!   lookups never wait on the statistics lock.
//! - Signers are recovered before the statistics lock is taken; a recovery
//!   failure leaves the counters untouched.

use crate::domain::{
    block_hash, commit_digest, proposer_digest, BlockReport, HeaderCache, IstanbulExtra,
    MonitorConfig, MonitorError, MonitorResult, NodeInfo, PeerInfo, SignerData, Statistics,
    StatisticsSnapshot, ValidatorInfo, ValidatorRegistry, ValidatorRow, ValidatorSet,
};
use crate::ports::{MonitorApi, NodeGateway, SignerRecovery};
use async_trait::async_trait;
use shared_types::{Address, BlockNumber, Header, H256};
use std::collections::HashSet;
use std::sync::Arc;
use sw_telemetry::{
    log_block_event, BLOCKS_PROCESSED, HEADER_CACHE_LOOKUPS, LAST_PROCESSED_BLOCK,
    SIGNER_RECOVERY_FAILURES,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const COMPONENT: &str = "monitor";

/// Dependencies for ConsensusMonitor
pub struct MonitorDependencies<G, R> {
    pub gateway: Arc<G>,
    pub recovery: Arc<R>,
    pub registry: ValidatorRegistry,
    pub config: MonitorConfig,
}

/// Signers of one header.
struct Seals {
    proposer: Address,
    endorsers: Vec<Address>,
    block_hash: H256,
}

/// Consensus Monitor
///
/// Tracks who proposes and who endorses each block of an Istanbul BFT
/// network. The validator set is fixed for the lifetime of the instance;
/// build a new one to pick up membership changes.
pub struct ConsensusMonitor<G, R>
where
    G: NodeGateway,
    R: SignerRecovery,
{
    gateway: Arc<G>,
    recovery: Arc<R>,
    validators: ValidatorSet,
    registry: ValidatorRegistry,
    cache: HeaderCache,
    stats: RwLock<Statistics>,
    config: MonitorConfig,
}

impl<G, R> ConsensusMonitor<G, R>
where
    G: NodeGateway,
    R: SignerRecovery,
{
    /// Create a monitor, loading the active validator set from the node.
    pub async fn new(deps: MonitorDependencies<G, R>) -> MonitorResult<Self> {
        deps.config.validate()?;
        let addresses = deps
            .gateway
            .validators(BlockNumber::Latest, deps.config.fetch_timeout)
            .await?;
        let validators = ValidatorSet::new(addresses);
        if validators.is_empty() {
            return Err(MonitorError::EmptyValidatorSet);
        }

        info!(
            validators = validators.len(),
            known_operators = deps.registry.len(),
            "Validator set loaded"
        );
        Self::with_validator_set(deps, validators)
    }

    /// Create a monitor for an already known validator set.
    pub fn with_validator_set(
        deps: MonitorDependencies<G, R>,
        validators: ValidatorSet,
    ) -> MonitorResult<Self> {
        deps.config.validate()?;
        for address in validators.members() {
            if deps.registry.get(address).is_none() {
                warn!(validator = ?address, "Active validator has no registry entry");
            }
        }

        Ok(Self {
            gateway: deps.gateway,
            recovery: deps.recovery,
            stats: RwLock::new(Statistics::seeded(&validators)),
            cache: HeaderCache::new(deps.config.cache_capacity),
            validators,
            registry: deps.registry,
            config: deps.config,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validators
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    // === HEADERS ===

    /// Header by number, through the cache.
    ///
    /// `Latest` is never served from the cache, but its result is cached
    /// under its concrete number.
    pub async fn header_by_number(&self, number: BlockNumber) -> MonitorResult<Arc<Header>> {
        match number {
            BlockNumber::Latest => {
                HEADER_CACHE_LOOKUPS.with_label_values(&["bypass"]).inc();
            }
            BlockNumber::Number(n) => {
                if let Some(header) = self.cache.get(n) {
                    HEADER_CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                    return Ok(header);
                }
                HEADER_CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
            }
        }

        let header = self
            .gateway
            .header_by_number(number, self.config.fetch_timeout)
            .await?
            .ok_or(MonitorError::BlockNotFound(number))?;
        let header = Arc::new(header);
        self.cache.put(header.number, Arc::clone(&header));
        Ok(header)
    }

    /// Number of the latest block.
    pub async fn current_block_number(&self) -> MonitorResult<u64> {
        Ok(self.header_by_number(BlockNumber::Latest).await?.number)
    }

    // === SIGNERS ===

    fn seals(&self, header: &Header) -> MonitorResult<Seals> {
        let result = self.recover_seals(header);
        if let Err(e) = &result {
            SIGNER_RECOVERY_FAILURES.inc();
            warn!(component = COMPONENT, block = header.number, error = %e, "Signer recovery failed");
        }
        result
    }

    fn recover_seals(&self, header: &Header) -> MonitorResult<Seals> {
        let extra = IstanbulExtra::decode(header.extra_data.as_slice())?;

        let proposer = self
            .recovery
            .recover_signer(&proposer_digest(header, &extra), &extra.seal)?;

        let hash = block_hash(header, &extra);
        if let Some(reported) = header.hash {
            if reported != hash {
                warn!(
                    component = COMPONENT,
                    block = header.number,
                    reported = %format!("{:#x}", reported),
                    computed = %format!("{:#x}", hash),
                    "Computed block hash differs from the node's"
                );
            }
        }

        let commit = commit_digest(&hash);
        let endorsers = extra
            .committed_seals
            .iter()
            .map(|seal| self.recovery.recover_signer(&commit, seal))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Seals {
            proposer,
            endorsers,
            block_hash: hash,
        })
    }

    /// Proposer and endorsers of `header`.
    pub fn extract_signers(&self, header: &Header) -> MonitorResult<(Address, Vec<Address>)> {
        let seals = self.seals(header)?;
        Ok((seals.proposer, seals.endorsers))
    }

    /// Signers of a block by number, without counting it.
    pub async fn signer_data_for_block(&self, number: BlockNumber) -> MonitorResult<SignerData> {
        let header = self.header_by_number(number).await?;
        let seals = self.seals(&header)?;
        Ok(SignerData {
            number: header.number,
            hash: seals.block_hash,
            timestamp: header.timestamp,
            proposer: seals.proposer,
            endorsers: seals.endorsers,
        })
    }

    // === STATISTICS ===

    /// Count `header` once. Re-submitting a counted or older block returns
    /// its signers and changes nothing.
    pub async fn update_statistics(
        &self,
        header: &Header,
    ) -> MonitorResult<(Address, Vec<Address>)> {
        let seals = self.seals(header)?;

        let mut stats = self.stats.write().await;
        if stats.apply(header.number, seals.proposer, &seals.endorsers) {
            BLOCKS_PROCESSED.inc();
            LAST_PROCESSED_BLOCK.set(header.number as f64);
            log_block_event!(
                debug,
                COMPONENT,
                "Block counted",
                header.number,
                format!("{:#x}", seals.block_hash),
                proposer = ?seals.proposer,
                endorsers = seals.endorsers.len()
            );
        } else {
            debug!(
                component = COMPONENT,
                block = header.number,
                last_processed = stats.last_processed,
                "Block already counted"
            );
        }

        Ok((seals.proposer, seals.endorsers))
    }

    /// Reset the counters and replay the last `window` blocks up to the head.
    ///
    /// The statistics lock is held for the whole replay, so live updates
    /// wait and then see the new watermark. Nothing is committed unless
    /// every block in the window was processed.
    pub async fn initialize_statistics(&self, window: u64) -> MonitorResult<()> {
        let mut stats = self.stats.write().await;

        let mut fresh = Statistics::seeded(&self.validators);
        if window == 0 {
            fresh.last_processed = stats.last_processed;
            *stats = fresh;
            info!(component = COMPONENT, "Statistics reset");
            return Ok(());
        }

        let head = self.header_by_number(BlockNumber::Latest).await?;
        let start = head.number.saturating_sub(window).max(1);

        for number in start..=head.number {
            let header = if number == head.number {
                Arc::clone(&head)
            } else {
                self.header_by_number(BlockNumber::Number(number)).await?
            };
            let seals = self.seals(&header)?;
            fresh.apply(header.number, seals.proposer, &seals.endorsers);
        }
        fresh.last_processed = head.number;

        *stats = fresh;
        BLOCKS_PROCESSED.inc_by((head.number + 1).saturating_sub(start) as f64);
        LAST_PROCESSED_BLOCK.set(head.number as f64);
        info!(
            component = COMPONENT,
            from = start,
            to = head.number,
            "Statistics initialized"
        );
        Ok(())
    }

    /// Consistent copy of the counters and watermark.
    pub async fn snapshot(&self) -> StatisticsSnapshot {
        self.stats.read().await.snapshot()
    }

    // === VALIDATORS ===

    /// Round-robin successor of `current` in the canonical order.
    pub fn next_proposer(&self, current: &Address) -> MonitorResult<Address> {
        self.validators.next_after(current)
    }

    pub fn validators(&self) -> &[Address] {
        self.validators.members()
    }

    pub fn validator_info(&self, address: &Address) -> Option<&ValidatorInfo> {
        self.registry.get(address)
    }

    // === NODE ===

    pub async fn node_info(&self) -> MonitorResult<NodeInfo> {
        self.gateway
            .node_info(self.config.fetch_timeout)
            .await?
            .ok_or_else(|| MonitorError::NotFound("node info".into()))
    }

    pub async fn peers(&self) -> MonitorResult<Vec<PeerInfo>> {
        self.gateway
            .peers(self.config.fetch_timeout)
            .await?
            .ok_or_else(|| MonitorError::NotFound("peer list".into()))
    }

    // === REPORTS ===

    /// Count `header` and describe it for presentation.
    ///
    /// `previous_timestamp` is the timestamp of the last block the caller
    /// showed; it only feeds `elapsed`.
    pub async fn report_for_header(
        &self,
        header: &Header,
        previous_timestamp: u64,
    ) -> MonitorResult<BlockReport> {
        let (proposer, endorsers) = self.update_statistics(header).await?;

        let next_proposer = match self.next_proposer(&proposer) {
            Ok(next) => Some(next),
            Err(e) => {
                info!(component = COMPONENT, block = header.number, reason = %e, "No next proposer");
                None
            }
        };

        let signed: HashSet<&Address> = endorsers.iter().collect();
        let stats = self.stats.read().await;
        let rows = self
            .validators
            .members()
            .iter()
            .map(|address| ValidatorRow {
                address: *address,
                operator: self.registry.operator(address).map(str::to_owned),
                proposals: stats.counters.proposals_of(address),
                endorsements: stats.counters.endorsements_of(address),
                is_proposer: *address == proposer,
                is_endorser: signed.contains(address),
            })
            .collect();

        Ok(BlockReport {
            number: header.number,
            timestamp: header.timestamp,
            elapsed: header.timestamp.saturating_sub(previous_timestamp),
            proposer,
            operator: self.registry.operator(&proposer).map(str::to_owned),
            proposer_count: stats.counters.proposals_of(&proposer),
            next_operator: next_proposer
                .as_ref()
                .and_then(|next| self.registry.operator(next))
                .map(str::to_owned),
            next_proposer,
            endorsers,
            gas_limit: header.gas_limit,
            gas_used: header.gas_used,
            validators: rows,
        })
    }
}

#[async_trait]
impl<G, R> MonitorApi for ConsensusMonitor<G, R>
where
    G: NodeGateway,
    R: SignerRecovery,
{
    async fn header_by_number(&self, number: BlockNumber) -> MonitorResult<Arc<Header>> {
        ConsensusMonitor::header_by_number(self, number).await
    }

    fn extract_signers(&self, header: &Header) -> MonitorResult<(Address, Vec<Address>)> {
        ConsensusMonitor::extract_signers(self, header)
    }

    async fn update_statistics(&self, header: &Header) -> MonitorResult<(Address, Vec<Address>)> {
        ConsensusMonitor::update_statistics(self, header).await
    }

    async fn initialize_statistics(&self, window: u64) -> MonitorResult<()> {
        ConsensusMonitor::initialize_statistics(self, window).await
    }

    fn next_proposer(&self, current: &Address) -> MonitorResult<Address> {
        ConsensusMonitor::next_proposer(self, current)
    }

    async fn snapshot(&self) -> StatisticsSnapshot {
        ConsensusMonitor::snapshot(self).await
    }

    fn validators(&self) -> &[Address] {
        ConsensusMonitor::validators(self)
    }

    fn validator_info(&self, address: &Address) -> Option<&ValidatorInfo> {
        ConsensusMonitor::validator_info(self, address)
    }

    async fn signer_data_for_block(&self, number: BlockNumber) -> MonitorResult<SignerData> {
        ConsensusMonitor::signer_data_for_block(self, number).await
    }

    async fn report_for_header(
        &self,
        header: &Header,
        previous_timestamp: u64,
    ) -> MonitorResult<BlockReport> {
        ConsensusMonitor::report_for_header(self, header, previous_timestamp).await
    }
}
