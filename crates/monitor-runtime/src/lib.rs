//! # Signer-Watch Monitor Runtime
//!
//! Wires the RPC transport and the consensus monitor to a live node.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (environment)
//! 2. Connect the WebSocket session
//! 3. Load the validator set and the operator registry
//! 4. Replay the last `stats_window` blocks into the statistics
//! 5. Follow new blocks (subscription or polling) until shutdown
//!
//! Each processed block produces a [`BlockReport`], logged and published to
//! report subscribers.

pub mod config;

pub use config::{ConfigError, FollowMode, RuntimeConfig, DEFAULT_NODE_URL};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shared_types::{quantity, BlockNumber, Header};
use std::sync::Arc;
use sw_01_rpc_transport::RpcClient;
use sw_02_consensus_monitor::{
    BlockReport, ConsensusMonitor, MonitorDependencies, MonitorError, RpcNodeGateway,
    Secp256k1Recovery, ValidatorRegistry,
};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

/// Event name for new chain heads.
pub const NEW_HEADS: &str = "newHeads";

const REPORT_BUFFER: usize = 64;

/// Monitor over a live JSON-RPC session.
pub type LiveMonitor = ConsensusMonitor<RpcNodeGateway, Secp256k1Recovery>;

#[derive(Deserialize)]
struct HeadEvent {
    #[serde(with = "quantity")]
    number: u64,
}

/// The running monitor.
pub struct MonitorRuntime {
    client: RpcClient,
    monitor: Arc<LiveMonitor>,
    config: RuntimeConfig,
    reports: broadcast::Sender<BlockReport>,
    shutdown_tx: watch::Sender<bool>,
}

impl MonitorRuntime {
    /// Connect to the configured node and load the validator set.
    pub async fn connect(config: RuntimeConfig) -> Result<Self> {
        let registry = load_registry(&config)?;
        let client = RpcClient::connect(&config.transport)
            .await
            .with_context(|| format!("Failed to connect to {}", config.transport.url))?;
        info!(url = %config.transport.url, "Connected to node");
        Self::with_client(client, registry, config).await
    }

    /// Build on an existing client.
    pub async fn with_client(
        client: RpcClient,
        registry: ValidatorRegistry,
        config: RuntimeConfig,
    ) -> Result<Self> {
        let monitor = ConsensusMonitor::new(MonitorDependencies {
            gateway: Arc::new(RpcNodeGateway::new(client.clone())),
            recovery: Arc::new(Secp256k1Recovery),
            registry,
            config: config.monitor.clone(),
        })
        .await
        .context("Failed to load the validator set")?;

        let (reports, _) = broadcast::channel(REPORT_BUFFER);
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            client,
            monitor: Arc::new(monitor),
            config,
            reports,
            shutdown_tx,
        })
    }

    pub fn monitor(&self) -> &Arc<LiveMonitor> {
        &self.monitor
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Receive every report produced from now on.
    pub fn subscribe_reports(&self) -> broadcast::Receiver<BlockReport> {
        self.reports.subscribe()
    }

    /// Initialize statistics and follow the chain until [`shutdown`](Self::shutdown).
    pub async fn run(&self) -> Result<()> {
        let shutdown = self.shutdown_tx.subscribe();

        self.log_node_info().await;

        self.monitor
            .initialize_statistics(self.config.stats_window)
            .await
            .context("Failed to initialize statistics")?;

        match self.config.mode {
            FollowMode::Subscribe => self.follow_subscription(shutdown).await,
            FollowMode::Poll => self.follow_polling(shutdown).await,
        }
    }

    /// Ask [`run`](Self::run) to return.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Close the session. Idempotent.
    pub async fn close(&self) {
        self.shutdown();
        self.client.close().await;
        info!("Session closed");
    }

    async fn log_node_info(&self) {
        match self.monitor.node_info().await {
            Ok(node) => info!(name = %node.name, enode = %node.enode, "Node info"),
            // admin_* is often disabled on public endpoints.
            Err(e) => warn!(error = %e, "Node info unavailable"),
        }
        match self.monitor.peers().await {
            Ok(peers) => info!(peers = peers.len(), "Peers connected"),
            Err(e) => warn!(error = %e, "Peer list unavailable"),
        }
    }

    async fn follow_subscription(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut heads = self
            .client
            .subscribe(NEW_HEADS)
            .await
            .context("Failed to subscribe to new heads")?;
        info!(subscription = heads.id(), "Following new heads");

        let mut previous_timestamp: Option<u64> = None;
        loop {
            let payload = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                payload = heads.recv() => payload,
            };
            let Some(payload) = payload else {
                bail!("New heads subscription ended");
            };

            let number = match serde_json::from_value::<HeadEvent>(payload) {
                Ok(event) => event.number,
                Err(e) => {
                    warn!(error = %e, "Ignoring undecodable head event");
                    continue;
                }
            };

            let header = match self.monitor.header_by_number(BlockNumber::Number(number)).await {
                Ok(header) => header,
                Err(e) => {
                    check_fatal(&e)?;
                    warn!(block = number, error = %e, "Failed to fetch header");
                    continue;
                }
            };

            // The first head is counted but only primes the elapsed-time baseline.
            let Some(previous) = previous_timestamp.replace(header.timestamp) else {
                if let Err(e) = self.monitor.update_statistics(&header).await {
                    check_fatal(&e)?;
                    warn!(block = number, error = %e, "Failed to count block");
                }
                continue;
            };
            self.process(&header, previous).await?;
        }
    }

    async fn follow_polling(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let head = self
            .monitor
            .header_by_number(BlockNumber::Latest)
            .await
            .context("Failed to fetch the chain head")?;
        let mut last_number = head.number;
        let mut previous_timestamp = head.timestamp;
        self.process(&head, previous_timestamp).await?;

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.tick().await;
        info!(interval = ?self.config.poll_interval, from = last_number, "Polling for new blocks");

        loop {
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                _ = ticker.tick() => {}
            }

            let current = match self.monitor.current_block_number().await {
                Ok(number) => number,
                Err(e) => {
                    check_fatal(&e)?;
                    warn!(error = %e, "Failed to fetch the chain head");
                    continue;
                }
            };

            for number in last_number + 1..=current {
                let header = match self.monitor.header_by_number(BlockNumber::Number(number)).await
                {
                    Ok(header) => header,
                    Err(e) => {
                        check_fatal(&e)?;
                        warn!(block = number, error = %e, "Failed to fetch header");
                        break;
                    }
                };
                self.process(&header, previous_timestamp).await?;
                previous_timestamp = header.timestamp;
                last_number = number;
            }
        }
    }

    async fn process(&self, header: &Header, previous_timestamp: u64) -> Result<()> {
        let report = match self.monitor.report_for_header(header, previous_timestamp).await {
            Ok(report) => report,
            Err(e) => {
                check_fatal(&e)?;
                warn!(block = header.number, error = %e, "Failed to process block");
                return Ok(());
            }
        };

        info!(
            block = report.number,
            elapsed = report.elapsed,
            proposer = ?report.proposer,
            operator = report.operator.as_deref().unwrap_or("unknown"),
            proposals = report.proposer_count,
            endorsers = report.endorsers.len(),
            next_operator = report.next_operator.as_deref().unwrap_or("unknown"),
            gas_used = report.gas_used,
            "Block processed"
        );

        // No receivers is fine.
        let _ = self.reports.send(report);
        Ok(())
    }
}

/// Transport failures that end the session cannot be retried on it.
fn check_fatal(error: &MonitorError) -> Result<()> {
    match error {
        MonitorError::Transport(e) if e.is_terminal() => {
            Err(anyhow::Error::new(error.clone()).context("Session terminated"))
        }
        _ => Ok(()),
    }
}

/// Registry from `validators_file`, or the bundled RedT registry.
pub fn load_registry(config: &RuntimeConfig) -> Result<ValidatorRegistry> {
    match &config.validators_file {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            ValidatorRegistry::from_json(&json)
                .with_context(|| format!("Invalid validator registry in {}", path.display()))
        }
        None => ValidatorRegistry::redt().context("Invalid bundled validator registry"),
    }
}
