//! Consensus monitor flows over the real RPC gateway and secp256k1 recovery.

#[cfg(test)]
mod tests {
    use crate::fixtures::{Chain, FakeNode, BLOCK_PERIOD, NODE_ENODE};
    use monitor_runtime::LiveMonitor;
    use shared_types::BlockNumber;
    use std::sync::Arc;
    use sw_01_rpc_transport::TransportConfig;
    use sw_02_consensus_monitor::{
        ConsensusMonitor, MonitorConfig, MonitorDependencies, MonitorError, RpcNodeGateway,
        Secp256k1Recovery,
    };

    async fn monitor_over(node: &FakeNode, client: sw_01_rpc_transport::RpcClient) -> LiveMonitor {
        ConsensusMonitor::new(MonitorDependencies {
            gateway: Arc::new(RpcNodeGateway::new(client)),
            recovery: Arc::new(Secp256k1Recovery),
            registry: node.with_chain(Chain::registry),
            config: MonitorConfig::default(),
        })
        .await
        .unwrap()
    }

    // =========================================================================
    // STARTUP
    // =========================================================================

    #[tokio::test]
    async fn test_validator_set_loaded_in_canonical_order() {
        let (node, client) = FakeNode::start(Chain::new(4, 3)).await;
        let monitor = monitor_over(&node, client).await;

        assert_eq!(monitor.validators(), node.with_chain(Chain::validators).as_slice());
        assert_eq!(node.requests("istanbul_getValidators"), 1);
        for (i, address) in monitor.validators().iter().enumerate() {
            let info = monitor.validator_info(address).unwrap();
            assert_eq!(info.operator, format!("Operator-{}", i));
        }
    }

    #[tokio::test]
    async fn test_node_info_and_peers() {
        let (node, client) = FakeNode::start(Chain::new(4, 1)).await;
        let monitor = monitor_over(&node, client).await;

        let info = monitor.node_info().await.unwrap();
        assert_eq!(info.enode, NODE_ENODE);
        assert_eq!(info.ports.listener, 21000);
        // Generator point: private key 1.
        assert_eq!(
            info.address().unwrap(),
            shared_types::parse_address("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf").unwrap()
        );
        assert!(monitor.peers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_methods_disabled() {
        let (node, client) =
            FakeNode::start_with(Chain::new(4, 1), false, TransportConfig::default()).await;
        let monitor = monitor_over(&node, client).await;

        assert!(matches!(
            monitor.node_info().await,
            Err(MonitorError::Transport(_))
        ));
        // The session survives a remote error.
        assert_eq!(monitor.current_block_number().await.unwrap(), 1);
    }

    // =========================================================================
    // SIGNERS
    // =========================================================================

    #[tokio::test]
    async fn test_signers_recovered_from_sealed_blocks() {
        let (node, client) = FakeNode::start(Chain::new(4, 6)).await;
        let monitor = monitor_over(&node, client).await;
        let validators = node.with_chain(Chain::validators);

        for number in 1..=6u64 {
            let data = monitor
                .signer_data_for_block(BlockNumber::Number(number))
                .await
                .unwrap();
            let expected_hash = node.with_chain(|c| c.header(number).unwrap().hash.unwrap());

            assert_eq!(data.number, number);
            assert_eq!(data.hash, expected_hash);
            assert_eq!(data.proposer, node.with_chain(|c| c.proposer_of(number)));
            assert_eq!(data.endorsers, validators);
        }

        // Lookups do not count.
        assert_eq!(monitor.snapshot().await.last_processed, 0);
    }

    #[tokio::test]
    async fn test_headers_are_fetched_once() {
        let (node, client) = FakeNode::start(Chain::new(4, 5)).await;
        let monitor = monitor_over(&node, client).await;

        for _ in 0..3 {
            monitor
                .header_by_number(BlockNumber::Number(3))
                .await
                .unwrap();
        }
        assert_eq!(node.requests("eth_getBlockByNumber"), 1);

        // "latest" always goes to the node.
        monitor.current_block_number().await.unwrap();
        monitor.current_block_number().await.unwrap();
        assert_eq!(node.requests("eth_getBlockByNumber"), 3);

        // ...and is then cached under its number.
        monitor
            .header_by_number(BlockNumber::Number(5))
            .await
            .unwrap();
        assert_eq!(node.requests("eth_getBlockByNumber"), 3);
    }

    #[tokio::test]
    async fn test_missing_block() {
        let (node, client) = FakeNode::start(Chain::new(4, 2)).await;
        let monitor = monitor_over(&node, client).await;

        let err = monitor
            .header_by_number(BlockNumber::Number(99))
            .await
            .unwrap_err();
        assert_eq!(err, MonitorError::BlockNotFound(BlockNumber::Number(99)));
    }

    // =========================================================================
    // STATISTICS
    // =========================================================================

    #[tokio::test]
    async fn test_initialize_then_follow() {
        let (node, client) = FakeNode::start(Chain::new(4, 10)).await;
        let monitor = monitor_over(&node, client).await;
        let validators = node.with_chain(Chain::validators);

        // Blocks 6..=10: proposers at positions 2, 3, 0, 1, 2.
        monitor.initialize_statistics(4).await.unwrap();
        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.last_processed, 10);
        assert_eq!(snapshot.proposals_of(&validators[2]), 2);
        for i in [0, 1, 3] {
            assert_eq!(snapshot.proposals_of(&validators[i]), 1);
        }
        for address in &validators {
            assert_eq!(snapshot.endorsements_of(address), 5);
        }

        // Block 11 is proposed by position 3.
        let header = node.mine();
        let report = monitor
            .report_for_header(&header, header.timestamp - BLOCK_PERIOD)
            .await
            .unwrap();
        assert_eq!(report.number, 11);
        assert_eq!(report.elapsed, BLOCK_PERIOD);
        assert_eq!(report.proposer, validators[3]);
        assert_eq!(report.operator.as_deref(), Some("Operator-3"));
        assert_eq!(report.proposer_count, 2);
        assert_eq!(report.next_proposer, Some(validators[0]));
        assert_eq!(report.next_operator.as_deref(), Some("Operator-0"));
        assert_eq!(report.endorsers.len(), 4);
        assert!(report.validators.iter().all(|row| row.is_endorser));
        assert_eq!(report.validators.iter().filter(|row| row.is_proposer).count(), 1);

        // Replaying an old block changes nothing.
        let old = monitor
            .header_by_number(BlockNumber::Number(9))
            .await
            .unwrap();
        monitor.update_statistics(&old).await.unwrap();
        let after = monitor.snapshot().await;
        assert_eq!(after.last_processed, 11);
        assert_eq!(after.proposals_of(&validators[1]), 1);
    }

    #[tokio::test]
    async fn test_initialize_window_larger_than_chain() {
        let (node, client) = FakeNode::start(Chain::new(4, 3)).await;
        let monitor = monitor_over(&node, client).await;

        monitor.initialize_statistics(1_000).await.unwrap();
        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.last_processed, 3);
        assert_eq!(snapshot.proposals_by.values().sum::<u64>(), 3);
    }

    #[tokio::test]
    async fn test_next_proposer_follows_the_chain() {
        let (node, client) = FakeNode::start(Chain::new(4, 8)).await;
        let monitor = monitor_over(&node, client).await;

        for number in 1..8u64 {
            let data = monitor
                .signer_data_for_block(BlockNumber::Number(number))
                .await
                .unwrap();
            assert_eq!(
                monitor.next_proposer(&data.proposer).unwrap(),
                node.with_chain(|c| c.proposer_of(number + 1))
            );
        }
    }
}
