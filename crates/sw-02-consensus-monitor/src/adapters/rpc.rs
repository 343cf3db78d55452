//! Node gateway over [`RpcClient`].

use crate::domain::{MonitorResult, NodeInfo, PeerInfo};
use crate::ports::NodeGateway;
use async_trait::async_trait;
use serde_json::{json, Value};
use shared_types::{Address, BlockNumber, Header};
use std::time::Duration;
use sw_01_rpc_transport::RpcClient;

pub const GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";
pub const GET_VALIDATORS: &str = "istanbul_getValidators";
pub const ADMIN_NODE_INFO: &str = "admin_nodeInfo";
pub const ADMIN_PEERS: &str = "admin_peers";

/// [`NodeGateway`] backed by a live JSON-RPC session.
#[derive(Clone)]
pub struct RpcNodeGateway {
    client: RpcClient,
}

impl RpcNodeGateway {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }
}

#[async_trait]
impl NodeGateway for RpcNodeGateway {
    async fn header_by_number(
        &self,
        number: BlockNumber,
        timeout: Duration,
    ) -> MonitorResult<Option<Header>> {
        let params: Vec<Value> = vec![json!(number.to_rpc_arg()), json!(false)];
        Ok(self
            .client
            .call_with_timeout(GET_BLOCK_BY_NUMBER, params, timeout)
            .await?)
    }

    async fn validators(&self, at: BlockNumber, timeout: Duration) -> MonitorResult<Vec<Address>> {
        Ok(self
            .client
            .call_with_timeout(GET_VALIDATORS, vec![json!(at.to_rpc_arg())], timeout)
            .await?)
    }

    async fn node_info(&self, timeout: Duration) -> MonitorResult<Option<NodeInfo>> {
        Ok(self
            .client
            .call_with_timeout(ADMIN_NODE_INFO, vec![], timeout)
            .await?)
    }

    async fn peers(&self, timeout: Duration) -> MonitorResult<Option<Vec<PeerInfo>>> {
        Ok(self
            .client
            .call_with_timeout(ADMIN_PEERS, vec![], timeout)
            .await?)
    }
}
