//! Node introspection results (`admin_nodeInfo`, `admin_peers`).
//!
//! Only the fields the monitor reads are typed; protocol details are kept
//! as raw JSON.

use super::{enode_to_address, MonitorError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::Address;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePorts {
    #[serde(default)]
    pub discovery: u16,
    #[serde(default)]
    pub listener: u16,
}

/// Local node description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub enode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enr: Option<String>,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub ports: NodePorts,
    #[serde(default)]
    pub listen_addr: String,
    #[serde(default)]
    pub protocols: Value,
}

impl NodeInfo {
    /// Account address of the node key.
    pub fn address(&self) -> Result<Address, MonitorError> {
        enode_to_address(&self.enode)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerNetwork {
    #[serde(default)]
    pub local_address: String,
    #[serde(default)]
    pub remote_address: String,
    #[serde(default)]
    pub inbound: bool,
    #[serde(default)]
    pub trusted: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

/// One connected peer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    #[serde(default)]
    pub enode: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub caps: Vec<String>,
    #[serde(default)]
    pub network: PeerNetwork,
    #[serde(default)]
    pub protocols: Value,
}

impl PeerInfo {
    pub fn address(&self) -> Result<Address, MonitorError> {
        enode_to_address(&self.enode)
    }
}
