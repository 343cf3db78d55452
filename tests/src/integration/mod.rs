//! End-to-end flows against the scripted node.

pub mod monitor_flows;
pub mod transport_flows;
