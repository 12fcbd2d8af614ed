//! Node-info service
//!
//! A small stateless HTTP service deployed on swarm nodes, reporting health,
//! the node's outbound address, the caller's address and the node clock.

pub mod client;
pub mod server;

pub use client::NodeInfoClient;
pub use server::{outbound_ip, NodeInfoServer};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIpResponse {
    pub node_ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIpResponse {
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTimeResponse {
    /// Nanoseconds since the Unix epoch
    pub time: i64,
}
