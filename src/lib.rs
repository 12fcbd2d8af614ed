//! swarmctl - Docker Swarm provisioning on docker-machine hosts
//!
//! swarmctl turns a declared node count into a running swarm and takes it
//! apart again:
//!
//! - Machine provisioning with create → start → status fallback
//! - Per-command remote engine contexts resolved from `docker-machine env`
//! - Swarm formation (manager init, worker joins)
//! - Private registry, stack deployment and service scaling
//! - Teardown with live worker discovery
//! - A node-info HTTP service for deployed nodes

pub mod config;
pub mod error;
pub mod exec;
pub mod machine;
pub mod node_info;
pub mod orchestrator;
pub mod swarm;

pub use config::SwarmSettings;
pub use error::{Result, SwarmError};
pub use orchestrator::{InitReport, SwarmOrchestrator};
