//! docker-machine hosts
//!
//! Machines are never tracked locally; every operation re-probes
//! `docker-machine` for their state.

pub mod context;
pub mod provisioner;

pub use context::{ContextSwitch, RemoteContext};
pub use provisioner::{MachineProvisioner, ProvisionOutcome, ProvisionedMachine};

use crate::swarm::NodeRole;
use serde::{Deserialize, Serialize};

/// A machine hosting a swarm node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Machine name, unique within a run
    pub name: String,
    /// Role the machine plays in the swarm
    pub role: NodeRole,
    /// docker-machine driver
    pub driver: String,
}

impl Machine {
    pub fn manager(name: &str, driver: &str) -> Self {
        Self {
            name: name.to_string(),
            role: NodeRole::Manager,
            driver: driver.to_string(),
        }
    }

    pub fn worker(name: &str, driver: &str) -> Self {
        Self {
            name: name.to_string(),
            role: NodeRole::Worker,
            driver: driver.to_string(),
        }
    }
}

/// Largest worker count a single `init` will provision
pub const MAX_WORKERS: usize = 1000;

/// Name of the `index`-th worker
pub fn worker_name(base_name: &str, index: usize) -> String {
    format!("{}{}", base_name, index)
}

/// Index of a worker name derived from `base_name`, if it is one
pub fn worker_index(base_name: &str, name: &str) -> Option<usize> {
    name.strip_prefix(base_name)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_name_round_trip() {
        assert_eq!(worker_name("worker", 3), "worker3");
        assert_eq!(worker_index("worker", "worker3"), Some(3));
        assert_eq!(worker_index("worker", "worker"), None);
        assert_eq!(worker_index("worker", "manager"), None);
        assert_eq!(worker_index("worker", "workerx"), None);
    }
}
