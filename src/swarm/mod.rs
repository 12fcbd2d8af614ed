//! Docker Swarm formation and lifecycle
//!
//! This module drives `docker` against machine engines to form, operate
//! and dismantle a swarm.

pub mod formation;
pub mod node;
pub mod operations;
pub mod teardown;

pub use formation::{FormationController, JoinToken, SWARM_PORT};
pub use node::{NodeRole, NodeState};
pub use operations::{ClusterOperations, RegistryStage};
pub use teardown::{LeaveOutcome, TeardownController};
