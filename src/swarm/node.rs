//! Swarm node roles and formation states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node role in the swarm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Worker node
    #[default]
    Worker,
    /// Manager node
    Manager,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Worker => write!(f, "worker"),
            NodeRole::Manager => write!(f, "manager"),
        }
    }
}

/// Where a machine is on its way into the swarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Machine exists but no context has been resolved for it
    Provisioned,
    /// Commands can be addressed to the machine's engine
    ContextActive,
    /// Machine is a member of the swarm
    SwarmJoined,
}

impl NodeState {
    /// Next state on the way to `SwarmJoined`
    pub fn advance(self) -> Self {
        match self {
            NodeState::Provisioned => NodeState::ContextActive,
            NodeState::ContextActive | NodeState::SwarmJoined => NodeState::SwarmJoined,
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Provisioned => write!(f, "provisioned"),
            NodeState::ContextActive => write!(f, "context-active"),
            NodeState::SwarmJoined => write!(f, "swarm-joined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_progression() {
        let state = NodeState::Provisioned;
        assert_eq!(state.advance(), NodeState::ContextActive);
        assert_eq!(state.advance().advance(), NodeState::SwarmJoined);
        assert_eq!(NodeState::SwarmJoined.advance(), NodeState::SwarmJoined);
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&NodeRole::Manager).unwrap();
        assert_eq!(json, "\"manager\"");
        assert_eq!(NodeRole::default(), NodeRole::Worker);
    }
}
