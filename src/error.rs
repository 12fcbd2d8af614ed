//! Error types for swarmctl

use thiserror::Error;

/// Result type for swarmctl operations
pub type Result<T> = std::result::Result<T, SwarmError>;

/// swarmctl error types
#[derive(Error, Debug)]
pub enum SwarmError {
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Command timed out after {secs}s: {command}")]
    Timeout { command: String, secs: u64 },

    #[error("Cannot resolve remote context for machine '{machine}': {reason}")]
    Context { machine: String, reason: String },

    #[error("Machine error: {0}")]
    Machine(String),

    #[error("Swarm formation failed: {0}")]
    Formation(String),

    #[error("Worker '{worker}' failed to join the swarm: {source}")]
    Join {
        worker: String,
        #[source]
        source: Box<SwarmError>,
    },

    #[error("Registry pipeline failed at {stage}: {source}")]
    Registry {
        stage: &'static str,
        #[source]
        source: Box<SwarmError>,
    },

    #[error("Failed to destroy machine '{machine}': {source}")]
    Destroy {
        machine: String,
        #[source]
        source: Box<SwarmError>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Node info error: {0}")]
    NodeInfo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SwarmError {
    /// Raw stderr of the failing external command, if this error came from one
    pub fn stderr(&self) -> Option<&str> {
        match self {
            SwarmError::CommandFailed { stderr, .. } => Some(stderr),
            SwarmError::Join { source, .. }
            | SwarmError::Registry { source, .. }
            | SwarmError::Destroy { source, .. } => source.stderr(),
            _ => None,
        }
    }
}
