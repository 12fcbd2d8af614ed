//! swarmctl settings
//!
//! Settings come from an optional YAML file; unset keys keep their
//! defaults.

use crate::error::{Result, SwarmError};
use crate::exec::command::Toolchain;
use crate::swarm::SWARM_PORT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File name looked up in the user's config directory
pub const SETTINGS_FILE: &str = "swarmctl.yaml";

/// Compose file deployed when none is configured
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmSettings {
    /// Manager machine name
    pub manager_name: String,
    /// Workers are named `{worker_base_name}{index}`
    pub worker_base_name: String,
    /// docker-machine driver
    pub driver: String,
    /// Swarm management port workers join through
    pub swarm_port: u16,
    /// Path or name of the docker-machine binary
    pub docker_machine_bin: String,
    /// Path or name of the docker binary
    pub docker_bin: String,
    /// Abort external commands running longer than this
    pub command_timeout_secs: Option<u64>,
    /// Private registry
    pub registry: RegistrySettings,
    /// Stack deployment
    pub stack: StackSettings,
    /// Node-info service
    pub node_info: NodeInfoSettings,
}

impl Default for SwarmSettings {
    fn default() -> Self {
        Self {
            manager_name: "manager".to_string(),
            worker_base_name: "worker".to_string(),
            driver: "virtualbox".to_string(),
            swarm_port: SWARM_PORT,
            docker_machine_bin: "docker-machine".to_string(),
            docker_bin: "docker".to_string(),
            command_timeout_secs: None,
            registry: RegistrySettings::default(),
            stack: StackSettings::default(),
            node_info: NodeInfoSettings::default(),
        }
    }
}

/// Private registry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// `--publish` value of the registry service
    pub publish_ports: String,
    /// Registry service name
    pub name: String,
    /// Address the registry binds to
    pub bind_addr: String,
    /// Registry image
    pub service_image: String,
    /// Tag of the application image built and pushed
    pub app_image_tag: String,
    /// Build context of the application image
    pub build_context: PathBuf,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            publish_ports: "5000:5000".to_string(),
            name: "registry".to_string(),
            bind_addr: "0.0.0.0:5000".to_string(),
            service_image: "registry:latest".to_string(),
            app_image_tag: "127.0.0.1:5000/swimage:latest".to_string(),
            build_context: PathBuf::from("."),
        }
    }
}

/// Stack settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    /// Stack name
    pub name: String,
    /// Compose file; defaults to `docker-compose.yml` beside the executable
    pub compose_file: Option<PathBuf>,
    /// Service scaled when none is given
    pub service: String,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            name: "stack".to_string(),
            compose_file: None,
            service: "stack_web".to_string(),
        }
    }
}

impl StackSettings {
    /// Compose file to deploy
    pub fn compose_file(&self) -> PathBuf {
        if let Some(path) = &self.compose_file {
            return path.clone();
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.canonicalize().ok())
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_COMPOSE_FILE)
    }
}

/// Node-info service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInfoSettings {
    /// Listen address
    pub bind: String,
    /// Address the outbound interface is discovered against
    pub probe_target: String,
}

impl Default for NodeInfoSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            probe_target: "8.8.8.8:80".to_string(),
        }
    }
}

impl SwarmSettings {
    /// Load settings from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_yaml::from_str(&content)?;
        debug!("Loaded settings from {}", path.display());
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path`, or from the user's config directory if a settings
    /// file exists there, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/swarmctl/swarmctl.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("swarmctl").join(SETTINGS_FILE))
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("manager_name", &self.manager_name),
            ("worker_base_name", &self.worker_base_name),
            ("driver", &self.driver),
            ("docker_machine_bin", &self.docker_machine_bin),
            ("docker_bin", &self.docker_bin),
            ("stack.name", &self.stack.name),
            ("registry.app_image_tag", &self.registry.app_image_tag),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(SwarmError::InvalidConfig(format!("{} must not be empty", key)));
            }
        }

        if self.swarm_port == 0 {
            return Err(SwarmError::InvalidConfig("swarm_port must not be 0".to_string()));
        }

        if crate::machine::worker_index(&self.worker_base_name, &self.manager_name).is_some() {
            return Err(SwarmError::InvalidConfig(format!(
                "manager_name '{}' collides with worker names",
                self.manager_name
            )));
        }

        Ok(())
    }

    /// Binaries to drive
    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            docker_machine: self.docker_machine_bin.clone(),
            docker: self.docker_bin.clone(),
        }
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = SwarmSettings::default();
        assert_eq!(settings.manager_name, "manager");
        assert_eq!(settings.swarm_port, 2377);
        assert_eq!(settings.registry.publish_ports, "5000:5000");
        assert_eq!(settings.stack.service, "stack_web");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "driver: digitalocean\nregistry:\n  name: images\nstack:\n  compose_file: /srv/compose.yml\n"
        )
        .unwrap();

        let settings = SwarmSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.driver, "digitalocean");
        assert_eq!(settings.registry.name, "images");
        assert_eq!(settings.registry.service_image, "registry:latest");
        assert_eq!(settings.stack.compose_file(), PathBuf::from("/srv/compose.yml"));
        assert_eq!(settings.manager_name, "manager");
    }

    #[test]
    fn test_invalid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "swarm_port: [not a port").unwrap();

        assert!(matches!(
            SwarmSettings::from_file(file.path()),
            Err(SwarmError::Yaml(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut settings = SwarmSettings::default();
        settings.manager_name = " ".to_string();
        assert!(settings.validate().is_err());

        let mut settings = SwarmSettings::default();
        settings.swarm_port = 0;
        assert!(settings.validate().is_err());

        let mut settings = SwarmSettings::default();
        settings.manager_name = "worker7".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_default_compose_file_beside_executable() {
        let path = StackSettings::default().compose_file();
        assert_eq!(path.file_name().unwrap(), DEFAULT_COMPOSE_FILE);
    }

    #[test]
    fn test_toolchain_and_timeout() {
        let mut settings = SwarmSettings::default();
        settings.docker_bin = "/usr/local/bin/docker".to_string();
        settings.command_timeout_secs = Some(30);

        assert_eq!(settings.toolchain().docker, "/usr/local/bin/docker");
        assert_eq!(settings.command_timeout(), Some(Duration::from_secs(30)));
    }
}
