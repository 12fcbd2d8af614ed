//! Operations against a formed swarm, always issued on the manager

use crate::config::RegistrySettings;
use crate::error::{Result, SwarmError};
use crate::exec::command::Toolchain;
use crate::exec::{CommandOutput, CommandRunner};
use crate::machine::{ContextSwitch, RemoteContext};
use std::path::Path;
use tracing::info;

/// Stages of the private registry pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryStage {
    CreateService,
    Build,
    Push,
}

impl RegistryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryStage::CreateService => "registry service creation",
            RegistryStage::Build => "image build",
            RegistryStage::Push => "image push",
        }
    }
}

/// Registry, stack and scaling operations
pub struct ClusterOperations<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    tools: &'a Toolchain,
    manager: String,
}

impl<'a, R: CommandRunner + ?Sized> ClusterOperations<'a, R> {
    pub fn new(runner: &'a R, tools: &'a Toolchain, manager: &str) -> Self {
        Self {
            runner,
            tools,
            manager: manager.to_string(),
        }
    }

    async fn manager_context(&self) -> Result<RemoteContext> {
        ContextSwitch::new(self.runner, self.tools)
            .switch_to(&self.manager)
            .await
    }

    /// Create the registry service, then build and push the application
    /// image. Each stage runs only if the previous one succeeded; a registry
    /// service that already exists counts as success.
    pub async fn create_private_registry(&self, spec: &RegistrySettings) -> Result<()> {
        let context = self.manager_context().await?;

        info!("Creating private registry {}", spec.name);
        let publish = format!("--publish={}", spec.publish_ports);
        let create = self.tools.docker(
            &context,
            [
                "service",
                "create",
                "--name",
                spec.name.as_str(),
                publish.as_str(),
                "-e",
                spec.bind_addr.as_str(),
                spec.service_image.as_str(),
            ],
        );
        match self.runner.run(&create).await {
            Ok(_) => {}
            Err(e) if e.stderr().is_some_and(|s| s.contains("already exists")) => {
                info!("Registry service {} already exists", spec.name)
            }
            Err(e) => return Err(stage_error(RegistryStage::CreateService, e)),
        }

        let build_context = spec.build_context.to_string_lossy().into_owned();
        info!("Building {} from {}", spec.app_image_tag, build_context);
        self.runner
            .run(&self.tools.docker(
                &context,
                ["build", "-t", spec.app_image_tag.as_str(), build_context.as_str()],
            ))
            .await
            .map_err(|e| stage_error(RegistryStage::Build, e))?;

        info!("Pushing {}", spec.app_image_tag);
        self.runner
            .run(&self.tools.docker(&context, ["push", spec.app_image_tag.as_str()]))
            .await
            .map_err(|e| stage_error(RegistryStage::Push, e))?;

        Ok(())
    }

    /// Deploy the compose definition at `compose_file` as `stack_name`
    pub async fn deploy_stack(&self, stack_name: &str, compose_file: &Path) -> Result<CommandOutput> {
        let context = self.manager_context().await?;
        let compose_file = compose_file.to_string_lossy().into_owned();

        info!("Deploying stack {} from {}", stack_name, compose_file);
        let result = self
            .runner
            .run(&self.tools.docker(
                &context,
                ["stack", "deploy", "--compose-file", compose_file.as_str(), stack_name],
            ))
            .await?;
        info!("deploy stack status: {}", result.trimmed());

        Ok(result)
    }

    /// Set the replica count of `service_id`. `replicas` is passed through
    /// unchecked; bad values surface as the engine's error.
    pub async fn scale(&self, service_id: &str, replicas: &str) -> Result<()> {
        let context = self.manager_context().await?;

        info!("Scaling {} to {} replicas", service_id, replicas);
        let target = format!("{}={}", service_id, replicas);
        self.runner
            .run(&self.tools.docker(&context, ["service", "scale", target.as_str()]))
            .await?;

        Ok(())
    }
}

fn stage_error(stage: RegistryStage, source: SwarmError) -> SwarmError {
    SwarmError::Registry {
        stage: stage.as_str(),
        source: Box::new(source),
    }
}
