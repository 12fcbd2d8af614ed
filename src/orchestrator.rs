//! Operator-level flows: init, scale and remove-all

use crate::config::SwarmSettings;
use crate::error::{Result, SwarmError};
use crate::exec::command::Toolchain;
use crate::exec::CommandRunner;
use crate::machine::{MachineProvisioner, ProvisionedMachine, MAX_WORKERS};
use crate::swarm::{ClusterOperations, FormationController, TeardownController};
use tracing::{info, warn};

/// What `init` produced
#[derive(Debug, Clone)]
pub struct InitReport {
    /// Address the manager advertises
    pub manager_ip: String,
    pub manager: ProvisionedMachine,
    /// Workers in provisioning (and joining) order
    pub workers: Vec<ProvisionedMachine>,
}

/// Swarm orchestrator
pub struct SwarmOrchestrator<R: CommandRunner> {
    runner: R,
    settings: SwarmSettings,
    tools: Toolchain,
}

impl<R: CommandRunner> SwarmOrchestrator<R> {
    pub fn new(runner: R, settings: SwarmSettings) -> Self {
        let tools = settings.toolchain();
        Self {
            runner,
            settings,
            tools,
        }
    }

    pub fn settings(&self) -> &SwarmSettings {
        &self.settings
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn operations(&self) -> ClusterOperations<'_, R> {
        ClusterOperations::new(&self.runner, &self.tools, &self.settings.manager_name)
    }

    /// Provision a manager and `worker_count` workers, form the swarm,
    /// stand up the private registry and deploy the stack.
    pub async fn init(&self, worker_count: usize) -> Result<InitReport> {
        let s = &self.settings;
        if worker_count > MAX_WORKERS {
            return Err(SwarmError::InvalidConfig(format!(
                "{} workers requested, at most {} are supported",
                worker_count, MAX_WORKERS
            )));
        }

        info!("Initializing all machines...");
        let provisioner = MachineProvisioner::new(&self.runner, &self.tools);
        let manager = provisioner.ensure_manager(&s.manager_name, &s.driver).await;
        if !manager.outcome.is_usable() {
            warn!("Manager {} may not be running: {:?}", s.manager_name, manager.outcome);
        }
        let manager_ip = provisioner.machine_ip(&s.manager_name).await?;
        info!("manager_ip: {}", manager_ip);

        let workers = provisioner
            .ensure_workers(worker_count, &s.worker_base_name, &s.driver)
            .await;
        let names: Vec<&str> = workers.iter().map(ProvisionedMachine::name).collect();
        info!("Created workers: {:?}", names);

        info!("Initializing swarm manager...");
        let formation = FormationController::new(&self.runner, &self.tools, &s.manager_name)
            .with_port(s.swarm_port);
        let token = formation.init_manager(&manager_ip).await?;

        info!("Joining workers to swarm...");
        formation.join_workers(&names, &token, &manager_ip).await?;

        info!("Creating private registry...");
        self.operations().create_private_registry(&s.registry).await?;

        info!("Deploying container image to swarm...");
        self.operations()
            .deploy_stack(&s.stack.name, &s.stack.compose_file())
            .await?;

        Ok(InitReport {
            manager_ip,
            manager,
            workers,
        })
    }

    /// Set the replica count of `service`, or of the configured stack
    /// service when `None`
    pub async fn scale(&self, service: Option<&str>, replicas: &str) -> Result<()> {
        let service = service.unwrap_or(self.settings.stack.service.as_str());
        self.operations().scale(service, replicas).await
    }

    /// Tear the swarm down, destroying the machines if `destroy_machines`.
    /// Returns the workers that were torn down.
    pub async fn remove_all(&self, destroy_machines: bool) -> Result<Vec<String>> {
        TeardownController::new(&self.runner, &self.tools, &self.settings.worker_base_name)
            .nuke(&self.settings.manager_name, destroy_machines)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{synthetic_ip, Reply, ScriptedRunner};
    use std::path::PathBuf;

    fn settings() -> SwarmSettings {
        let mut settings = SwarmSettings::default();
        settings.stack.compose_file = Some(PathBuf::from("/srv/docker-compose.yml"));
        settings
    }

    #[tokio::test]
    async fn test_init_rejects_oversized_worker_count() {
        let orchestrator = SwarmOrchestrator::new(ScriptedRunner::new(), settings());

        let err = orchestrator.init(usize::MAX).await.unwrap_err();

        assert!(matches!(err, SwarmError::InvalidConfig(_)));
        assert_eq!(orchestrator.runner().call_count(), 0);
    }

    #[tokio::test]
    async fn test_init_runs_full_flow_in_order() {
        let runner = ScriptedRunner::new();
        runner.on("docker swarm join-token", Reply::Ok("SWMTKN-1-xyz\n".into()));
        let orchestrator = SwarmOrchestrator::new(runner, settings());

        let report = orchestrator.init(2).await.unwrap();
        let ip = synthetic_ip("manager");
        assert_eq!(report.manager_ip, ip);
        assert_eq!(report.workers.len(), 2);

        let lines: Vec<String> = orchestrator
            .runner()
            .call_lines()
            .into_iter()
            .filter(|l| !l.contains("docker-machine env"))
            .collect();
        assert_eq!(
            lines,
            vec![
                "docker-machine create --driver virtualbox manager".to_string(),
                "docker-machine ip manager".to_string(),
                "docker-machine create --driver virtualbox worker2".to_string(),
                "docker-machine create --driver virtualbox worker1".to_string(),
                format!("[manager] docker swarm init --advertise-addr {}", ip),
                "[manager] docker swarm join-token worker -q".to_string(),
                format!("[worker2] docker swarm join --token SWMTKN-1-xyz {}:2377", ip),
                format!("[worker1] docker swarm join --token SWMTKN-1-xyz {}:2377", ip),
                "[manager] docker service create --name registry --publish=5000:5000 -e 0.0.0.0:5000 registry:latest".to_string(),
                "[manager] docker build -t 127.0.0.1:5000/swimage:latest .".to_string(),
                "[manager] docker push 127.0.0.1:5000/swimage:latest".to_string(),
                "[manager] docker stack deploy --compose-file /srv/docker-compose.yml stack".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_init_fails_without_manager_ip() {
        let runner = ScriptedRunner::new();
        runner.on("docker-machine ip", Reply::Fail("Host is not running".into()));
        let orchestrator = SwarmOrchestrator::new(runner, settings());

        assert!(orchestrator.init(1).await.is_err());
        assert!(!orchestrator
            .runner()
            .call_lines()
            .iter()
            .any(|l| l.contains("worker1")));
    }

    #[tokio::test]
    async fn test_scale_defaults_to_stack_service() {
        let orchestrator = SwarmOrchestrator::new(ScriptedRunner::new(), settings());

        orchestrator.scale(None, "3").await.unwrap();
        orchestrator.scale(Some("stack_db"), "1").await.unwrap();

        let lines = orchestrator.runner().call_lines();
        assert!(lines.contains(&"[manager] docker service scale stack_web=3".to_string()));
        assert!(lines.contains(&"[manager] docker service scale stack_db=1".to_string()));
    }
}
