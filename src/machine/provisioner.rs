//! Machine provisioning
//!
//! Creating a machine that already exists fails, and so does starting one
//! that is already running. The provisioner walks create → start → status
//! and reports what it found instead of failing.

use super::{worker_name, Machine};
use crate::error::Result;
use crate::exec::command::Toolchain;
use crate::exec::CommandRunner;
use tracing::{info, warn};

/// What provisioning found for a machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A new machine was created
    Created,
    /// An existing, stopped machine was started
    Started,
    /// Create and start failed but the machine reports itself running
    AlreadyRunning,
    /// Create and start failed and the machine is not known to be running
    Unreachable(String),
}

impl ProvisionOutcome {
    /// Whether the machine can be expected to accept commands
    pub fn is_usable(&self) -> bool {
        !matches!(self, ProvisionOutcome::Unreachable(_))
    }
}

/// A machine together with what provisioning found for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedMachine {
    pub machine: Machine,
    pub outcome: ProvisionOutcome,
}

impl ProvisionedMachine {
    pub fn name(&self) -> &str {
        &self.machine.name
    }
}

/// Creates or resumes docker-machine hosts
pub struct MachineProvisioner<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    tools: &'a Toolchain,
}

impl<'a, R: CommandRunner + ?Sized> MachineProvisioner<'a, R> {
    pub fn new(runner: &'a R, tools: &'a Toolchain) -> Self {
        Self { runner, tools }
    }

    /// Create or resume the manager machine. Never fails.
    pub async fn ensure_manager(&self, name: &str, driver: &str) -> ProvisionedMachine {
        let outcome = self.ensure(name, driver).await;
        info!("Manager {}: {:?}", name, outcome);
        ProvisionedMachine {
            machine: Machine::manager(name, driver),
            outcome,
        }
    }

    /// Create or resume `count` workers named `base_name{count}` down to
    /// `base_name1`, in that order. Individual failures never abort the loop.
    pub async fn ensure_workers(
        &self,
        count: usize,
        base_name: &str,
        driver: &str,
    ) -> Vec<ProvisionedMachine> {
        info!("Number of workers requested: {}", count);

        let mut workers = Vec::new();
        for index in (1..=count).rev() {
            let name = worker_name(base_name, index);
            info!("Attempting to create worker: {}", name);

            let outcome = self.ensure(&name, driver).await;
            if let ProvisionOutcome::Unreachable(reason) = &outcome {
                warn!("Worker {} is not reachable: {}", name, reason);
            }

            workers.push(ProvisionedMachine {
                machine: Machine::worker(&name, driver),
                outcome,
            });
        }

        workers
    }

    /// Address of `name`. Failures propagate.
    pub async fn machine_ip(&self, name: &str) -> Result<String> {
        let output = self.runner.run(&self.tools.machine(["ip", name])).await?;
        Ok(output.trimmed().to_string())
    }

    async fn ensure(&self, name: &str, driver: &str) -> ProvisionOutcome {
        let create = self
            .tools
            .machine(["create", "--driver", driver, name]);
        let create_err = match self.runner.run(&create).await {
            Ok(_) => return ProvisionOutcome::Created,
            Err(e) => e,
        };
        info!("Creating {} failed, starting it: {}", name, create_err);

        let start_err = match self.runner.run(&self.tools.machine(["start", name])).await {
            Ok(_) => return ProvisionOutcome::Started,
            Err(e) => e,
        };
        info!("Starting {} failed, checking whether it is running: {}", name, start_err);

        match self.runner.run(&self.tools.machine(["status", name])).await {
            Ok(out) if out.trimmed().eq_ignore_ascii_case("running") => {
                ProvisionOutcome::AlreadyRunning
            }
            Ok(out) => ProvisionOutcome::Unreachable(format!(
                "machine status is '{}' after start failed: {}",
                out.trimmed(),
                start_err
            )),
            Err(e) => ProvisionOutcome::Unreachable(e.to_string()),
        }
    }
}
