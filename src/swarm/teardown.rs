//! Swarm teardown
//!
//! Workers leave before the manager so none is orphaned without a control
//! plane. Leaving is idempotent; destroying a machine is not.

use crate::error::{Result, SwarmError};
use crate::exec::command::Toolchain;
use crate::exec::CommandRunner;
use crate::machine::{worker_index, ContextSwitch};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Result of asking a machine to leave the swarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The node left the swarm
    Left,
    /// The node could not be reached or was not a member
    NotMember(String),
}

/// Dismantles a swarm
pub struct TeardownController<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    tools: &'a Toolchain,
    worker_base_name: String,
}

impl<'a, R: CommandRunner + ?Sized> TeardownController<'a, R> {
    pub fn new(runner: &'a R, tools: &'a Toolchain, worker_base_name: &str) -> Self {
        Self {
            runner,
            tools,
            worker_base_name: worker_base_name.to_string(),
        }
    }

    /// Force `machine` out of the swarm. Never fails.
    pub async fn leave(&self, machine: &str) -> LeaveOutcome {
        let context = match ContextSwitch::new(self.runner, self.tools)
            .switch_to(machine)
            .await
        {
            Ok(context) => context,
            Err(e) => return LeaveOutcome::NotMember(e.to_string()),
        };

        match self
            .runner
            .run(&self.tools.docker(&context, ["swarm", "leave", "--force"]))
            .await
        {
            Ok(_) => LeaveOutcome::Left,
            Err(e) => LeaveOutcome::NotMember(e.to_string()),
        }
    }

    /// Remove a machine. Failures propagate.
    pub async fn destroy(&self, machine: &str) -> Result<()> {
        info!("Removing vm: {}", machine);
        self.runner
            .run(&self.tools.machine(["rm", "-y", machine]))
            .await
            .map_err(|e| SwarmError::Destroy {
                machine: machine.to_string(),
                source: Box::new(e),
            })?;
        Ok(())
    }

    /// Workers known to the swarm or to docker-machine, excluding
    /// `manager`, ordered by descending worker index. Only names of the
    /// form `{worker_base_name}{n}` count; other swarm nodes are not ours
    /// to destroy.
    pub async fn discover_workers(&self, manager: &str) -> Vec<String> {
        let mut found = BTreeSet::new();

        match self.swarm_members(manager).await {
            Ok(members) => found.extend(members),
            Err(e) => warn!("Cannot list swarm nodes on {}: {}", manager, e),
        }

        match self.runner.run(&self.tools.machine(["ls", "-q"])).await {
            Ok(out) => found.extend(out.stdout.lines().map(str::trim).map(str::to_string)),
            Err(e) => warn!("Cannot list machines: {}", e),
        }

        found.retain(|name| {
            name != manager && worker_index(&self.worker_base_name, name).is_some()
        });

        let mut workers: Vec<String> = found.into_iter().collect();
        workers.sort_by(|a, b| {
            let ia = worker_index(&self.worker_base_name, a);
            let ib = worker_index(&self.worker_base_name, b);
            ib.cmp(&ia).then_with(|| a.cmp(b))
        });
        workers
    }

    async fn swarm_members(&self, manager: &str) -> Result<Vec<String>> {
        let context = ContextSwitch::new(self.runner, self.tools)
            .switch_to(manager)
            .await?;
        let out = self
            .runner
            .run(&self.tools.docker(&context, ["node", "ls", "--format", "{{.Hostname}}"]))
            .await?;

        Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Take every discovered worker and then the manager out of the swarm,
    /// destroying each machine right after it leaves if `destroy_machines`.
    /// Returns the workers that were torn down.
    pub async fn nuke(&self, manager: &str, destroy_machines: bool) -> Result<Vec<String>> {
        let workers = self.discover_workers(manager).await;
        info!("Tearing down {} workers: {:?}", workers.len(), workers);

        for worker in &workers {
            info!("Leaving swarm: {}", worker);
            if let LeaveOutcome::NotMember(reason) = self.leave(worker).await {
                warn!("{} did not leave cleanly: {}", worker, reason);
            }
            if destroy_machines {
                self.destroy(worker).await?;
            }
        }

        info!("Manager leaving swarm: {}", manager);
        if let LeaveOutcome::NotMember(reason) = self.leave(manager).await {
            warn!("{} did not leave cleanly: {}", manager, reason);
        }
        if destroy_machines {
            self.destroy(manager).await?;
        }

        Ok(workers)
    }
}
