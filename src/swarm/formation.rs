//! Swarm formation
//!
//! The manager initializes the control plane and mints a worker join token;
//! each worker then joins through the manager's address.

use super::node::NodeState;
use crate::error::{Result, SwarmError};
use crate::exec::command::Toolchain;
use crate::exec::CommandRunner;
use crate::machine::ContextSwitch;
use std::fmt;
use tracing::{debug, info, warn};

/// Default swarm management port
pub const SWARM_PORT: u16 = 2377;

/// Worker join credential minted by the manager
#[derive(Clone, PartialEq, Eq)]
pub struct JoinToken(String);

impl JoinToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for JoinToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(12).collect();
        write!(f, "JoinToken({}...)", visible)
    }
}

/// Forms a swarm out of provisioned machines
pub struct FormationController<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    tools: &'a Toolchain,
    manager: String,
    port: u16,
}

impl<'a, R: CommandRunner + ?Sized> FormationController<'a, R> {
    pub fn new(runner: &'a R, tools: &'a Toolchain, manager: &str) -> Self {
        Self {
            runner,
            tools,
            manager: manager.to_string(),
            port: SWARM_PORT,
        }
    }

    /// Use a management port other than 2377
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Initialize the control plane on the manager, advertising
    /// `advertise_ip`, and return the worker join token.
    pub async fn init_manager(&self, advertise_ip: &str) -> Result<JoinToken> {
        let context = ContextSwitch::new(self.runner, self.tools)
            .switch_to(&self.manager)
            .await?;

        let init = self
            .tools
            .docker(&context, ["swarm", "init", "--advertise-addr", advertise_ip]);
        match self.runner.run(&init).await {
            Ok(_) => info!("Swarm initialized on {} ({})", self.manager, advertise_ip),
            Err(e) if is_already_in_swarm(&e) => {
                warn!("{} is already part of a swarm, reusing it", self.manager)
            }
            Err(e) => return Err(SwarmError::Formation(e.to_string())),
        }

        let token = self
            .runner
            .run(&self.tools.docker(&context, ["swarm", "join-token", "worker", "-q"]))
            .await
            .map_err(|e| SwarmError::Formation(e.to_string()))?;

        let token = token.trimmed();
        if token.is_empty() {
            return Err(SwarmError::Formation(
                "manager returned an empty join token".to_string(),
            ));
        }

        debug!("swarm join token: {}", token);
        Ok(JoinToken::new(token))
    }

    /// Join each worker in order. The first failure stops the remaining
    /// joins.
    pub async fn join_workers<S: AsRef<str>>(
        &self,
        workers: &[S],
        token: &JoinToken,
        manager_ip: &str,
    ) -> Result<()> {
        let remote = format!("{}:{}", manager_ip, self.port);
        let switch = ContextSwitch::new(self.runner, self.tools);

        for worker in workers {
            let worker = worker.as_ref();
            let mut state = NodeState::Provisioned;

            let context = switch
                .switch_to(worker)
                .await
                .map_err(|e| join_error(worker, e))?;
            state = state.advance();
            debug!("{}: {}", worker, state);

            let join = self.tools.docker(
                &context,
                ["swarm", "join", "--token", token.as_str(), remote.as_str()],
            );
            self.runner
                .run(&join)
                .await
                .map_err(|e| join_error(worker, e))?;
            state = state.advance();
            info!("{}: {} via {}", worker, state, remote);
        }

        Ok(())
    }
}

fn join_error(worker: &str, source: SwarmError) -> SwarmError {
    SwarmError::Join {
        worker: worker.to_string(),
        source: Box::new(source),
    }
}

fn is_already_in_swarm(err: &SwarmError) -> bool {
    err.stderr()
        .is_some_and(|s| s.contains("already part of a swarm"))
}
