//! Scripted runner for tests
//!
//! Records every command and answers from a list of rules instead of
//! spawning processes. Unmatched commands succeed with empty output, except
//! `docker-machine env <name>` and `docker-machine ip <name>` which answer
//! with a synthetic address so contexts resolve without extra setup.

use super::command::{CommandOutput, ExternalCommand};
use super::runner::CommandRunner;
use crate::error::{Result, SwarmError};
use async_trait::async_trait;
use std::sync::Mutex;

/// Scripted answer to a matching command
#[derive(Debug, Clone)]
pub enum Reply {
    /// Succeed with this stdout
    Ok(String),
    /// Fail with this stderr
    Fail(String),
}

struct Rule {
    /// Expected target machine; `None` matches any
    target: Option<String>,
    /// Expected leading words of the command line
    prefix: Vec<String>,
    reply: Reply,
}

impl Rule {
    fn matches(&self, command: &ExternalCommand) -> bool {
        if let Some(target) = &self.target {
            if command.target() != Some(target.as_str()) {
                return false;
            }
        }

        let words: Vec<&str> = std::iter::once(command.program.as_str())
            .chain(command.args.iter().map(String::as_str))
            .collect();

        self.prefix.len() <= words.len()
            && self.prefix.iter().zip(&words).all(|(p, w)| p == w)
    }
}

/// Command runner driven by scripted rules
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<ExternalCommand>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` (program included).
    /// Rules added later take precedence.
    pub fn on(&self, prefix: &str, reply: Reply) -> &Self {
        self.push(None, prefix, reply)
    }

    /// Like [`on`](Self::on), but only for commands running against `machine`
    pub fn on_machine(&self, machine: &str, prefix: &str, reply: Reply) -> &Self {
        self.push(Some(machine.to_string()), prefix, reply)
    }

    fn push(&self, target: Option<String>, prefix: &str, reply: Reply) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            target,
            prefix: prefix.split_whitespace().map(str::to_string).collect(),
            reply,
        });
        self
    }

    /// Every command issued so far, in order
    pub fn calls(&self) -> Vec<ExternalCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Every command issued so far, rendered with its target machine
    pub fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    /// Number of commands issued so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn default_reply(command: &ExternalCommand) -> Reply {
        let machine = command.args.last().cloned().unwrap_or_default();
        match command.args.first().map(String::as_str) {
            Some("env") if command.program.ends_with("docker-machine") => {
                Reply::Ok(machine_env(&machine, &synthetic_ip(&machine)))
            }
            Some("ip") if command.program.ends_with("docker-machine") => {
                Reply::Ok(format!("{}\n", synthetic_ip(&machine)))
            }
            _ => Reply::Ok(String::new()),
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &ExternalCommand) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.clone());

        let reply = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|rule| rule.matches(command))
            .map(|rule| rule.reply.clone())
            .unwrap_or_else(|| Self::default_reply(command));

        match reply {
            Reply::Ok(stdout) => Ok(CommandOutput::new(stdout)),
            Reply::Fail(stderr) => Err(SwarmError::CommandFailed {
                command: command.command_line(),
                status: "exit status: 1".to_string(),
                stderr,
            }),
        }
    }
}

/// `docker-machine env --shell bash` output for a machine at `ip`
pub fn machine_env(machine: &str, ip: &str) -> String {
    format!(
        "export DOCKER_TLS_VERIFY=\"1\"\n\
         export DOCKER_HOST=\"tcp://{ip}:2376\"\n\
         export DOCKER_CERT_PATH=\"/home/op/.docker/machine/machines/{machine}\"\n\
         export DOCKER_MACHINE_NAME=\"{machine}\"\n\
         # Run this command to configure your shell: \n\
         # eval $(docker-machine env {machine})\n"
    )
}

/// Stable fake address derived from the machine name
pub fn synthetic_ip(machine: &str) -> String {
    let last = machine.bytes().fold(0u32, |acc, b| (acc * 31 + b as u32) % 200) + 20;
    format!("192.168.99.{}", last)
}
