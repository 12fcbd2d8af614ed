//! Command descriptions handed to a runner

use crate::machine::RemoteContext;
use std::fmt;

/// Binaries used to drive machines and engines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Machine provisioning tool
    pub docker_machine: String,
    /// Engine client
    pub docker: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            docker_machine: "docker-machine".to_string(),
            docker: "docker".to_string(),
        }
    }
}

impl Toolchain {
    /// Build a `docker-machine` invocation
    pub fn machine<I, S>(&self, args: I) -> ExternalCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExternalCommand::new(&self.docker_machine, args)
    }

    /// Build a `docker` invocation against the engine described by `context`
    pub fn docker<I, S>(&self, context: &RemoteContext, args: I) -> ExternalCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExternalCommand::new(&self.docker, args).in_context(context)
    }
}

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    /// Program to execute
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Engine the command targets, if any
    pub context: Option<RemoteContext>,
}

impl ExternalCommand {
    /// Create a command without a remote context
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            context: None,
        }
    }

    /// Attach the remote context the command runs under
    pub fn in_context(mut self, context: &RemoteContext) -> Self {
        self.context = Some(context.clone());
        self
    }

    /// Name of the machine this command targets, if it carries a context
    pub fn target(&self) -> Option<&str> {
        self.context.as_ref().map(|c| c.machine())
    }

    /// Program and arguments joined by spaces
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(machine) => write!(f, "[{}] {}", machine, self.command_line()),
            None => write!(f, "{}", self.command_line()),
        }
    }
}

/// Captured result of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Standard output with surrounding whitespace removed
    pub fn trimmed(&self) -> &str {
        self.stdout.trim()
    }
}
