//! Remote engine contexts
//!
//! `docker-machine env` prints the variables that point a `docker` client at
//! a machine's engine. [`ContextSwitch`] resolves them into a
//! [`RemoteContext`] which callers attach to each command.

use crate::error::{Result, SwarmError};
use crate::exec::command::Toolchain;
use crate::exec::CommandRunner;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info};

const DOCKER_HOST: &str = "DOCKER_HOST";
const DOCKER_TLS_VERIFY: &str = "DOCKER_TLS_VERIFY";
const DOCKER_CERT_PATH: &str = "DOCKER_CERT_PATH";
const DOCKER_API_VERSION: &str = "DOCKER_API_VERSION";

/// Connection parameters of one machine's engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteContext {
    machine: String,
    vars: BTreeMap<String, String>,
}

impl RemoteContext {
    /// Parse `docker-machine env --shell bash` output
    pub fn parse(machine: &str, output: &str) -> Result<Self> {
        static EXPORT: OnceLock<Regex> = OnceLock::new();
        let export = EXPORT.get_or_init(|| {
            Regex::new(r#"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)=(.*)$"#)
                .expect("valid export pattern")
        });

        let mut vars = BTreeMap::new();
        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(caps) = export.captures(line) {
                let value = caps[2].trim().trim_matches('"').trim_matches('\'');
                vars.insert(caps[1].to_string(), value.to_string());
            }
        }

        if !vars.contains_key(DOCKER_HOST) {
            return Err(SwarmError::Context {
                machine: machine.to_string(),
                reason: format!("no {} in docker-machine env output", DOCKER_HOST),
            });
        }

        Ok(Self {
            machine: machine.to_string(),
            vars,
        })
    }

    /// Machine this context points at
    pub fn machine(&self) -> &str {
        &self.machine
    }

    /// Engine address, e.g. `tcp://192.168.99.100:2376`
    pub fn host(&self) -> &str {
        self.vars.get(DOCKER_HOST).map(String::as_str).unwrap_or_default()
    }

    pub fn tls_verify(&self) -> bool {
        self.vars
            .get(DOCKER_TLS_VERIFY)
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }

    pub fn cert_path(&self) -> Option<&str> {
        self.vars.get(DOCKER_CERT_PATH).map(String::as_str)
    }

    pub fn api_version(&self) -> Option<&str> {
        self.vars.get(DOCKER_API_VERSION).map(String::as_str)
    }

    /// All variables to set on a child process
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    #[cfg(test)]
    pub(crate) fn for_test(machine: &str, ip: &str) -> Self {
        Self::parse(machine, &crate::exec::testing::machine_env(machine, ip))
            .expect("synthetic env parses")
    }
}

/// Resolves machine names into remote contexts
pub struct ContextSwitch<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    tools: &'a Toolchain,
}

impl<'a, R: CommandRunner + ?Sized> ContextSwitch<'a, R> {
    pub fn new(runner: &'a R, tools: &'a Toolchain) -> Self {
        Self { runner, tools }
    }

    /// Resolve the context for `machine`. Failures propagate: nothing can
    /// be run on a machine that cannot be reached.
    pub async fn switch_to(&self, machine: &str) -> Result<RemoteContext> {
        if machine.trim().is_empty() {
            return Err(SwarmError::Context {
                machine: machine.to_string(),
                reason: "empty machine name".to_string(),
            });
        }

        let output = self
            .runner
            .run(&self.tools.machine(["env", "--shell", "bash", machine]))
            .await
            .map_err(|e| SwarmError::Context {
                machine: machine.to_string(),
                reason: e.to_string(),
            })?;

        let context = RemoteContext::parse(machine, &output.stdout)?;
        info!("Switched context to {} ({})", machine, context.host());
        debug!("Context for {}: {:?}", machine, context.vars());

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{Reply, ScriptedRunner};

    #[test]
    fn test_parse_machine_env() {
        let output = "export DOCKER_TLS_VERIFY=\"1\"\n\
                      export DOCKER_HOST=\"tcp://192.168.99.100:2376\"\n\
                      export DOCKER_CERT_PATH=\"/home/op/.docker/machine/machines/manager\"\n\
                      export DOCKER_MACHINE_NAME=\"manager\"\n\
                      # Run this command to configure your shell: \n\
                      # eval $(docker-machine env manager)\n";

        let ctx = RemoteContext::parse("manager", output).unwrap();
        assert_eq!(ctx.machine(), "manager");
        assert_eq!(ctx.host(), "tcp://192.168.99.100:2376");
        assert!(ctx.tls_verify());
        assert_eq!(
            ctx.cert_path(),
            Some("/home/op/.docker/machine/machines/manager")
        );
        assert_eq!(ctx.api_version(), None);
        assert_eq!(ctx.vars().len(), 4);
    }

    #[test]
    fn test_parse_keeps_equals_in_value() {
        let output = "export DOCKER_HOST=\"tcp://10.0.0.5:2376\"\nexport EXTRA=\"a=b\"\n";
        let ctx = RemoteContext::parse("m", output).unwrap();
        assert_eq!(ctx.vars().get("EXTRA").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_parse_without_host_fails() {
        let err = RemoteContext::parse("m", "# nothing here\n").unwrap_err();
        assert!(matches!(err, SwarmError::Context { .. }));
    }

    #[tokio::test]
    async fn test_switch_resolves_context() {
        let runner = ScriptedRunner::new();
        let tools = Toolchain::default();
        let switch = ContextSwitch::new(&runner, &tools);

        let ctx = switch.switch_to("worker2").await.unwrap();
        assert_eq!(ctx.machine(), "worker2");
        assert_eq!(
            runner.call_lines(),
            vec!["docker-machine env --shell bash worker2"]
        );
    }

    #[tokio::test]
    async fn test_switch_failure_propagates() {
        let runner = ScriptedRunner::new();
        runner.on(
            "docker-machine env",
            Reply::Fail("Host does not exist: \"ghost\"".into()),
        );
        let tools = Toolchain::default();
        let switch = ContextSwitch::new(&runner, &tools);

        let err = switch.switch_to("ghost").await.unwrap_err();
        match err {
            SwarmError::Context { machine, reason } => {
                assert_eq!(machine, "ghost");
                assert!(reason.contains("Host does not exist"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_name_issues_no_command() {
        let runner = ScriptedRunner::new();
        let tools = Toolchain::default();
        let switch = ContextSwitch::new(&runner, &tools);

        assert!(switch.switch_to("  ").await.is_err());
        assert_eq!(runner.call_count(), 0);
    }
}
