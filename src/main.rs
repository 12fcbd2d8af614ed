//! swarmctl - Docker Swarm provisioning on docker-machine hosts
//!
//! This is the main CLI entry point for swarmctl.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use swarmctl::config::SwarmSettings;
use swarmctl::exec::ProcessRunner;
use swarmctl::machine::MAX_WORKERS;
use swarmctl::node_info::{NodeInfoClient, NodeInfoServer};
use swarmctl::SwarmOrchestrator;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// swarmctl - provision, scale and tear down a Docker Swarm
#[derive(Parser)]
#[command(name = "swarmctl")]
#[command(author = "Evoker Industries")]
#[command(version)]
#[command(about = "Provision, scale and tear down a Docker Swarm on docker-machine hosts", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Settings file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// docker-machine driver
    #[arg(long, global = true)]
    driver: Option<String>,

    /// Manager machine name
    #[arg(long, global = true)]
    manager: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision machines, form the swarm, create the registry and deploy the stack
    Init {
        /// Number of worker nodes
        #[arg(short, long, value_parser = parse_worker_count)]
        workers: usize,
        /// Compose file to deploy
        #[arg(long)]
        compose_file: Option<PathBuf>,
    },

    /// Scale a service
    Scale {
        /// Service ID or name (defaults to the configured stack service)
        #[arg(short, long)]
        service: Option<String>,
        /// Number of replicas
        replicas: String,
    },

    /// Make every node leave the swarm
    #[command(name = "remove-all")]
    RemoveAll {
        /// Also destroy the machines
        #[arg(long)]
        destroy: bool,
    },

    /// Run the node-info HTTP service
    #[command(name = "node-info")]
    NodeInfo {
        /// Listen address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Query a node-info service
    Probe {
        /// Base URL, e.g. http://192.168.99.100:8000
        url: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = SwarmSettings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(driver) = cli.driver {
        settings.driver = driver;
    }
    if let Some(manager) = cli.manager {
        settings.manager_name = manager;
    }

    match cli.command {
        Commands::Init {
            workers,
            compose_file,
        } => {
            if let Some(path) = compose_file {
                settings.stack.compose_file = Some(path);
            }
            settings.validate()?;

            let orchestrator = orchestrator(settings);
            let report = orchestrator.init(workers).await?;
            println!(
                "Swarm ready: manager {} at {}, {} workers",
                report.manager.name(),
                report.manager_ip,
                report.workers.len()
            );
        }

        Commands::Scale { service, replicas } => {
            settings.validate()?;
            orchestrator(settings)
                .scale(service.as_deref(), &replicas)
                .await?;
        }

        Commands::RemoveAll { destroy } => {
            settings.validate()?;
            let workers = orchestrator(settings).remove_all(destroy).await?;
            println!("Removed {} workers and the manager", workers.len());
        }

        Commands::NodeInfo { bind } => {
            if let Some(bind) = bind {
                settings.node_info.bind = bind;
            }
            NodeInfoServer::new(&settings.node_info).run().await?;
        }

        Commands::Probe { url } => {
            let client = NodeInfoClient::new(&url)?;
            let healthy = client.health().await?;
            info!("{} healthy: {}", url, healthy);
            println!("health:    {}", if healthy { "OK" } else { "FAIL" });
            println!("node ip:   {}", client.node_ip().await?);
            println!("caller ip: {}", client.caller_ip().await?);
            println!("node time: {}", client.node_time().await?);
        }
    }

    Ok(())
}

fn parse_worker_count(value: &str) -> Result<usize, String> {
    let count: usize = value.parse().map_err(|e: std::num::ParseIntError| e.to_string())?;
    if count > MAX_WORKERS {
        return Err(format!("at most {} workers are supported", MAX_WORKERS));
    }
    Ok(count)
}

fn orchestrator(settings: SwarmSettings) -> SwarmOrchestrator<ProcessRunner> {
    let runner = ProcessRunner::new().with_timeout(settings.command_timeout());
    SwarmOrchestrator::new(runner, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_is_bounded() {
        let cli = Cli::try_parse_from(["swarmctl", "init", "--workers", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Init { workers: 3, .. }));

        let too_many = (MAX_WORKERS + 1).to_string();
        assert!(Cli::try_parse_from(["swarmctl", "init", "--workers", too_many.as_str()]).is_err());
        assert!(Cli::try_parse_from(["swarmctl", "init", "--workers", "18446744073709551615"]).is_err());
    }
}
