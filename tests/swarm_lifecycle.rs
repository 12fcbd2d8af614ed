//! End-to-end swarm lifecycle against a scripted docker-machine/docker

use std::path::PathBuf;
use swarmctl::exec::testing::{synthetic_ip, Reply, ScriptedRunner};
use swarmctl::machine::ProvisionOutcome;
use swarmctl::{SwarmError, SwarmOrchestrator, SwarmSettings};

fn settings() -> SwarmSettings {
    let mut settings = SwarmSettings::default();
    settings.stack.compose_file = Some(PathBuf::from("/srv/docker-compose.yml"));
    settings
}

#[tokio::test]
async fn test_rerun_init_against_existing_cluster() {
    let runner = ScriptedRunner::new();
    runner
        .on("docker-machine create", Reply::Fail("Host already exists".into()))
        .on("docker-machine start", Reply::Fail("Host is already running".into()))
        .on("docker-machine status", Reply::Ok("Running\n".into()))
        .on(
            "docker swarm init",
            Reply::Fail("This node is already part of a swarm.".into()),
        )
        .on("docker swarm join-token worker -q", Reply::Ok("SWMTKN-1-again\n".into()))
        .on(
            "docker service create",
            Reply::Fail("service registry already exists".into()),
        );
    let orchestrator = SwarmOrchestrator::new(runner, settings());

    let report = orchestrator.init(3).await.unwrap();

    assert_eq!(report.manager.outcome, ProvisionOutcome::AlreadyRunning);
    assert!(report
        .workers
        .iter()
        .all(|w| w.outcome == ProvisionOutcome::AlreadyRunning));
    assert!(orchestrator
        .runner()
        .call_lines()
        .iter()
        .any(|l| l == "[manager] docker stack deploy --compose-file /srv/docker-compose.yml stack"));
}

#[tokio::test]
async fn test_unreachable_worker_fails_at_join() {
    let runner = ScriptedRunner::new();
    runner
        .on("docker-machine create --driver virtualbox worker1", Reply::Fail("no space".into()))
        .on("docker-machine start worker1", Reply::Fail("not found".into()))
        .on("docker-machine status worker1", Reply::Fail("not found".into()))
        .on("docker-machine env --shell bash worker1", Reply::Fail("Host does not exist".into()))
        .on("docker swarm join-token", Reply::Ok("SWMTKN-1-t\n".into()));
    let orchestrator = SwarmOrchestrator::new(runner, settings());

    let err = orchestrator.init(2).await.unwrap_err();

    match err {
        SwarmError::Join { worker, .. } => assert_eq!(worker, "worker1"),
        other => panic!("unexpected error: {other}"),
    }
    let lines = orchestrator.runner().call_lines();
    assert!(lines.iter().any(|l| l.starts_with("[worker2] docker swarm join")));
    assert!(!lines.iter().any(|l| l.contains("docker service create")));
}

#[tokio::test]
async fn test_init_then_remove_all() {
    let runner = ScriptedRunner::new();
    runner
        .on("docker swarm join-token", Reply::Ok("SWMTKN-1-t\n".into()))
        .on_machine(
            "manager",
            "docker node ls",
            Reply::Ok("manager\nworker2\nworker1\n".into()),
        );
    let orchestrator = SwarmOrchestrator::new(runner, settings());

    let report = orchestrator.init(2).await.unwrap();
    assert_eq!(report.manager_ip, synthetic_ip("manager"));

    let removed = orchestrator.remove_all(true).await.unwrap();
    assert_eq!(removed, vec!["worker2", "worker1"]);

    let removals: Vec<String> = orchestrator
        .runner()
        .call_lines()
        .into_iter()
        .filter(|l| l.starts_with("docker-machine rm"))
        .collect();
    assert_eq!(
        removals,
        vec![
            "docker-machine rm -y worker2",
            "docker-machine rm -y worker1",
            "docker-machine rm -y manager",
        ]
    );
}

#[tokio::test]
async fn test_scale_reports_engine_error() {
    let runner = ScriptedRunner::new();
    runner.on(
        "docker service scale",
        Reply::Fail("service stack_web not found".into()),
    );
    let orchestrator = SwarmOrchestrator::new(runner, settings());

    let err = orchestrator.scale(None, "2").await.unwrap_err();
    assert_eq!(err.stderr(), Some("service stack_web not found"));
}
