// ABOUTME: Docker runtime integration tests
// ABOUTME: Run a real container when a Docker daemon is reachable, otherwise skip

use hill_sandbox::{ContainerConfig, ContainerRuntime, DockerRuntime, RuntimeError};
use std::time::Duration;

async fn docker_or_skip() -> Option<DockerRuntime> {
    let runtime = match DockerRuntime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            println!("Skipping: Docker client unavailable: {}", e);
            return None;
        }
    };

    match runtime.is_available().await {
        Ok(true) => Some(runtime),
        _ => {
            println!("Skipping: Docker daemon not responding");
            None
        }
    }
}

/// An unreachable daemon must surface as an error, never a panic
#[tokio::test]
async fn test_runtime_unavailable_is_graceful() {
    match DockerRuntime::new() {
        Ok(runtime) => {
            let _ = runtime.is_available().await.unwrap();
        }
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains("Connection") || error_msg.contains("Docker"),
                "Error message should be informative: {}",
                error_msg
            );
        }
    }
}

#[tokio::test]
async fn test_status_of_unknown_container() {
    let Some(runtime) = docker_or_skip().await else {
        return;
    };

    let result = runtime.status("hill-no-such-container").await;
    assert!(matches!(result, Err(RuntimeError::NotFound(_))));
}

#[tokio::test]
async fn test_run_collect_logs_and_remove() {
    let Some(runtime) = docker_or_skip().await else {
        return;
    };

    let config = ContainerConfig {
        image: "alpine:latest".to_string(),
        name: format!("hill-test-{}", std::process::id()),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo hello from hill".to_string(),
        ]),
        ..Default::default()
    };

    let id = runtime.run(&config).await.unwrap();

    let mut terminal = false;
    for _ in 0..100 {
        if runtime.status(&id).await.unwrap().is_terminal() {
            terminal = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(terminal, "container should exit on its own");

    let logs = runtime.logs(&id).await.unwrap();
    assert!(logs.contains("hello from hill"));

    runtime.remove(&id, true).await.unwrap();
    assert!(matches!(
        runtime.status(&id).await,
        Err(RuntimeError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_start_failure_leaves_no_container() {
    let Some(runtime) = docker_or_skip().await else {
        return;
    };

    let name = format!("hill-test-start-failure-{}", std::process::id());
    let config = ContainerConfig {
        image: "alpine:latest".to_string(),
        name: name.clone(),
        command: Some(vec!["/no/such/binary".to_string()]),
        ..Default::default()
    };

    let result = runtime.run(&config).await;
    assert!(result.is_err(), "starting a missing executable should fail");

    // The failed container must not linger under its name
    assert!(matches!(
        runtime.status(&name).await,
        Err(RuntimeError::NotFound(_))
    ));
}
