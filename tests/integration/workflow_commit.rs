//! End-to-end workflows: schematic run, commit, then deferred tasks.

use super::test_utils::{engine, engine_host, RecordingExecutor, COLLECTION};
use graft::config::{GraftConfig, WorkflowConfig};
use graft::host::{DiskHost, MemoryHost};
use graft::tasks::{TaskExecutorRegistry, TaskRunner};
use graft::{DryRunEvent, SchematicError, TaskError, Workflow};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn registry(executor: Arc<RecordingExecutor>) -> Arc<TaskExecutorRegistry> {
    let mut registry = TaskExecutorRegistry::new();
    registry.register("install", executor.clone());
    registry.register("format", executor);
    Arc::new(registry)
}

#[tokio::test]
async fn commit_writes_files_then_runs_tasks() {
    let host = Arc::new(MemoryHost::with_files([("/Cargo.toml", "[workspace]")]).unwrap());
    let executor = Arc::new(RecordingExecutor::default());
    let workflow = Workflow::new(engine(), host.clone(), TaskRunner::new(registry(executor.clone())));

    let outcome = workflow
        .execute(COLLECTION, "component", json!({ "name": "Nav" }))
        .await
        .unwrap();

    let commit = outcome.commit.unwrap();
    assert_eq!(commit.created, vec!["/src/Nav.css", "/src/Nav.rs"]);
    assert!(commit.updated.is_empty() && commit.deleted.is_empty());
    assert_eq!(
        host.snapshot().keys().cloned().collect::<Vec<_>>(),
        vec!["/Cargo.toml", "/src/Nav.css", "/src/Nav.rs"]
    );

    let report = outcome.tasks.unwrap();
    assert!(report.is_success());
    assert_eq!(*executor.ran.lock(), vec!["install", "format"]);
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let host = Arc::new(MemoryHost::with_files([("/Cargo.toml", "[workspace]")]).unwrap());
    let executor = Arc::new(RecordingExecutor::default());
    let workflow = Workflow::new(engine(), host.clone(), TaskRunner::new(registry(executor.clone())))
        .with_dry_run(true);

    let outcome = workflow
        .execute(COLLECTION, "component", json!({ "name": "Nav", "style": "scss" }))
        .await
        .unwrap();

    assert!(outcome.commit.is_none());
    assert!(outcome.tasks.is_none());
    assert_eq!(outcome.scheduled.len(), 2);
    assert_eq!(
        outcome.events,
        vec![
            DryRunEvent::Create {
                path: "/src/Nav.rs".to_string(),
                size: "pub struct Nav;\n".len(),
            },
            DryRunEvent::Create {
                path: "/src/Nav.scss".to_string(),
                size: 0,
            },
        ]
    );
    assert_eq!(host.snapshot().len(), 1);
    assert!(executor.ran.lock().is_empty());
}

#[tokio::test]
async fn failing_schematic_commits_nothing() {
    let host = Arc::new(MemoryHost::with_files([("/src/Nav.rs", "taken")]).unwrap());
    let executor = Arc::new(RecordingExecutor::default());
    let workflow = Workflow::new(engine(), host.clone(), TaskRunner::new(registry(executor.clone())));

    let err = workflow
        .execute(COLLECTION, "component", json!({ "name": "Nav" }))
        .await
        .unwrap_err();
    assert!(matches!(err, SchematicError::Tree(_)));
    assert_eq!(host.snapshot().len(), 1);
    assert!(executor.ran.lock().is_empty());
}

#[tokio::test]
async fn missing_executor_is_caught_before_the_commit() {
    let host = Arc::new(MemoryHost::new());
    let mut partial = TaskExecutorRegistry::new();
    partial.register("install", Arc::new(RecordingExecutor::default()));
    let workflow = Workflow::new(engine(), host.clone(), TaskRunner::new(Arc::new(partial)));

    let err = workflow
        .execute(COLLECTION, "component", json!({ "name": "Nav" }))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchematicError::Task(TaskError::UnknownExecutor(ref name)) if name == "format"
    ));
    assert!(host.snapshot().is_empty());
}

#[tokio::test]
async fn skipping_tasks_keeps_the_commit() {
    let host = Arc::new(MemoryHost::new());
    let workflow = Workflow::new(
        engine(),
        host.clone(),
        TaskRunner::new(Arc::new(TaskExecutorRegistry::new())),
    );
    let outcome = workflow
        .execute(COLLECTION, "component", json!({ "name": "Nav", "skipInstall": true }))
        .await
        .unwrap();
    assert!(outcome.scheduled.is_empty());
    assert!(outcome.tasks.unwrap().completed.is_empty());
    assert_eq!(host.snapshot().len(), 2);
}

#[tokio::test]
async fn workflow_commits_to_disk() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
    let host = Arc::new(DiskHost::new(dir.path()).unwrap());
    let executor = Arc::new(RecordingExecutor::default());

    let config = GraftConfig {
        workflow: WorkflowConfig { dry_run: false },
        ..GraftConfig::default()
    };
    let workflow = Workflow::from_config(
        Arc::new(engine_host()),
        host,
        registry(executor),
        &config,
    );
    assert!(!workflow.is_dry_run());

    let outcome = workflow
        .execute(COLLECTION, "module", json!({ "name": "billing" }))
        .await
        .unwrap();
    assert_eq!(outcome.commit.unwrap().total(), 3);
    assert_eq!(
        fs::read_to_string(dir.path().join("src/billing/mod.rs")).unwrap(),
        "// billing\n"
    );
    assert!(dir.path().join("src/billing.css").is_file());
    assert_eq!(
        fs::read_to_string(dir.path().join("Cargo.toml")).unwrap(),
        "[package]\n"
    );
}

#[tokio::test]
async fn fingerprint_matches_a_dry_run_of_the_same_input() {
    let options = json!({ "name": "Nav" });
    let dry = Workflow::new(
        engine(),
        Arc::new(MemoryHost::new()),
        TaskRunner::new(Arc::new(TaskExecutorRegistry::new())),
    )
    .with_dry_run(true)
    .execute(COLLECTION, "component", options.clone())
    .await
    .unwrap();

    let executor = Arc::new(RecordingExecutor::default());
    let real = Workflow::new(engine(), Arc::new(MemoryHost::new()), TaskRunner::new(registry(executor)))
        .execute(COLLECTION, "component", options)
        .await
        .unwrap();

    assert_eq!(dry.fingerprint, real.fingerprint);
}
