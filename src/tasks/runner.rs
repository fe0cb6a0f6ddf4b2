//! Task runner: executes finalized tasks level by level after commit.

use crate::error::TaskError;
use crate::tasks::scheduler::{topological_order, TaskId, TaskInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Performs one kind of task.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &TaskInfo) -> anyhow::Result<()>;
}

/// Executors by task name.
#[derive(Clone, Default)]
pub struct TaskExecutorRegistry {
    executors: HashMap<String, Arc<dyn TaskExecutor>>,
}

impl TaskExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn TaskExecutor>) {
        self.executors.insert(name.into(), executor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.get(name).cloned()
    }

    pub fn get_or_error(&self, name: &str) -> Result<Arc<dyn TaskExecutor>, TaskError> {
        self.get(name)
            .ok_or_else(|| TaskError::UnknownExecutor(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.executors.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Task runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRunnerConfig {
    /// Maximum tasks running at once within a level
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-task timeout; `None` waits indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for TaskRunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub id: TaskId,
    pub name: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub id: TaskId,
    pub name: String,
    pub message: String,
}

/// What happened to every task of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub completed: Vec<TaskOutcome>,
    pub failed: Vec<TaskFailure>,
    /// Tasks not run because a dependency failed or was skipped.
    pub skipped: Vec<TaskId>,
}

impl TaskRunReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            completed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Runs tasks against a registry of executors.
pub struct TaskRunner {
    registry: Arc<TaskExecutorRegistry>,
    config: TaskRunnerConfig,
}

impl TaskRunner {
    pub fn new(registry: Arc<TaskExecutorRegistry>) -> Self {
        Self::with_config(registry, TaskRunnerConfig::default())
    }

    pub fn with_config(registry: Arc<TaskExecutorRegistry>, config: TaskRunnerConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &TaskRunnerConfig {
        &self.config
    }

    /// Fail with `UnknownExecutor` for the first task nothing can run.
    pub fn ensure_executors(&self, tasks: &[TaskInfo]) -> Result<(), TaskError> {
        for task in tasks {
            self.registry.get_or_error(task.name())?;
        }
        Ok(())
    }

    /// Execute `tasks` in dependency order.
    ///
    /// Fails up front with `UnknownExecutor` if any task has no executor; after
    /// that, task failures are recorded in the report and only block the failed
    /// task's dependents.
    pub async fn run(&self, tasks: Vec<TaskInfo>) -> Result<TaskRunReport, TaskError> {
        self.ensure_executors(&tasks)?;

        let mut report = TaskRunReport::start();
        let levels = group_levels(topological_order(tasks));
        info!(levels = levels.len(), "Running tasks");

        let mut blocked: HashSet<TaskId> = HashSet::new();
        for (level_index, level) in levels.into_iter().enumerate() {
            let (runnable, skipped): (Vec<TaskInfo>, Vec<TaskInfo>) =
                level.into_iter().partition(|task| {
                    !task
                        .configuration
                        .dependencies
                        .iter()
                        .any(|d| blocked.contains(d))
                });
            for task in skipped {
                warn!(task_id = task.id, name = task.name(), "Skipping task: a dependency did not complete");
                blocked.insert(task.id);
                report.skipped.push(task.id);
            }

            let mut results: Vec<(TaskInfo, Duration, Result<(), TaskError>)> =
                stream::iter(runnable.into_iter().map(|task| self.execute_one(task)))
                    .buffer_unordered(self.config.max_concurrency.max(1))
                    .collect()
                    .await;
            results.sort_by_key(|(task, _, _)| task.id);

            for (task, elapsed, result) in results {
                match result {
                    Ok(()) => report.completed.push(TaskOutcome {
                        id: task.id,
                        name: task.name().to_string(),
                        duration_ms: elapsed.as_millis() as u64,
                    }),
                    Err(err) => {
                        warn!(task_id = task.id, name = task.name(), error = %err, "Task failed");
                        blocked.insert(task.id);
                        report.failed.push(TaskFailure {
                            id: task.id,
                            name: task.name().to_string(),
                            message: err.to_string(),
                        });
                    }
                }
            }
            info!(level = level_index, "Task level finished");
        }

        report.finished_at = Utc::now();
        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Tasks finished"
        );
        Ok(report)
    }

    async fn execute_one(&self, task: TaskInfo) -> (TaskInfo, Duration, Result<(), TaskError>) {
        let started = Instant::now();
        let executor = match self.registry.get_or_error(task.name()) {
            Ok(executor) => executor,
            Err(err) => return (task, started.elapsed(), Err(err)),
        };
        let failed = |err: anyhow::Error| TaskError::Failed {
            task: task.name().to_string(),
            message: format!("{:#}", err),
        };
        let result = match self.config.timeout_secs {
            Some(seconds) => {
                match tokio::time::timeout(Duration::from_secs(seconds), executor.execute(&task))
                    .await
                {
                    Ok(result) => result.map_err(failed),
                    Err(_) => Err(TaskError::TimedOut {
                        task: task.name().to_string(),
                        seconds,
                    }),
                }
            }
            None => executor.execute(&task).await.map_err(failed),
        };
        (task, started.elapsed(), result)
    }
}

/// Split topologically ordered tasks into levels: a task's level is one past its
/// deepest dependency.
fn group_levels(ordered: Vec<TaskInfo>) -> Vec<Vec<TaskInfo>> {
    let mut depth: HashMap<TaskId, usize> = HashMap::new();
    let mut levels: BTreeMap<usize, Vec<TaskInfo>> = BTreeMap::new();
    for task in ordered {
        let level = task
            .configuration
            .dependencies
            .iter()
            .filter_map(|d| depth.get(d))
            .map(|d| d + 1)
            .max()
            .unwrap_or(0);
        depth.insert(task.id, level);
        levels.entry(level).or_default().push(task);
    }
    levels.into_values().collect()
}
