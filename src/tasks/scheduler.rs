//! Task scheduler shared by every context of one run.

use crate::error::TaskError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use tracing::debug;

pub type TaskId = usize;

/// What to run, with which options, after which other tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfiguration {
    /// Executor name.
    pub name: String,

    #[serde(default)]
    pub options: Value,

    #[serde(default)]
    pub dependencies: Vec<TaskId>,
}

impl TaskConfiguration {
    pub fn new(name: impl Into<String>, options: Value) -> Self {
        Self {
            name: name.into(),
            options,
            dependencies: Vec::new(),
        }
    }

    pub fn depends_on(mut self, ids: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies.extend(ids);
        self
    }
}

/// A scheduled task and the schematic that recorded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub configuration: TaskConfiguration,
    pub collection: Option<String>,
    pub schematic: Option<String>,
}

impl TaskInfo {
    pub fn name(&self) -> &str {
        &self.configuration.name
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    next_id: TaskId,
    pending: Vec<TaskInfo>,
}

/// Cloning yields another handle on the same queue.
#[derive(Debug, Clone, Default)]
pub struct TaskScheduler {
    state: Arc<Mutex<SchedulerState>>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task. Every dependency must name a task already pending here.
    pub fn add_task(
        &self,
        configuration: TaskConfiguration,
        collection: Option<String>,
        schematic: Option<String>,
    ) -> Result<TaskId, TaskError> {
        let mut state = self.state.lock();
        for dependency in &configuration.dependencies {
            if !state.pending.iter().any(|task| task.id == *dependency) {
                return Err(TaskError::UnknownDependency {
                    task: configuration.name.clone(),
                    dependency: *dependency,
                });
            }
        }
        let id = state.next_id;
        state.next_id += 1;
        debug!(
            task_id = id,
            name = %configuration.name,
            dependencies = ?configuration.dependencies,
            "Scheduled task"
        );
        state.pending.push(TaskInfo {
            id,
            configuration,
            collection,
            schematic,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the queue in dependency order, lowest id first among ready tasks.
    pub fn finalize(&self) -> Vec<TaskInfo> {
        let pending = std::mem::take(&mut self.state.lock().pending);
        topological_order(pending)
    }
}

/// Kahn's algorithm over task ids. Dependencies outside `tasks` are ignored.
pub(crate) fn topological_order(tasks: Vec<TaskInfo>) -> Vec<TaskInfo> {
    let mut by_id: HashMap<TaskId, TaskInfo> = tasks.into_iter().map(|t| (t.id, t)).collect();
    let mut waiting_on: HashMap<TaskId, usize> = HashMap::new();
    let mut dependents: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for task in by_id.values() {
        let known: Vec<TaskId> = task
            .configuration
            .dependencies
            .iter()
            .copied()
            .filter(|d| by_id.contains_key(d))
            .collect();
        waiting_on.insert(task.id, known.len());
        for dependency in known {
            dependents.entry(dependency).or_default().push(task.id);
        }
    }

    let mut ready: BinaryHeap<Reverse<TaskId>> = waiting_on
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| Reverse(*id))
        .collect();
    let mut ordered = Vec::with_capacity(by_id.len());
    while let Some(Reverse(id)) = ready.pop() {
        for dependent in dependents.remove(&id).unwrap_or_default() {
            if let Some(count) = waiting_on.get_mut(&dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }
        if let Some(task) = by_id.remove(&id) {
            ordered.push(task);
        }
    }
    ordered
}
