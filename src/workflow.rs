//! Workflow
//!
//! One call from options to committed files: build a tree over the workflow's
//! host, run a schematic on it, then commit and execute the recorded tasks, or in
//! dry-run mode only describe what would change.

use crate::config::GraftConfig;
use crate::engine::{Engine, EngineHost};
use crate::error::SchematicError;
use crate::host::Host;
use crate::sink::{CommitReport, DryRunEvent, DryRunSink, HostSink};
use crate::tasks::{TaskExecutorRegistry, TaskInfo, TaskRunReport, TaskRunner};
use crate::tree::Tree;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// What a workflow run did.
#[derive(Debug)]
pub struct WorkflowOutcome {
    /// Fingerprint of the final tree.
    pub fingerprint: String,
    /// Net changes of the final tree against the host.
    pub events: Vec<DryRunEvent>,
    /// `None` in dry-run mode.
    pub commit: Option<CommitReport>,
    /// Tasks the schematic recorded, in execution order.
    pub scheduled: Vec<TaskInfo>,
    /// `None` in dry-run mode.
    pub tasks: Option<TaskRunReport>,
}

pub struct Workflow {
    engine: Arc<Engine>,
    host: Arc<dyn Host>,
    runner: TaskRunner,
    dry_run: bool,
}

impl Workflow {
    pub fn new(engine: Arc<Engine>, host: Arc<dyn Host>, runner: TaskRunner) -> Self {
        Self {
            engine,
            host,
            runner,
            dry_run: false,
        }
    }

    /// Wire a workflow from configuration.
    pub fn from_config(
        engine_host: Arc<dyn EngineHost>,
        host: Arc<dyn Host>,
        executors: Arc<TaskExecutorRegistry>,
        config: &GraftConfig,
    ) -> Self {
        let engine = Engine::with_config(engine_host, config.engine.clone());
        let runner = TaskRunner::with_config(executors, config.tasks.clone());
        Self::new(engine, host, runner).with_dry_run(config.workflow.dry_run)
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run `collection:schematic` against the host.
    ///
    /// Nothing is written if the schematic fails. Task failures are reported in
    /// the outcome; they never undo the commit.
    #[instrument(skip(self, options), fields(dry_run = self.dry_run))]
    pub async fn execute(
        &self,
        collection: &str,
        schematic: &str,
        options: Value,
    ) -> Result<WorkflowOutcome, SchematicError> {
        let tree = Tree::from_host(self.host.clone());
        let outcome = self.engine.run(collection, schematic, options, tree).await?;
        let fingerprint = outcome.tree.fingerprint()?;
        let events = DryRunSink::events(&outcome.tree)?;

        if self.dry_run {
            info!(changes = events.len(), "Dry run finished");
            return Ok(WorkflowOutcome {
                fingerprint,
                events,
                commit: None,
                scheduled: outcome.tasks,
                tasks: None,
            });
        }

        self.runner.ensure_executors(&outcome.tasks)?;
        let commit = HostSink::commit(&outcome.tree, self.host.as_ref())?;
        let report = self.runner.run(outcome.tasks.clone()).await?;
        Ok(WorkflowOutcome {
            fingerprint,
            events,
            commit: Some(commit),
            scheduled: outcome.tasks,
            tasks: Some(report),
        })
    }
}
