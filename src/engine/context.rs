//! Per-invocation schematic context.

use crate::engine::Engine;
use crate::error::{SchematicError, TaskError};
use crate::logging::Logger;
use crate::tasks::{TaskConfiguration, TaskId, TaskScheduler};
use crate::tree::MergeStrategy;
use std::fmt;
use std::sync::Arc;

/// Everything a rule can reach besides its tree.
///
/// Nested schematic calls get a child context: same engine and task scheduler,
/// a longer invocation stack, and a child logger.
#[derive(Clone)]
pub struct SchematicContext {
    engine: Arc<Engine>,
    collection: Option<String>,
    schematic: Option<String>,
    logger: Logger,
    scheduler: TaskScheduler,
    /// (collection, schematic) pairs currently running, outermost first.
    stack: Vec<(String, String)>,
    strategy: MergeStrategy,
}

impl SchematicContext {
    pub(crate) fn root(engine: Arc<Engine>) -> Self {
        let strategy = engine.config().default_merge_strategy;
        Self {
            engine,
            collection: None,
            schematic: None,
            logger: Logger::new("graft"),
            scheduler: TaskScheduler::new(),
            stack: Vec::new(),
            strategy,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Collection of the running schematic; `None` outside any schematic.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn schematic(&self) -> Option<&str> {
        self.schematic.as_deref()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn stack(&self) -> &[(String, String)] {
        &self.stack
    }

    /// Strategy used when a merge asks for `MergeStrategy::Default`.
    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Schedule a task to run after the final tree is committed.
    pub fn add_task(&self, configuration: TaskConfiguration) -> Result<TaskId, TaskError> {
        let id = self.scheduler.add_task(
            configuration,
            self.collection.clone(),
            self.schematic.clone(),
        )?;
        self.logger.debug(format!("Scheduled task {}", id));
        Ok(id)
    }

    /// Context for a nested call; fails if the pair is already on the stack.
    pub(crate) fn child(&self, collection: &str, schematic: &str) -> Result<Self, SchematicError> {
        let running = self
            .stack
            .iter()
            .any(|(c, s)| c == collection && s == schematic);
        if running {
            return Err(SchematicError::CyclicDependency {
                collection: collection.to_string(),
                schematic: schematic.to_string(),
                stack: self.describe_stack(),
            });
        }
        let mut stack = self.stack.clone();
        stack.push((collection.to_string(), schematic.to_string()));
        Ok(Self {
            engine: self.engine.clone(),
            collection: Some(collection.to_string()),
            schematic: Some(schematic.to_string()),
            logger: self
                .logger
                .create_child(&format!("{}:{}", collection, schematic)),
            scheduler: self.scheduler.clone(),
            stack,
            strategy: self.strategy,
        })
    }

    fn describe_stack(&self) -> String {
        self.stack
            .iter()
            .map(|(c, s)| format!("{}:{}", c, s))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl fmt::Debug for SchematicContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchematicContext")
            .field("collection", &self.collection)
            .field("schematic", &self.schematic)
            .field("logger", &self.logger.name())
            .field("stack", &self.stack)
            .field("strategy", &self.strategy)
            .finish()
    }
}
