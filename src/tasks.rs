//! Deferred Tasks
//!
//! Schematics record side effects (installing packages, running formatters) as
//! tasks while they run. Nothing executes until the final tree has been committed;
//! the runner then executes them in dependency order.

pub mod runner;
pub mod scheduler;

pub use runner::{
    TaskExecutor, TaskExecutorRegistry, TaskFailure, TaskOutcome, TaskRunReport, TaskRunner,
    TaskRunnerConfig,
};
pub use scheduler::{TaskConfiguration, TaskId, TaskInfo, TaskScheduler};
