//! Graft: Staged Virtual File Trees and Composable Rules
//!
//! Transformations of a project's source tree are staged in a virtual [`Tree`],
//! composed from [`rules`], validated and invoked through the schematic
//! [`engine`], and only written to real storage when a [`sink`] commits them.
//! Side effects that must follow the write are recorded as [`tasks`].

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod logging;
pub mod rules;
pub mod sink;
pub mod tasks;
pub mod tree;
pub mod workflow;

pub use config::{ConfigLoader, GraftConfig};
pub use engine::{Engine, EngineConfig, EngineHost, ManifestEngineHost, SchematicContext};
pub use error::{OptionViolation, SchematicError, TaskError, TreeError};
pub use host::{Content, DiskHost, FilteredHost, Host, MemoryHost};
pub use rules::{Rule, RuleOutput, RuleRef, Source, SourceRef};
pub use sink::{CommitReport, DryRunEvent, DryRunSink, HostSink};
pub use tasks::{TaskConfiguration, TaskRunner, TaskScheduler};
pub use tree::{Action, MergeStrategy, Tree, UpdateRecorder};
pub use workflow::{Workflow, WorkflowOutcome};
