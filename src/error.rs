//! Error types for the graft engine.

use std::fmt;
use thiserror::Error;

/// Errors raised by virtual tree operations, path handling and hosts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Path does not exist: {0}")]
    FileDoesNotExist(String),

    #[error("Content of {0} changed since the update was started")]
    ContentHasMutated(String),

    #[error("Cannot place {path}: it would overlap the existing file {existing}")]
    PathConflict { path: String, existing: String },

    #[error("Merge conflict on {0}")]
    MergeConflict(String),

    #[error("Edit out of range on {path}: offset {offset}, content length {len}")]
    UpdateOutOfRange {
        path: String,
        offset: usize,
        len: usize,
    },

    #[error("Overlapping removal on {path} at offset {offset} (length {length})")]
    OverlappingRemoval {
        path: String,
        offset: usize,
        length: usize,
    },

    #[error("Host error on {path}: {message}")]
    Host { path: String, message: String },
}

impl TreeError {
    pub(crate) fn host(path: &str, err: impl fmt::Display) -> Self {
        TreeError::Host {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

/// One field-level violation of a schematic's option schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionViolation {
    pub field: String,
    pub message: String,
}

impl fmt::Display for OptionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "'{}': {}", self.field, self.message)
        }
    }
}

/// Errors raised while running deferred tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: String, dependency: usize },

    #[error("No executor registered for task '{0}'")]
    UnknownExecutor(String),

    #[error("Task {task} failed: {message}")]
    Failed { task: String, message: String },

    #[error("Task {task} timed out after {seconds}s")]
    TimedOut { task: String, seconds: u64 },
}

/// Errors raised by engine resolution, schematic invocation and rule execution.
#[derive(Debug, Error)]
pub enum SchematicError {
    #[error("Invalid options for schematic '{schematic}':\n{}", format_violations(.violations))]
    InvalidOptions {
        schematic: String,
        violations: Vec<OptionViolation>,
    },

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Unknown schematic '{schematic}' in collection '{collection}'")]
    UnknownSchematic {
        collection: String,
        schematic: String,
    },

    #[error("Cyclic schematic invocation: {collection}:{schematic} is already running ({stack})")]
    CyclicDependency {
        collection: String,
        schematic: String,
        stack: String,
    },

    #[error("Invalid collection manifest '{collection}': {message}")]
    InvalidManifest { collection: String, message: String },

    #[error("Unknown rule factory '{reference}' in collection '{collection}'")]
    UnknownFactory {
        collection: String,
        reference: String,
    },

    #[error("Invalid schema '{reference}': {message}")]
    InvalidSchema { reference: String, message: String },

    #[error("Rule completed without producing a tree")]
    EmptyRuleResult,

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Rule failed: {0}")]
    Rule(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for SchematicError {
    fn from(err: config::ConfigError) -> Self {
        SchematicError::ConfigError(err.to_string())
    }
}

fn format_violations(violations: &[OptionViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}
