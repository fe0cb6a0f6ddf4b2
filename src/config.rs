//! Configuration System
//!
//! Layered configuration for the engine, the task runner, logging and workflows.
//! Sources, lowest precedence first: built-in defaults, the global config file,
//! the workspace config files, then `GRAFT_*` environment variables.

use crate::engine::EngineConfig;
use crate::error::SchematicError;
use crate::logging::LoggingConfig;
use crate::tasks::TaskRunnerConfig;
use config::{ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

mod merge {
    pub mod merge_policy;
}

mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraftConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub tasks: TaskRunnerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// Workflow settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Report changes instead of committing them; tasks are not run
    #[serde(default)]
    pub dry_run: bool,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Tasks(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Tasks(msg) => write!(f, "Tasks: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl GraftConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.tasks.max_concurrency == 0 {
            errors.push(ValidationError::Tasks(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.tasks.timeout_secs == Some(0) {
            errors.push(ValidationError::Tasks(
                "timeout_secs must be positive when set".to_string(),
            ));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads [`GraftConfig`] from its layered sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    workspace_root: PathBuf,
    include_global: bool,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            include_global: true,
            env_prefix: "GRAFT".to_string(),
        }
    }

    /// Skip the per-user global config file.
    pub fn without_global(mut self) -> Self {
        self.include_global = false;
        self
    }

    /// Read overrides from `{prefix}_SECTION__KEY` instead of `GRAFT_SECTION__KEY`.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load with every source enabled.
    pub fn load(workspace_root: &Path) -> Result<GraftConfig, ConfigError> {
        Self::new(workspace_root).build()
    }

    pub fn build(&self) -> Result<GraftConfig, ConfigError> {
        let mut builder = merge::merge_policy::builder_with_defaults()?;
        if self.include_global {
            builder = sources::global_file::add_to_builder(builder)?;
        }
        builder = sources::workspace_file::add_to_builder(builder, &self.workspace_root)?;
        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        let config: GraftConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %self.workspace_root.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load and validate, folding every validation error into one message.
    pub fn load_validated(&self) -> Result<GraftConfig, SchematicError> {
        let config = self.build()?;
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            SchematicError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(config)
    }
}
