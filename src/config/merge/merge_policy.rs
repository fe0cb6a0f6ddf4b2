//! Merge rules: built-in defaults every other source overrides.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("engine.default_merge_strategy", "default")?
        .set_default("engine.allow_private", false)?
        .set_default("tasks.max_concurrency", 4)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("workflow.dry_run", false)
}
