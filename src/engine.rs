//! Schematic Engine
//!
//! The engine owns a registry of loaded collections and runs schematics from
//! them. There is no global registry: every engine is an explicit value, shared
//! through `Arc` and reachable from each [`SchematicContext`].

pub mod collection;
pub mod context;
pub mod host;
pub mod manifest;
pub mod schema;
pub mod schematic;

pub use collection::Collection;
pub use context::SchematicContext;
pub use host::{EngineHost, ManifestEngineHost, RuleFactory};
pub use manifest::{CollectionManifest, FactoryRef, SchematicManifestEntry};
pub use schematic::Schematic;

use crate::error::SchematicError;
use crate::tasks::TaskInfo;
use crate::tree::{MergeStrategy, Tree};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Strategy applied when a merge asks for the default
    #[serde(default)]
    pub default_merge_strategy: MergeStrategy,

    /// Whether top-level runs may invoke private schematics
    #[serde(default)]
    pub allow_private: bool,
}

/// Result of [`Engine::run`].
#[derive(Debug)]
pub struct RunOutcome {
    pub tree: Tree,
    /// Tasks recorded during the run, in execution order.
    pub tasks: Vec<TaskInfo>,
}

pub struct Engine {
    host: Arc<dyn EngineHost>,
    config: EngineConfig,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Engine {
    pub fn new(host: Arc<dyn EngineHost>) -> Arc<Self> {
        Self::with_config(host, EngineConfig::default())
    }

    pub fn with_config(host: Arc<dyn EngineHost>, config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            host,
            config,
            collections: RwLock::new(HashMap::new()),
        })
    }

    pub fn host(&self) -> &Arc<dyn EngineHost> {
        &self.host
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load a collection, or return the cached one.
    pub fn create_collection(&self, name: &str) -> Result<Arc<Collection>, SchematicError> {
        if let Some(collection) = self.collections.read().get(name) {
            return Ok(collection.clone());
        }
        let manifest = self.host.collection_description(name)?;
        manifest.validate(name)?;
        debug!(
            collection = name,
            schematics = manifest.schematics.len(),
            "Loaded collection"
        );
        let collection = Arc::new(Collection::new(name, manifest, self.host.clone()));
        Ok(self
            .collections
            .write()
            .entry(name.to_string())
            .or_insert(collection)
            .clone())
    }

    /// A fresh top-level context with its own task scheduler.
    pub fn create_context(self: &Arc<Self>) -> SchematicContext {
        SchematicContext::root(self.clone())
    }

    /// Run one schematic over `tree` and collect the tasks it scheduled.
    #[instrument(skip(self, options, tree))]
    pub async fn run(
        self: &Arc<Self>,
        collection: &str,
        schematic: &str,
        options: Value,
        tree: Tree,
    ) -> Result<RunOutcome, SchematicError> {
        let schematic = self
            .create_collection(collection)?
            .create_schematic(schematic, self.config.allow_private)?;
        let context = self.create_context();
        let tree = schematic.call(options, &tree, &context).await?;
        let tasks = context.scheduler().finalize();
        info!(
            actions = tree.actions().len(),
            tasks = tasks.len(),
            "Schematic run finished"
        );
        Ok(RunOutcome { tree, tasks })
    }
}
