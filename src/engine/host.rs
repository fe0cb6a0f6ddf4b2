//! Engine host: where collections, factories and schemas come from.

use crate::engine::manifest::{normalize_module, CollectionManifest, FactoryRef};
use crate::engine::schema;
use crate::error::SchematicError;
use crate::rules::RuleRef;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Builds a schematic's rule from its validated options.
pub type RuleFactory = Arc<dyn Fn(&Value) -> Result<RuleRef, SchematicError> + Send + Sync>;

/// Lookup seam between the engine and wherever collections live.
pub trait EngineHost: Send + Sync {
    fn collection_description(&self, name: &str) -> Result<CollectionManifest, SchematicError>;

    fn resolve_factory(&self, collection: &str, reference: &str)
        -> Result<RuleFactory, SchematicError>;

    fn resolve_schema(&self, collection: &str, reference: &str) -> Result<Value, SchematicError>;
}

/// In-memory engine host.
///
/// Factories are keyed by collection and normalized `module#export` reference,
/// schemas by collection and normalized module path.
#[derive(Default)]
pub struct ManifestEngineHost {
    collections: RwLock<HashMap<String, CollectionManifest>>,
    factories: RwLock<HashMap<(String, String), RuleFactory>>,
    schemas: RwLock<HashMap<(String, String), Value>>,
}

impl ManifestEngineHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_collection(
        &self,
        name: &str,
        manifest: CollectionManifest,
    ) -> Result<(), SchematicError> {
        manifest.validate(name)?;
        debug!(
            collection = name,
            schematics = manifest.schematics.len(),
            "Registered collection"
        );
        self.collections.write().insert(name.to_string(), manifest);
        Ok(())
    }

    pub fn register_collection_json(&self, name: &str, text: &str) -> Result<(), SchematicError> {
        self.register_collection(name, CollectionManifest::from_json(name, text)?)
    }

    pub fn register_collection_toml(&self, name: &str, text: &str) -> Result<(), SchematicError> {
        self.register_collection(name, CollectionManifest::from_toml(name, text)?)
    }

    pub fn register_factory<F>(&self, collection: &str, reference: &str, factory: F)
    where
        F: Fn(&Value) -> Result<RuleRef, SchematicError> + Send + Sync + 'static,
    {
        let key = (collection.to_string(), FactoryRef::parse(reference).key());
        self.factories.write().insert(key, Arc::new(factory));
    }

    /// Register a schema. Malformed schemas are rejected up front.
    pub fn register_schema(
        &self,
        collection: &str,
        reference: &str,
        schema: Value,
    ) -> Result<(), SchematicError> {
        schema::check_schema(reference, &schema)?;
        let key = (collection.to_string(), normalize_module(reference));
        self.schemas.write().insert(key, schema);
        Ok(())
    }
}

impl EngineHost for ManifestEngineHost {
    fn collection_description(&self, name: &str) -> Result<CollectionManifest, SchematicError> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SchematicError::UnknownCollection(name.to_string()))
    }

    fn resolve_factory(
        &self,
        collection: &str,
        reference: &str,
    ) -> Result<RuleFactory, SchematicError> {
        let key = (collection.to_string(), FactoryRef::parse(reference).key());
        self.factories
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| SchematicError::UnknownFactory {
                collection: collection.to_string(),
                reference: reference.to_string(),
            })
    }

    fn resolve_schema(&self, collection: &str, reference: &str) -> Result<Value, SchematicError> {
        let key = (collection.to_string(), normalize_module(reference));
        self.schemas
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| SchematicError::InvalidSchema {
                reference: reference.to_string(),
                message: "schema is not registered".to_string(),
            })
    }
}
