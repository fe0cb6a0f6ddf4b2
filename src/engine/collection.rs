//! A loaded collection and its schematic cache.

use crate::engine::host::EngineHost;
use crate::engine::manifest::{CollectionManifest, SchematicManifestEntry};
use crate::engine::schematic::Schematic;
use crate::error::SchematicError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct Collection {
    name: String,
    manifest: CollectionManifest,
    host: Arc<dyn EngineHost>,
    /// By canonical schematic name.
    schematics: RwLock<HashMap<String, Arc<Schematic>>>,
}

impl Collection {
    pub(crate) fn new(name: &str, manifest: CollectionManifest, host: Arc<dyn EngineHost>) -> Self {
        Self {
            name: name.to_string(),
            manifest,
            host,
            schematics: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest(&self) -> &CollectionManifest {
        &self.manifest
    }

    /// Manifest entry for a schematic name or alias.
    pub fn describe(&self, name: &str) -> Option<&SchematicManifestEntry> {
        let canonical = self.manifest.resolve_name(name)?;
        self.manifest.schematics.get(canonical)
    }

    /// Resolve a schematic by name or alias.
    ///
    /// Private schematics are reported as unknown unless `allow_private` is set.
    pub fn create_schematic(
        &self,
        name: &str,
        allow_private: bool,
    ) -> Result<Arc<Schematic>, SchematicError> {
        let unknown = || SchematicError::UnknownSchematic {
            collection: self.name.clone(),
            schematic: name.to_string(),
        };
        let canonical = self.manifest.resolve_name(name).ok_or_else(unknown)?;
        let entry = self.manifest.schematics.get(canonical).ok_or_else(unknown)?;
        if entry.private && !allow_private {
            return Err(unknown());
        }

        if let Some(schematic) = self.schematics.read().get(canonical) {
            return Ok(schematic.clone());
        }

        let factory = self.host.resolve_factory(&self.name, &entry.factory)?;
        let schema = match &entry.schema {
            Some(reference) => Some(self.host.resolve_schema(&self.name, reference)?),
            None => None,
        };
        let schematic = Arc::new(Schematic::new(
            &self.name,
            canonical,
            entry.description.clone(),
            factory,
            schema,
        ));
        debug!(collection = %self.name, schematic = canonical, "Loaded schematic");
        Ok(self
            .schematics
            .write()
            .entry(canonical.to_string())
            .or_insert(schematic)
            .clone())
    }

    /// Public, non-hidden schematic names, sorted.
    pub fn list_schematics(&self) -> Vec<String> {
        self.manifest
            .schematics
            .iter()
            .filter(|(_, entry)| !entry.private && !entry.hidden)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("schematics", &self.manifest.schematics.len())
            .finish()
    }
}
