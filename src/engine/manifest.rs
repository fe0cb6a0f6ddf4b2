//! Collection manifests.
//!
//! ```json
//! {
//!   "schematics": {
//!     "component": {
//!       "factory": "./component/index#component",
//!       "schema": "./component/schema.json",
//!       "description": "Create a component",
//!       "aliases": ["c"]
//!     }
//!   }
//! }
//! ```

use crate::error::SchematicError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Parsed collection manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionManifest {
    #[serde(default)]
    pub schematics: BTreeMap<String, SchematicManifestEntry>,
}

/// One schematic declared by a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchematicManifestEntry {
    pub factory: String,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub description: String,

    /// Only reachable from the same collection.
    #[serde(default)]
    pub private: bool,

    /// Callable, but left out of listings.
    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CollectionManifest {
    pub fn from_json(collection: &str, text: &str) -> Result<Self, SchematicError> {
        let manifest: Self = serde_json::from_str(text).map_err(|e| invalid(collection, e))?;
        manifest.validate(collection)?;
        Ok(manifest)
    }

    pub fn from_toml(collection: &str, text: &str) -> Result<Self, SchematicError> {
        let manifest: Self = toml::from_str(text).map_err(|e| invalid(collection, e))?;
        manifest.validate(collection)?;
        Ok(manifest)
    }

    /// Empty factory references and names claimed twice (by a schematic or an
    /// alias) are rejected.
    pub fn validate(&self, collection: &str) -> Result<(), SchematicError> {
        let mut claimed: HashMap<&str, &str> = HashMap::new();
        for (name, entry) in &self.schematics {
            if entry.factory.trim().is_empty() {
                return Err(invalid(
                    collection,
                    format!("schematic '{}' has no factory", name),
                ));
            }
            claimed.insert(name.as_str(), name.as_str());
        }
        for (name, entry) in &self.schematics {
            for alias in &entry.aliases {
                if let Some(owner) = claimed.insert(alias.as_str(), name.as_str()) {
                    return Err(invalid(
                        collection,
                        format!(
                            "alias '{}' of '{}' is already taken by '{}'",
                            alias, name, owner
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Canonical name for a schematic name or alias.
    pub fn resolve_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.schematics.contains_key(name) {
            return Some(name);
        }
        self.schematics
            .iter()
            .find(|(_, entry)| entry.aliases.iter().any(|alias| alias == name))
            .map(|(canonical, _)| canonical.as_str())
    }
}

fn invalid(collection: &str, err: impl std::fmt::Display) -> SchematicError {
    SchematicError::InvalidManifest {
        collection: collection.to_string(),
        message: err.to_string(),
    }
}

/// A `module#export` reference. The export defaults to `default`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactoryRef {
    pub module: String,
    pub export: String,
}

impl FactoryRef {
    pub fn parse(reference: &str) -> Self {
        let (module, export) = match reference.split_once('#') {
            Some((module, export)) if !export.trim().is_empty() => (module, export.trim()),
            Some((module, _)) => (module, "default"),
            None => (reference, "default"),
        };
        Self {
            module: normalize_module(module),
            export: export.to_string(),
        }
    }

    /// Key used to look the reference up in a registry.
    pub fn key(&self) -> String {
        format!("{}#{}", self.module, self.export)
    }
}

/// Strip leading `./` segments and surrounding whitespace from a module reference.
pub fn normalize_module(module: &str) -> String {
    let mut module = module.trim();
    while let Some(rest) = module.strip_prefix("./") {
        module = rest;
    }
    module.to_string()
}
