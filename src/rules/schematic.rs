//! Rules that invoke other schematics.

use crate::engine::SchematicContext;
use crate::error::SchematicError;
use crate::rules::base::{RuleOutput, RuleRef};
use crate::tree::Tree;
use serde_json::Value;
use std::sync::Arc;

/// Run a schematic from the calling schematic's own collection.
///
/// Private schematics are reachable this way.
pub fn schematic(name: &str, options: Value) -> RuleRef {
    invoke(None, name.to_string(), options, true)
}

/// Run a schematic from another collection. Private schematics are refused.
pub fn external_schematic(collection: &str, name: &str, options: Value) -> RuleRef {
    invoke(Some(collection.to_string()), name.to_string(), options, false)
}

fn invoke(
    collection: Option<String>,
    name: String,
    options: Value,
    allow_private: bool,
) -> RuleRef {
    Arc::new(move |tree: Tree, context: &SchematicContext| {
        let collection_name = match collection.as_deref().or(context.collection()) {
            Some(collection_name) => collection_name.to_string(),
            None => {
                return RuleOutput::error(SchematicError::UnknownSchematic {
                    collection: String::new(),
                    schematic: name.clone(),
                })
            }
        };
        let resolved = context
            .engine()
            .create_collection(&collection_name)
            .and_then(|collection| collection.create_schematic(&name, allow_private));
        match resolved {
            Ok(schematic) => RuleOutput::Future(schematic.call(options.clone(), &tree, context)),
            Err(e) => RuleOutput::error(e),
        }
    })
}
