//! A schematic: one validated, named transformation.

use crate::engine::context::SchematicContext;
use crate::engine::host::RuleFactory;
use crate::engine::schema;
use crate::error::SchematicError;
use crate::rules::{RuleRef, TreeFuture};
use crate::tree::Tree;
use serde_json::Value;
use std::fmt;
use tracing::{info_span, Instrument};

pub struct Schematic {
    collection: String,
    name: String,
    description: String,
    factory: RuleFactory,
    schema: Option<Value>,
}

impl Schematic {
    pub(crate) fn new(
        collection: &str,
        name: &str,
        description: String,
        factory: RuleFactory,
        schema: Option<Value>,
    ) -> Self {
        Self {
            collection: collection.to_string(),
            name: name.to_string(),
            description,
            factory,
            schema,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    /// Check options against the schema and fill in defaults.
    pub fn validate_options(&self, options: Value) -> Result<Value, SchematicError> {
        match &self.schema {
            Some(schema) => schema::validate_options(schema, options).map_err(|violations| {
                SchematicError::InvalidOptions {
                    schematic: self.name.clone(),
                    violations,
                }
            }),
            None => Ok(options),
        }
    }

    /// Run the schematic on a branch of `input`.
    ///
    /// Cycle detection, option validation and the factory call all happen before
    /// this returns, so invalid options never reach the factory and `input` is
    /// never touched.
    pub fn call(&self, options: Value, input: &Tree, parent: &SchematicContext) -> TreeFuture {
        let prepared = self.prepare(options, parent);
        let (rule, context) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return Box::pin(futures::future::ready(Err(e))),
        };
        context.logger().debug("Running schematic");
        let output = rule.apply(input.branch(), &context);
        let span = info_span!("schematic", collection = %self.collection, name = %self.name);
        Box::pin(output.resolve().instrument(span))
    }

    fn prepare(
        &self,
        options: Value,
        parent: &SchematicContext,
    ) -> Result<(RuleRef, SchematicContext), SchematicError> {
        let context = parent.child(&self.collection, &self.name)?;
        let options = self.validate_options(options)?;
        let rule = (self.factory)(&options)?;
        Ok((rule, context))
    }
}

impl fmt::Debug for Schematic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schematic")
            .field("collection", &self.collection)
            .field("name", &self.name)
            .field("has_schema", &self.schema.is_some())
            .finish()
    }
}
