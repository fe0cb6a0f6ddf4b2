//! Option schemas.
//!
//! Supports the subset of JSON Schema that schematic options use: `type`,
//! `properties`, `required`, `additionalProperties` (boolean), `enum`, `default`,
//! `minLength`/`maxLength`, `minimum`/`maximum` and `items`. Validation collects
//! every violation instead of stopping at the first one, and fills in defaults
//! for absent properties.

use crate::error::{OptionViolation, SchematicError};
use serde_json::{Map, Value};

const TYPES: [&str; 7] = [
    "object", "string", "number", "integer", "boolean", "array", "null",
];

/// Reject schemas the validator cannot interpret.
pub fn check_schema(reference: &str, schema: &Value) -> Result<(), SchematicError> {
    let invalid = |message: String| SchematicError::InvalidSchema {
        reference: reference.to_string(),
        message,
    };
    let object = schema
        .as_object()
        .ok_or_else(|| invalid("schema must be a JSON object".to_string()))?;

    if let Some(kind) = object.get("type") {
        for name in type_names(kind) {
            if !TYPES.contains(&name) {
                return Err(invalid(format!("unknown type '{}'", name)));
            }
        }
        if type_names(kind).is_empty() {
            return Err(invalid("'type' must be a string or an array of strings".to_string()));
        }
    }
    if let Some(required) = object.get("required") {
        let well_formed = required
            .as_array()
            .map_or(false, |names| names.iter().all(Value::is_string));
        if !well_formed {
            return Err(invalid("'required' must be an array of strings".to_string()));
        }
    }
    if let Some(properties) = object.get("properties") {
        let properties = properties
            .as_object()
            .ok_or_else(|| invalid("'properties' must be an object".to_string()))?;
        for property in properties.values() {
            check_schema(reference, property)?;
        }
    }
    if let Some(items) = object.get("items") {
        check_schema(reference, items)?;
    }
    Ok(())
}

/// Validate `options` against `schema`, returning the options with defaults applied.
///
/// Absent options (`null`) are treated as an empty object.
pub fn validate_options(schema: &Value, options: Value) -> Result<Value, Vec<OptionViolation>> {
    let mut options = match options {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    let mut violations = Vec::new();
    validate_value(schema, &mut options, "", &mut violations);
    if violations.is_empty() {
        Ok(options)
    } else {
        Err(violations)
    }
}

fn validate_value(schema: &Value, value: &mut Value, field: &str, out: &mut Vec<OptionViolation>) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let (Some(properties), Value::Object(map)) = (schema.get("properties"), &mut *value) {
        if let Some(properties) = properties.as_object() {
            for (key, property) in properties {
                if map.contains_key(key) {
                    continue;
                }
                if let Some(default) = property.get("default") {
                    map.insert(key.clone(), default.clone());
                }
            }
        }
    }

    if let Some(kind) = schema.get("type") {
        let expected = type_names(kind);
        if !expected.is_empty() && !expected.iter().any(|name| matches_type(name, value)) {
            out.push(violation(field, format!("must be of type {}", expected.join(" or "))));
            return;
        }
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(value) {
            let listed = serde_json::to_string(allowed).unwrap_or_default();
            out.push(violation(field, format!("must be one of {}", listed)));
        }
    }

    match value {
        Value::String(text) => {
            let length = text.chars().count() as u64;
            if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
                if length < min {
                    out.push(violation(field, format!("must be at least {} characters", min)));
                }
            }
            if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
                if length > max {
                    out.push(violation(field, format!("must be at most {} characters", max)));
                }
            }
        }
        Value::Number(number) => {
            if let Some(n) = number.as_f64() {
                if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
                    if n < min {
                        out.push(violation(field, format!("must be >= {}", min)));
                    }
                }
                if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
                    if n > max {
                        out.push(violation(field, format!("must be <= {}", max)));
                    }
                }
            }
        }
        Value::Object(map) => {
            if let Some(Value::Array(required)) = schema.get("required") {
                for key in required.iter().filter_map(Value::as_str) {
                    if !map.contains_key(key) {
                        out.push(violation(&child(field, key), "is required".to_string()));
                    }
                }
            }
            let properties = schema.get("properties").and_then(Value::as_object);
            if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
                for key in map.keys() {
                    if !properties.map_or(false, |p| p.contains_key(key)) {
                        out.push(violation(&child(field, key), "is not allowed".to_string()));
                    }
                }
            }
            if let Some(properties) = properties {
                for (key, property) in properties {
                    if let Some(nested) = map.get_mut(key) {
                        validate_value(property, nested, &child(field, key), out);
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for (index, item) in items.iter_mut().enumerate() {
                    validate_value(item_schema, item, &format!("{}[{}]", field, index), out);
                }
            }
        }
        Value::Bool(_) | Value::Null => {}
    }
}

fn type_names(kind: &Value) -> Vec<&str> {
    match kind {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn matches_type(name: &str, value: &Value) -> bool {
    match name {
        "object" => value.is_object(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().map_or(false, |n| n.fract() == 0.0)
        }
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => false,
    }
}

fn child(field: &str, key: &str) -> String {
    if field.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", field, key)
    }
}

fn violation(field: &str, message: String) -> OptionViolation {
    OptionViolation {
        field: field.to_string(),
        message,
    }
}
