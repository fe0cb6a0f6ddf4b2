//! Shared fixtures for integration tests.

use async_trait::async_trait;
use graft::engine::{Engine, ManifestEngineHost};
use graft::rules::{self, rule, RuleRef};
use graft::tasks::{TaskConfiguration, TaskExecutor, TaskInfo};
use graft::SchematicError;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

pub const COLLECTION: &str = "@acme/app";

pub const MANIFEST: &str = r#"{
    "schematics": {
        "component": {
            "factory": "./component",
            "schema": "./component/schema.json",
            "description": "Create a component with a stylesheet",
            "aliases": ["c"]
        },
        "module": {
            "factory": "./module#module",
            "description": "Create a module file and a component inside it"
        },
        "loop": { "factory": "./loop" },
        "ping": { "factory": "./ping", "hidden": true },
        "pong": { "factory": "./pong", "hidden": true },
        "styles": { "factory": "./styles", "private": true }
    }
}"#;

pub const THIRD_PARTY_MANIFEST: &str = r#"
[schematics.license]
factory = "./license"
description = "Add a LICENSE file"

[schematics.internal]
factory = "./license"
private = true
"#;

/// Engine host with the `@acme/app` and `@vendor/kit` collections wired up.
pub fn engine_host() -> ManifestEngineHost {
    let host = ManifestEngineHost::new();
    host.register_collection_json(COLLECTION, MANIFEST).unwrap();
    host.register_schema(
        COLLECTION,
        "./component/schema.json",
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "minLength": 1 },
                "style": { "type": "string", "enum": ["css", "scss"], "default": "css" },
                "skipInstall": { "type": "boolean", "default": false }
            },
            "required": ["name"]
        }),
    )
    .unwrap();
    host.register_factory(COLLECTION, "./component", component_factory);
    host.register_factory(COLLECTION, "./module#module", |options: &Value| {
        let name = options["name"].as_str().unwrap_or("feature").to_string();
        Ok(rules::chain(vec![
            create_file(format!("/src/{}/mod.rs", name), format!("// {}\n", name)),
            rules::schematic("component", json!({ "name": name })),
        ]))
    });
    host.register_factory(COLLECTION, "./loop", |_options: &Value| {
        Ok(rules::schematic("loop", json!({})))
    });
    host.register_factory(COLLECTION, "./ping", |_options: &Value| {
        Ok(rules::chain(vec![
            create_file("/ping.txt".to_string(), "ping\n".to_string()),
            rules::schematic("pong", json!({})),
        ]))
    });
    host.register_factory(COLLECTION, "./pong", |_options: &Value| {
        Ok(rules::schematic("ping", json!({})))
    });
    host.register_factory(COLLECTION, "./styles", |_options: &Value| {
        Ok(create_file("/styles.css".to_string(), "body {}\n".to_string()))
    });

    host.register_collection_toml("@vendor/kit", THIRD_PARTY_MANIFEST)
        .unwrap();
    host.register_factory("@vendor/kit", "./license", |_options: &Value| {
        Ok(create_file("/LICENSE".to_string(), "MIT\n".to_string()))
    });
    host
}

pub fn engine() -> Arc<Engine> {
    Engine::new(Arc::new(engine_host()))
}

fn component_factory(options: &Value) -> Result<RuleRef, SchematicError> {
    let name = options["name"].as_str().unwrap_or_default().to_string();
    let style = options["style"].as_str().unwrap_or("css").to_string();
    let skip_install = options["skipInstall"].as_bool().unwrap_or(false);
    Ok(rule(move |mut tree, context| {
        tree.create(
            &format!("/src/{}.rs", name),
            format!("pub struct {};\n", name),
        )?;
        tree.create(&format!("/src/{}.{}", name, style), "")?;
        if !skip_install {
            let install = context.add_task(TaskConfiguration::new(
                "install",
                json!({ "package": name }),
            ))?;
            context.add_task(
                TaskConfiguration::new("format", Value::Null).depends_on([install]),
            )?;
        }
        Ok(tree)
    }))
}

pub fn create_file(file_path: String, content: String) -> RuleRef {
    rule(move |mut tree, _context| {
        tree.create(&file_path, &content)?;
        Ok(tree)
    })
}

/// Executor that records the tasks it ran, failing those with `"fail": true`.
#[derive(Default)]
pub struct RecordingExecutor {
    pub ran: Mutex<Vec<String>>,
}

#[async_trait]
impl TaskExecutor for RecordingExecutor {
    async fn execute(&self, task: &TaskInfo) -> anyhow::Result<()> {
        self.ran.lock().push(task.name().to_string());
        if task.configuration.options["fail"].as_bool() == Some(true) {
            anyhow::bail!("{} failed on request", task.name());
        }
        Ok(())
    }
}

/// Serializes tests that change process-wide environment variables.
pub static ENV_LOCK: Mutex<()> = Mutex::new(());
