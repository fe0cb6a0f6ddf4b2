//! Composing rules and sources into larger transformations.

use super::test_utils::{create_file, engine};
use futures::stream;
use graft::host::MemoryHost;
use graft::rules::{self, rule, rule_async, FileEntry, RuleOutput, RuleRef};
use graft::{MergeStrategy, SchematicError, Tree, TreeError};
use std::sync::Arc;

fn file(p: &str, content: &str) -> RuleRef {
    create_file(p.to_string(), content.to_string())
}

#[tokio::test]
async fn chained_rules_produce_both_files() {
    let context = engine().create_context();
    let tree = rules::chain(vec![file("/a", "1"), file("/b", "2")])
        .apply(Tree::empty(), &context)
        .resolve()
        .await
        .unwrap();
    assert_eq!(tree.files().unwrap(), vec!["/a", "/b"]);
}

#[tokio::test]
async fn chain_stops_at_the_first_failure() {
    let context = engine().create_context();
    let result = rules::chain(vec![file("/a", "1"), file("/a", "again"), file("/b", "2")])
        .apply(Tree::empty(), &context)
        .resolve()
        .await;
    assert!(matches!(
        result,
        Err(SchematicError::Tree(TreeError::AlreadyExists(_)))
    ));
}

#[tokio::test]
async fn async_and_streaming_rules_compose_with_sync_ones() {
    let context = engine().create_context();
    let delayed = rule_async(|mut tree: Tree, _context| async move {
        tokio::task::yield_now().await;
        tree.create("/delayed", "later")?;
        Ok::<Tree, SchematicError>(tree)
    });
    let streaming: RuleRef = Arc::new(|tree: Tree, _context: &graft::SchematicContext| {
        let mut first = tree.branch();
        let mut second = tree;
        let outcome = first.create("/discarded", "").and(second.create("/streamed", ""));
        match outcome {
            Ok(()) => RuleOutput::Stream(Box::pin(stream::iter(vec![
                Ok::<Tree, SchematicError>(first),
                Ok(second),
            ]))),
            Err(e) => RuleOutput::error(e),
        }
    });

    let tree = rules::chain(vec![file("/sync", ""), delayed, streaming])
        .apply(Tree::empty(), &context)
        .resolve()
        .await
        .unwrap();
    assert_eq!(tree.files().unwrap(), vec!["/delayed", "/streamed", "/sync"]);
}

#[tokio::test]
async fn apply_feeds_a_source_through_rules() {
    let context = engine().create_context();
    let source = rules::apply(
        rules::files_source([("/template.txt", "Hello NAME")]),
        vec![
            rules::for_each(|entry: FileEntry| {
                let text = String::from_utf8_lossy(&entry.content).replace("NAME", "world");
                Ok(Some(FileEntry::new(entry.path.replace("template", "greeting"), text)))
            }),
        ],
    );
    let tree = source.create(&context).resolve().await.unwrap();
    assert_eq!(tree.files().unwrap(), vec!["/greeting.txt"]);
    assert_eq!(
        tree.read_to_string("/greeting.txt").unwrap().as_deref(),
        Some("Hello world")
    );
}

#[tokio::test]
async fn merge_with_grafts_a_template_onto_the_project() {
    let host = Arc::new(MemoryHost::with_files([("/Cargo.toml", "[package]")]).unwrap());
    let context = engine().create_context();
    let template = rules::apply(
        rules::files_source([("/src/lib.rs", "// lib"), ("/README.md", "# readme")]),
        vec![rules::move_to("/", "/crates/core")],
    );

    let tree = rules::merge_with(template, MergeStrategy::Default)
        .apply(Tree::from_host(host), &context)
        .resolve()
        .await
        .unwrap();
    assert_eq!(
        tree.files().unwrap(),
        vec!["/Cargo.toml", "/crates/core/README.md", "/crates/core/src/lib.rs"]
    );
}

#[tokio::test]
async fn merge_with_conflict_uses_the_requested_strategy() {
    let host = Arc::new(MemoryHost::with_files([("/README.md", "ours")]).unwrap());
    let context = engine().create_context();
    let incoming = || rules::files_source([("/README.md", "theirs")]);

    let refused = rules::merge_with(incoming(), MergeStrategy::Error)
        .apply(Tree::from_host(host.clone()), &context)
        .resolve()
        .await;
    assert!(matches!(
        refused,
        Err(SchematicError::Tree(TreeError::MergeConflict(_)))
    ));

    let accepted = rules::merge_with(incoming(), MergeStrategy::Overwrite)
        .apply(Tree::from_host(host), &context)
        .resolve()
        .await
        .unwrap();
    assert_eq!(
        accepted.read_to_string("/README.md").unwrap().as_deref(),
        Some("theirs")
    );
}

#[tokio::test]
async fn context_strategy_applies_when_none_is_requested() {
    let host = Arc::new(MemoryHost::with_files([("/README.md", "ours")]).unwrap());
    let context = engine()
        .create_context()
        .with_strategy(MergeStrategy::AllowCreationConflict);

    let tree = rules::merge_with(
        rules::files_source([("/README.md", "theirs")]),
        MergeStrategy::Default,
    )
    .apply(Tree::from_host(host), &context)
    .resolve()
    .await
    .unwrap();
    assert_eq!(
        tree.read_to_string("/README.md").unwrap().as_deref(),
        Some("theirs")
    );
}

#[tokio::test]
async fn branch_and_merge_keeps_the_working_tree_history() {
    let context = engine().create_context();
    let mut tree = Tree::empty();
    tree.create("/before", "").unwrap();

    let tree = rules::branch_and_merge(file("/inside", ""), MergeStrategy::Error)
        .apply(tree, &context)
        .resolve()
        .await
        .unwrap();
    assert_eq!(tree.files().unwrap(), vec!["/before", "/inside"]);
    assert_eq!(tree.actions().len(), 2);
}

#[tokio::test]
async fn filter_and_visitors_reshape_a_tree() {
    let host = Arc::new(
        MemoryHost::with_files([
            ("/src/a.rs", "a"),
            ("/src/a.snap", "snapshot"),
            ("/docs/b.md", "b"),
        ])
        .unwrap(),
    );
    let context = engine().create_context();
    let drop_snapshots = rules::for_each(|entry: FileEntry| {
        if entry.path.ends_with(".snap") {
            Ok(None)
        } else {
            Ok(Some(entry))
        }
    });
    let tree = rules::chain(vec![
        drop_snapshots,
        rules::filter(|p: &str| p.starts_with("/src")),
    ])
    .apply(Tree::from_host(host), &context)
    .resolve()
    .await
    .unwrap();
    assert_eq!(tree.files().unwrap(), vec!["/src/a.rs"]);
}

#[tokio::test]
async fn a_source_can_be_replayed() {
    let context = engine().create_context();
    let mut base = Tree::empty();
    base.create("/seed", "").unwrap();
    let source = rules::tree_source(base);

    let mut first = source.create(&context).resolve().await.unwrap();
    first.create("/only-first", "").unwrap();
    let second = source.create(&context).resolve().await.unwrap();

    assert_eq!(second.files().unwrap(), vec!["/seed"]);
}

#[tokio::test]
async fn rule_errors_surface_unchanged() {
    let context = engine().create_context();
    let failing = rule(|_tree, _context| Err(anyhow::anyhow!("template missing").into()));
    let err = rules::chain(vec![rules::noop(), failing])
        .apply(Tree::empty(), &context)
        .resolve()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("template missing"));
}
