//! Trees over a real directory, committed back with the host sink.

use graft::host::{DiskHost, DiskHostConfig, Host};
use graft::{DryRunEvent, DryRunSink, HostSink, Tree, TreeError};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::create_dir_all(dir.path().join("target/debug")).unwrap();
    fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(dir.path().join("src/old.rs"), "// old\n").unwrap();
    fs::write(dir.path().join("target/debug/app"), "binary").unwrap();
    dir
}

#[test]
fn base_snapshot_skips_ignored_directories() {
    let dir = workspace();
    let tree = Tree::from_host(Arc::new(DiskHost::new(dir.path()).unwrap()));
    assert_eq!(tree.files().unwrap(), vec!["/src/main.rs", "/src/old.rs"]);

    let everything = DiskHost::with_config(
        dir.path(),
        DiskHostConfig {
            ignore_patterns: Vec::new(),
            ..DiskHostConfig::default()
        },
    )
    .unwrap();
    assert!(everything.files().unwrap().contains(&"/target/debug/app".to_string()));
}

#[test]
fn commit_applies_net_changes_only() {
    let dir = workspace();
    let host = Arc::new(DiskHost::new(dir.path()).unwrap());
    let mut tree = Tree::from_host(host.clone());
    tree.rename("/src/old.rs", "/src/new.rs").unwrap();
    tree.overwrite("/src/main.rs", "fn main() { new::run() }\n")
        .unwrap();
    tree.create("/scratch.txt", "tmp").unwrap();
    tree.delete("/scratch.txt").unwrap();

    let report = HostSink::commit(&tree, host.as_ref()).unwrap();

    assert_eq!(report.created, vec!["/src/new.rs"]);
    assert_eq!(report.updated, vec!["/src/main.rs"]);
    assert_eq!(report.deleted, vec!["/src/old.rs"]);
    assert!(!dir.path().join("src/old.rs").exists());
    assert!(!dir.path().join("scratch.txt").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("src/new.rs")).unwrap(),
        "// old\n"
    );
}

#[test]
fn dry_run_describes_the_same_changes_as_a_commit() {
    let dir = workspace();
    let host = Arc::new(DiskHost::new(dir.path()).unwrap());
    let mut tree = Tree::from_host(host.clone());
    tree.create("/docs/index.md", "# docs").unwrap();
    tree.delete("/src/old.rs").unwrap();
    tree.overwrite("/src/main.rs", "fn main() {}\n").unwrap();

    let events = DryRunSink::events(&tree).unwrap();
    assert_eq!(
        events,
        vec![
            DryRunEvent::Create {
                path: "/docs/index.md".to_string(),
                size: 6,
            },
            DryRunEvent::Delete {
                path: "/src/old.rs".to_string(),
            },
        ]
    );
    assert!(dir.path().join("src/old.rs").exists());

    let report = HostSink::commit(&tree, host.as_ref()).unwrap();
    assert_eq!(report.total(), events.len());
}

#[test]
fn committed_tree_reads_back_identically() {
    let dir = workspace();
    let host = Arc::new(DiskHost::new(dir.path()).unwrap());
    let mut tree = Tree::from_host(host.clone());
    tree.create("/src/lib.rs", "pub mod util;\n").unwrap();
    tree.create("/src/util/mod.rs", "").unwrap();
    let expected = tree.fingerprint().unwrap();

    HostSink::commit(&tree, host.as_ref()).unwrap();

    let reopened = Tree::from_host(Arc::new(DiskHost::new(dir.path()).unwrap()));
    assert_eq!(reopened.fingerprint().unwrap(), expected);
}

#[test]
fn nested_file_under_a_staged_file_is_refused_before_commit() {
    let dir = TempDir::new().unwrap();
    let host = Arc::new(DiskHost::new(dir.path()).unwrap());
    let mut tree = Tree::from_host(host.clone());
    tree.create("/a", "file").unwrap();

    assert!(matches!(
        tree.create("/a/b", "child"),
        Err(TreeError::PathConflict { .. })
    ));
    assert_eq!(tree.files().unwrap(), vec!["/a"]);

    let report = HostSink::commit(&tree, host.as_ref()).unwrap();
    assert_eq!(report.created, vec!["/a"]);
    assert_eq!(fs::read_to_string(dir.path().join("a")).unwrap(), "file");
}

#[test]
fn file_cannot_replace_a_directory_on_disk() {
    let dir = workspace();
    let mut tree = Tree::from_host(Arc::new(DiskHost::new(dir.path()).unwrap()));
    assert!(matches!(
        tree.create("/src", "not a directory"),
        Err(TreeError::PathConflict { .. })
    ));
    assert!(tree.actions().is_empty());
}
