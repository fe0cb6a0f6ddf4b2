//! Staging, branching, merging and structured updates on virtual trees.

use graft::host::MemoryHost;
use graft::tree::{Action, ActionKind};
use graft::{MergeStrategy, Tree, TreeError};
use std::sync::Arc;

fn project() -> Arc<MemoryHost> {
    Arc::new(
        MemoryHost::with_files([
            ("/package.json", "{\"name\":\"app\"}"),
            ("/src/main.rs", "fn main() {}\n"),
            ("/src/lib.rs", "pub mod util;\n"),
        ])
        .unwrap(),
    )
}

#[test]
fn staged_changes_never_touch_the_host() {
    let host = project();
    let mut tree = Tree::from_host(host.clone());
    tree.create("/README.md", "# app").unwrap();
    tree.overwrite("/src/main.rs", "fn main() { run() }\n").unwrap();
    tree.delete("/src/lib.rs").unwrap();

    assert!(tree.exists("/README.md"));
    assert!(!tree.exists("/src/lib.rs"));
    assert_eq!(host.snapshot().len(), 3);
    assert_eq!(
        host.snapshot()["/src/main.rs"][..],
        b"fn main() {}\n"[..]
    );
}

#[test]
fn actions_are_logged_in_order() {
    let mut tree = Tree::from_host(project());
    tree.create("/a.txt", "a").unwrap();
    tree.rename("/a.txt", "/b.txt").unwrap();
    tree.overwrite("/b.txt", "b").unwrap();
    tree.delete("/package.json").unwrap();

    let kinds: Vec<ActionKind> = tree.actions().iter().map(Action::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ActionKind::Create,
            ActionKind::Rename,
            ActionKind::Overwrite,
            ActionKind::Delete
        ]
    );
    assert_eq!(tree.actions()[1].path(), "/a.txt");
}

#[test]
fn create_over_existing_file_fails_under_default_strategy() {
    let mut tree = Tree::from_host(project());
    assert_eq!(
        tree.create("/src/main.rs", "x"),
        Err(TreeError::AlreadyExists("/src/main.rs".to_string()))
    );

    let mut lenient = Tree::from_host(project()).with_merge_strategy(MergeStrategy::Overwrite);
    lenient.create("/src/main.rs", "x").unwrap();
    assert_eq!(
        lenient.read_to_string("/src/main.rs").unwrap().as_deref(),
        Some("x")
    );
    assert_eq!(lenient.actions()[0].kind(), ActionKind::Overwrite);
}

#[test]
fn operations_on_missing_files_fail() {
    let mut tree = Tree::from_host(project());
    assert!(matches!(
        tree.overwrite("/missing", "x"),
        Err(TreeError::FileDoesNotExist(_))
    ));
    assert!(matches!(
        tree.delete("/missing"),
        Err(TreeError::FileDoesNotExist(_))
    ));
    assert!(matches!(
        tree.rename("/missing", "/other"),
        Err(TreeError::FileDoesNotExist(_))
    ));
    assert!(tree.actions().is_empty());
}

#[test]
fn paths_are_normalized_and_escapes_rejected() {
    let mut tree = Tree::empty();
    tree.create("src//./nested/../a.rs", "a").unwrap();
    assert_eq!(tree.files().unwrap(), vec!["/src/a.rs"]);
    assert!(matches!(
        tree.create("/../etc/passwd", "x"),
        Err(TreeError::InvalidPath(_))
    ));
    assert!(!tree.exists("/../etc/passwd"));
}

#[test]
fn list_dir_merges_base_and_staged_entries() {
    let mut tree = Tree::from_host(project());
    tree.create("/src/util.rs", "").unwrap();
    tree.delete("/src/main.rs").unwrap();
    assert_eq!(tree.list_dir("/src").unwrap(), vec!["lib.rs", "util.rs"]);
    assert_eq!(tree.list_dir("/").unwrap(), vec!["package.json", "src"]);
}

#[test]
fn branches_are_independent_of_their_parent() {
    let mut tree = Tree::from_host(project());
    tree.create("/a", "1").unwrap();
    let mut branch = tree.branch();
    branch.create("/b", "2").unwrap();
    tree.create("/c", "3").unwrap();

    assert!(!tree.exists("/b"));
    assert!(!branch.exists("/c"));
    assert!(branch.exists("/a"));
    assert_ne!(tree.id(), branch.id());
}

#[test]
fn merging_a_branch_back_replays_only_its_own_work() {
    let mut tree = Tree::from_host(project());
    tree.create("/a", "1").unwrap();
    let mut branch = tree.branch();
    branch.create("/b", "2").unwrap();

    tree.merge(&branch, MergeStrategy::Error).unwrap();

    assert_eq!(tree.actions().len(), 2);
    assert_eq!(tree.read_to_string("/b").unwrap().as_deref(), Some("2"));
}

#[test]
fn conflicting_merges_follow_the_strategy() {
    let mut left = Tree::from_host(project());
    let mut right = left.branch();
    left.overwrite("/package.json", "left").unwrap();
    right.overwrite("/package.json", "right").unwrap();

    let mut strict = left.branch();
    assert_eq!(
        strict.merge(&right, MergeStrategy::Error),
        Err(TreeError::MergeConflict("/package.json".to_string()))
    );

    left.merge(&right, MergeStrategy::AllowOverwriteConflict)
        .unwrap();
    assert_eq!(
        left.read_to_string("/package.json").unwrap().as_deref(),
        Some("right")
    );
}

#[test]
fn filtered_tree_only_sees_accepted_paths() {
    let mut tree = Tree::from_host(project());
    tree.create("/src/new.rs", "").unwrap();
    tree.create("/docs/guide.md", "").unwrap();

    let only_src = tree
        .filtered(Arc::new(|p: &str| p.starts_with("/src/")))
        .unwrap();
    assert_eq!(
        only_src.files().unwrap(),
        vec!["/src/lib.rs", "/src/main.rs", "/src/new.rs"]
    );
}

#[test]
fn fingerprint_depends_on_content_not_history() {
    let mut direct = Tree::empty();
    direct.create("/a", "final").unwrap();

    let mut roundabout = Tree::empty();
    roundabout.create("/tmp", "draft").unwrap();
    roundabout.rename("/tmp", "/a").unwrap();
    roundabout.overwrite("/a", "final").unwrap();

    assert_eq!(
        direct.fingerprint().unwrap(),
        roundabout.fingerprint().unwrap()
    );

    roundabout.overwrite("/a", "other").unwrap();
    assert_ne!(
        direct.fingerprint().unwrap(),
        roundabout.fingerprint().unwrap()
    );
}

#[test]
fn recorder_edits_apply_as_one_overwrite() {
    let mut tree = Tree::from_host(project());
    let mut recorder = tree.begin_update("/src/lib.rs").unwrap();
    recorder
        .insert_left(0, "// generated\n")
        .unwrap()
        .remove(4, 4)
        .unwrap()
        .insert_right(13, "\npub mod extra;")
        .unwrap();
    tree.commit_update(recorder).unwrap();

    assert_eq!(
        tree.read_to_string("/src/lib.rs").unwrap().as_deref(),
        Some("// generated\npub util;\npub mod extra;\n")
    );
    assert_eq!(tree.actions().len(), 1);
    assert_eq!(tree.actions()[0].kind(), ActionKind::Overwrite);
}

#[test]
fn recorder_offsets_refer_to_the_original_content() {
    let mut tree = Tree::empty();
    tree.create("/f", "abcdef").unwrap();
    let mut recorder = tree.begin_update("/f").unwrap();
    recorder.insert_right(3, "XYZ").unwrap();
    recorder.insert_left(3, "123").unwrap();
    recorder.remove(0, 1).unwrap();
    tree.commit_update(recorder).unwrap();
    assert_eq!(tree.read_to_string("/f").unwrap().as_deref(), Some("bc123XYZdef"));
}

#[test]
fn stale_recorder_is_refused() {
    let mut tree = Tree::from_host(project());
    let mut recorder = tree.begin_update("/src/main.rs").unwrap();
    recorder.insert_left(0, "// header\n").unwrap();
    tree.overwrite("/src/main.rs", "fn main() { changed() }\n")
        .unwrap();

    assert_eq!(
        tree.commit_update(recorder),
        Err(TreeError::ContentHasMutated("/src/main.rs".to_string()))
    );
}

#[test]
fn recorder_rejects_bad_edits() {
    let tree = Tree::from_host(project());
    let mut recorder = tree.begin_update("/src/lib.rs").unwrap();
    assert!(matches!(
        recorder.insert_left(1000, "x"),
        Err(TreeError::UpdateOutOfRange { .. })
    ));
    recorder.remove(0, 4).unwrap();
    assert!(matches!(
        recorder.remove(2, 4),
        Err(TreeError::OverlappingRemoval { .. })
    ));
    assert!(matches!(
        tree.begin_update("/missing"),
        Err(TreeError::FileDoesNotExist(_))
    ));
}
