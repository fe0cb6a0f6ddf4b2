//! Sinks
//!
//! A sink takes a finished tree and either writes its net changes to a host or
//! describes them. Both work from the same difference between the tree's final
//! state and its base, so every touched path is written or deleted at most once
//! however many actions touched it.

use crate::error::TreeError;
use crate::host::{Content, Host};
use crate::tree::{Staged, Tree};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One net change of a tree against its base.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Change {
    Create(String, Content),
    Update(String, Content),
    Delete(String),
}

/// Net changes sorted by path.
fn net_changes(tree: &Tree) -> Result<Vec<Change>, TreeError> {
    let mut changes = Vec::new();
    for (file_path, staged) in tree.staged() {
        let original = tree.base().read(file_path)?;
        match (staged, original) {
            (Staged::File(content), None) => {
                changes.push(Change::Create(file_path.clone(), content.clone()))
            }
            (Staged::File(content), Some(original)) if original[..] != content[..] => {
                changes.push(Change::Update(file_path.clone(), content.clone()))
            }
            (Staged::Deleted | Staged::Moved(_), Some(_)) => {
                changes.push(Change::Delete(file_path.clone()))
            }
            _ => {}
        }
    }
    Ok(changes)
}

/// Paths written by a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl CommitReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn total(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }
}

/// Writes a tree's net changes through a host.
pub struct HostSink;

impl HostSink {
    /// Deletes are applied before writes so a path that moved into a deleted
    /// location ends up with the new content. A host error stops the commit;
    /// changes already written stay written.
    pub fn commit(tree: &Tree, host: &dyn Host) -> Result<CommitReport, TreeError> {
        let changes = net_changes(tree)?;
        let mut report = CommitReport::default();

        for change in &changes {
            if let Change::Delete(file_path) = change {
                debug!(path = %file_path, "Deleting");
                host.delete(file_path)?;
                report.deleted.push(file_path.clone());
            }
        }
        for change in &changes {
            match change {
                Change::Create(file_path, content) => {
                    debug!(path = %file_path, bytes = content.len(), "Creating");
                    host.write(file_path, content)?;
                    report.created.push(file_path.clone());
                }
                Change::Update(file_path, content) => {
                    debug!(path = %file_path, bytes = content.len(), "Updating");
                    host.write(file_path, content)?;
                    report.updated.push(file_path.clone());
                }
                Change::Delete(_) => {}
            }
        }

        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            deleted = report.deleted.len(),
            "Committed tree"
        );
        Ok(report)
    }
}

/// A change a commit would make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DryRunEvent {
    Create { path: String, size: usize },
    Update { path: String, size: usize },
    Delete { path: String },
}

impl DryRunEvent {
    pub fn path(&self) -> &str {
        match self {
            DryRunEvent::Create { path, .. }
            | DryRunEvent::Update { path, .. }
            | DryRunEvent::Delete { path } => path,
        }
    }
}

/// Describes a tree's net changes without writing anything.
pub struct DryRunSink;

impl DryRunSink {
    pub fn events(tree: &Tree) -> Result<Vec<DryRunEvent>, TreeError> {
        Ok(net_changes(tree)?
            .into_iter()
            .map(|change| match change {
                Change::Create(path, content) => DryRunEvent::Create {
                    path,
                    size: content.len(),
                },
                Change::Update(path, content) => DryRunEvent::Update {
                    path,
                    size: content.len(),
                },
                Change::Delete(path) => DryRunEvent::Delete { path },
            })
            .collect())
    }
}
