//! Recorded tree mutations.

use crate::host::Content;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Overwrite,
    Rename,
    Delete,
}

/// One entry of a tree's action log.
#[derive(Clone, PartialEq, Eq)]
pub enum Action {
    Create { path: String, content: Content },
    Overwrite { path: String, content: Content },
    Rename { from: String, to: String },
    Delete { path: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Create { .. } => ActionKind::Create,
            Action::Overwrite { .. } => ActionKind::Overwrite,
            Action::Rename { .. } => ActionKind::Rename,
            Action::Delete { .. } => ActionKind::Delete,
        }
    }

    /// The path this action reads from (the source path for renames).
    pub fn path(&self) -> &str {
        match self {
            Action::Create { path, .. }
            | Action::Overwrite { path, .. }
            | Action::Delete { path } => path,
            Action::Rename { from, .. } => from,
        }
    }
}

// Content is elided so logs stay readable.
impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create { path, content } => {
                write!(f, "Create({}, {} bytes)", path, content.len())
            }
            Action::Overwrite { path, content } => {
                write!(f, "Overwrite({}, {} bytes)", path, content.len())
            }
            Action::Rename { from, to } => write!(f, "Rename({} -> {})", from, to),
            Action::Delete { path } => write!(f, "Delete({})", path),
        }
    }
}
