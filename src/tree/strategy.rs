//! Merge strategies
//!
//! A strategy decides which conflict shapes are tolerated when one tree's action
//! log is replayed onto another, and how refused conflicts are reported.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Refuse every conflict, reporting it as the underlying tree error.
    #[default]
    Default,
    /// Accept every conflict; incoming actions win.
    Overwrite,
    /// Refuse every conflict, reporting it as a merge conflict.
    Error,
    /// Accept overwrites of paths this tree already changed or deleted.
    AllowOverwriteConflict,
    /// Accept creations of paths that already exist here.
    AllowCreationConflict,
    /// Accept deletions of paths that do not exist here.
    AllowDeleteConflict,
}

impl MergeStrategy {
    pub fn allows_overwrite_conflict(self) -> bool {
        matches!(
            self,
            MergeStrategy::Overwrite | MergeStrategy::AllowOverwriteConflict
        )
    }

    pub fn allows_creation_conflict(self) -> bool {
        matches!(
            self,
            MergeStrategy::Overwrite | MergeStrategy::AllowCreationConflict
        )
    }

    pub fn allows_delete_conflict(self) -> bool {
        matches!(
            self,
            MergeStrategy::Overwrite | MergeStrategy::AllowDeleteConflict
        )
    }

    /// Whether refused conflicts surface as `MergeConflict` instead of the natural error.
    pub fn reports_merge_conflicts(self) -> bool {
        self == MergeStrategy::Error
    }
}
