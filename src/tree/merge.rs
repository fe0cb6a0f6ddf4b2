//! Merging one tree's action log into another.

use crate::error::TreeError;
use crate::tree::action::Action;
use crate::tree::staged::{Staged, Tree};
use crate::tree::strategy::MergeStrategy;
use tracing::debug;

/// Report a refused conflict the way the strategy asks for.
fn refuse(strategy: MergeStrategy, path: &str, natural: TreeError) -> TreeError {
    if strategy.reports_merge_conflicts() {
        TreeError::MergeConflict(path.to_string())
    } else {
        natural
    }
}

impl Tree {
    /// Replay `other`'s actions onto this tree.
    ///
    /// Actions `other` inherited from a common ancestor are skipped, so merging a
    /// branch back into the tree it came from only replays the branch's own work.
    /// Actions whose outcome is already present here are skipped; real conflicts
    /// are accepted or refused according to `strategy`. On error the actions
    /// replayed before the failing one stay recorded.
    pub fn merge(&mut self, other: &Tree, strategy: MergeStrategy) -> Result<(), TreeError> {
        let skip = self.shared_prefix(other);
        let incoming = &other.actions()[skip..];
        debug!(
            target_tree = self.id(),
            source_tree = other.id(),
            skipped = skip,
            replayed = incoming.len(),
            ?strategy,
            "Merging trees"
        );

        for action in incoming {
            match action {
                Action::Create { path, content } => match self.resolve(path)? {
                    Some(existing) if existing[..] == content[..] => {}
                    Some(_) => {
                        if !strategy.allows_creation_conflict() {
                            return Err(refuse(
                                strategy,
                                path,
                                TreeError::AlreadyExists(path.clone()),
                            ));
                        }
                        self.record_overwrite(path.clone(), content.clone());
                    }
                    None => {
                        self.check_placement(path, None)?;
                        self.record_create(path.clone(), content.clone());
                    }
                },
                Action::Overwrite { path, content } => {
                    let changed_here = matches!(self.staged_state(path), Some(Staged::File(_)));
                    match self.resolve(path)? {
                        Some(existing) if existing[..] == content[..] => {}
                        Some(_) if changed_here && !strategy.allows_overwrite_conflict() => {
                            return Err(TreeError::MergeConflict(path.clone()));
                        }
                        Some(_) => self.record_overwrite(path.clone(), content.clone()),
                        None => {
                            if !strategy.allows_overwrite_conflict() {
                                return Err(refuse(
                                    strategy,
                                    path,
                                    TreeError::FileDoesNotExist(path.clone()),
                                ));
                            }
                            self.check_placement(path, None)?;
                            self.record_create(path.clone(), content.clone());
                        }
                    }
                }
                Action::Rename { from, to } => match self.staged_state(from) {
                    Some(Staged::Moved(dest)) if dest == to => {}
                    Some(Staged::Moved(_) | Staged::Deleted) => {
                        return Err(TreeError::MergeConflict(from.clone()))
                    }
                    _ => self.rename(from, to).map_err(|e| match e {
                        TreeError::AlreadyExists(_)
                        | TreeError::FileDoesNotExist(_)
                        | TreeError::PathConflict { .. } => TreeError::MergeConflict(from.clone()),
                        other => other,
                    })?,
                },
                Action::Delete { path } => match self.staged_state(path) {
                    Some(Staged::Deleted | Staged::Moved(_)) => {}
                    _ => {
                        if self.resolve(path)?.is_some() {
                            self.record_delete(path.clone());
                        } else if !strategy.allows_delete_conflict() {
                            return Err(refuse(
                                strategy,
                                path,
                                TreeError::FileDoesNotExist(path.clone()),
                            ));
                        }
                    }
                },
            }
        }
        Ok(())
    }
}
