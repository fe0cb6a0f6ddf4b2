//! The staged tree: a host snapshot plus an append-only action log.

use crate::error::TreeError;
use crate::host::{Content, FilteredHost, Host, MemoryHost, PathFilter};
use crate::tree::action::Action;
use crate::tree::hasher;
use crate::tree::path;
use crate::tree::strategy::MergeStrategy;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique tree identity.
pub type TreeId = u64;

/// Resolved state of a path touched by the action log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    File(Content),
    Deleted,
    /// Moved away by a rename; the value is the destination.
    Moved(String),
}

/// A staged virtual file tree.
///
/// Trees are deliberately not `Clone`: [`Tree::branch`] is the only way to get a
/// second, independent tree over the same content.
pub struct Tree {
    id: TreeId,
    base: Arc<dyn Host>,
    actions: Vec<Action>,
    /// Per-path result of replaying `actions` over `base`, kept current on every mutation.
    staged: BTreeMap<String, Staged>,
    /// (ancestor id, ancestor log length at branch time), oldest first.
    lineage: Vec<(TreeId, usize)>,
    strategy: MergeStrategy,
}

impl Tree {
    /// A tree over an empty in-memory host.
    pub fn empty() -> Self {
        Self::from_host(Arc::new(MemoryHost::new()))
    }

    /// A tree whose base snapshot is read from `host`.
    pub fn from_host(host: Arc<dyn Host>) -> Self {
        Self {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            base: host,
            actions: Vec::new(),
            staged: BTreeMap::new(),
            lineage: Vec::new(),
            strategy: MergeStrategy::Default,
        }
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn base(&self) -> &Arc<dyn Host> {
        &self.base
    }

    /// The action log, in recording order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Resolved state of every path the log touched, sorted by path.
    pub fn staged(&self) -> &BTreeMap<String, Staged> {
        &self.staged
    }

    pub fn merge_strategy(&self) -> MergeStrategy {
        self.strategy
    }

    /// Set the strategy governing direct `create` conflicts on this tree.
    pub fn set_merge_strategy(&mut self, strategy: MergeStrategy) {
        self.strategy = strategy;
    }

    pub fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Read a file's current content.
    pub fn read(&self, file_path: &str) -> Result<Option<Content>, TreeError> {
        let file_path = path::normalize_file(file_path)?;
        self.resolve(&file_path)
    }

    /// Read a file as UTF-8, replacing invalid sequences.
    pub fn read_to_string(&self, file_path: &str) -> Result<Option<String>, TreeError> {
        Ok(self
            .read(file_path)?
            .map(|content| String::from_utf8_lossy(&content).into_owned()))
    }

    /// Whether a file is live. Invalid paths and host failures count as absent;
    /// use [`Tree::exists_checked`] to see them.
    pub fn exists(&self, file_path: &str) -> bool {
        match self.exists_checked(file_path) {
            Ok(live) => live,
            Err(e @ TreeError::InvalidPath(_)) => {
                trace!(path = file_path, error = %e, "exists() treated invalid path as absent");
                false
            }
            Err(e) => {
                warn!(path = file_path, error = %e, "exists() treated host failure as absent");
                false
            }
        }
    }

    /// Whether a file is live, surfacing invalid paths and host failures.
    pub fn exists_checked(&self, file_path: &str) -> Result<bool, TreeError> {
        Ok(self.read(file_path)?.is_some())
    }

    pub fn create(&mut self, file_path: &str, content: impl AsRef<[u8]>) -> Result<(), TreeError> {
        let file_path = path::normalize_file(file_path)?;
        let content = Content::from(content.as_ref());
        self.check_placement(&file_path, None)?;
        if self.resolve(&file_path)?.is_some() {
            if !self.strategy.allows_creation_conflict() {
                return Err(TreeError::AlreadyExists(file_path));
            }
            self.record_overwrite(file_path, content);
        } else {
            self.record_create(file_path, content);
        }
        Ok(())
    }

    pub fn overwrite(
        &mut self,
        file_path: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<(), TreeError> {
        let file_path = path::normalize_file(file_path)?;
        if self.resolve(&file_path)?.is_none() {
            return Err(TreeError::FileDoesNotExist(file_path));
        }
        self.record_overwrite(file_path, Content::from(content.as_ref()));
        Ok(())
    }

    /// Create the file if absent, overwrite it otherwise.
    pub fn write(&mut self, file_path: &str, content: impl AsRef<[u8]>) -> Result<(), TreeError> {
        let file_path = path::normalize_file(file_path)?;
        let content = Content::from(content.as_ref());
        self.check_placement(&file_path, None)?;
        if self.resolve(&file_path)?.is_some() {
            self.record_overwrite(file_path, content);
        } else {
            self.record_create(file_path, content);
        }
        Ok(())
    }

    pub fn delete(&mut self, file_path: &str) -> Result<(), TreeError> {
        let file_path = path::normalize_file(file_path)?;
        if self.resolve(&file_path)?.is_none() {
            return Err(TreeError::FileDoesNotExist(file_path));
        }
        self.record_delete(file_path);
        Ok(())
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), TreeError> {
        let from = path::normalize_file(from)?;
        let to = path::normalize_file(to)?;
        let content = self
            .resolve(&from)?
            .ok_or_else(|| TreeError::FileDoesNotExist(from.clone()))?;
        if from == to {
            return Ok(());
        }
        if self.resolve(&to)?.is_some() {
            return Err(TreeError::AlreadyExists(to));
        }
        self.check_placement(&to, Some(from.as_str()))?;
        self.record_rename(from, to, content);
        Ok(())
    }

    /// Every live file, sorted and deduplicated.
    pub fn files(&self) -> Result<Vec<String>, TreeError> {
        let mut files: BTreeSet<String> = self
            .base
            .files()?
            .into_iter()
            .filter(|file| !self.staged.contains_key(file))
            .collect();
        for (file_path, staged) in &self.staged {
            if let Staged::File(_) = staged {
                files.insert(file_path.clone());
            }
        }
        Ok(files.into_iter().collect())
    }

    /// Sorted names of the immediate children (files and directories) of `dir`.
    pub fn list_dir(&self, dir: &str) -> Result<Vec<String>, TreeError> {
        let dir = path::normalize(dir)?;
        let names: BTreeSet<String> = self
            .files()?
            .iter()
            .filter_map(|file| path::child_segment(file, &dir))
            .map(str::to_string)
            .collect();
        Ok(names.into_iter().collect())
    }

    /// An independent tree over the same base with a copy of this tree's log.
    ///
    /// Cost grows with the log, never with the number of base files.
    pub fn branch(&self) -> Tree {
        let mut lineage = self.lineage.clone();
        lineage.push((self.id, self.actions.len()));
        let branch = Tree {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            base: self.base.clone(),
            actions: self.actions.clone(),
            staged: self.staged.clone(),
            lineage,
            strategy: self.strategy,
        };
        trace!(parent = self.id, branch = branch.id, actions = self.actions.len(), "Branched tree");
        branch
    }

    /// A new tree that only sees paths accepted by `filter`.
    ///
    /// The base is wrapped in a [`FilteredHost`]; the log is reduced to the net
    /// changes on accepted paths.
    pub fn filtered(&self, filter: PathFilter) -> Result<Tree, TreeError> {
        let base: Arc<dyn Host> = Arc::new(FilteredHost::new(self.base.clone(), filter.clone()));
        let mut tree = Tree::from_host(base);
        tree.strategy = self.strategy;
        for (file_path, staged) in &self.staged {
            if !filter(file_path) {
                continue;
            }
            let original = tree.base.read(file_path)?;
            match (staged, original) {
                (Staged::File(content), None) => {
                    tree.record_create(file_path.clone(), content.clone())
                }
                (Staged::File(content), Some(original)) if original[..] != content[..] => {
                    tree.record_overwrite(file_path.clone(), content.clone())
                }
                (Staged::Deleted | Staged::Moved(_), Some(_)) => {
                    tree.record_delete(file_path.clone())
                }
                _ => {}
            }
        }
        Ok(tree)
    }

    /// BLAKE3 fingerprint of the live content, stable across runs.
    pub fn fingerprint(&self) -> Result<String, TreeError> {
        let mut entries = Vec::new();
        for file_path in self.files()? {
            let content = self
                .resolve(&file_path)?
                .ok_or_else(|| TreeError::FileDoesNotExist(file_path.clone()))?;
            entries.push((file_path, content));
        }
        Ok(hasher::compute_tree_fingerprint(
            entries.iter().map(|(p, c)| (p.as_str(), &c[..])),
        ))
    }

    pub(crate) fn resolve(&self, file_path: &str) -> Result<Option<Content>, TreeError> {
        match self.staged.get(file_path) {
            Some(Staged::File(content)) => Ok(Some(content.clone())),
            Some(Staged::Deleted | Staged::Moved(_)) => Ok(None),
            None => self.base.read(file_path),
        }
    }

    /// Fail if a live file sits above `file_path` or below it.
    ///
    /// `leaving` names a file about to move away, which does not count.
    pub(crate) fn check_placement(
        &self,
        file_path: &str,
        leaving: Option<&str>,
    ) -> Result<(), TreeError> {
        let conflict = |existing: &str| TreeError::PathConflict {
            path: file_path.to_string(),
            existing: existing.to_string(),
        };

        let mut dir = path::dirname(file_path);
        while dir != path::ROOT {
            if Some(dir) != leaving && self.resolve(dir)?.is_some() {
                return Err(conflict(dir));
            }
            dir = path::dirname(dir);
        }

        let prefix = format!("{}/", file_path);
        let staged_below = self
            .staged
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(&prefix))
            .find(|(key, staged)| {
                matches!(staged, Staged::File(_)) && Some(key.as_str()) != leaving
            });
        if let Some((key, _)) = staged_below {
            return Err(conflict(key));
        }
        if self.base.is_directory(file_path)? {
            let base_below = self.base.files()?.into_iter().find(|file| {
                path::is_within(file, file_path)
                    && file != file_path
                    && Some(file.as_str()) != leaving
                    && !self.staged.contains_key(file)
            });
            if let Some(file) = base_below {
                return Err(conflict(&file));
            }
        }
        Ok(())
    }

    pub(crate) fn staged_state(&self, file_path: &str) -> Option<&Staged> {
        self.staged.get(file_path)
    }

    /// Length of the log prefix `other` shares with this tree through a common ancestor.
    pub(crate) fn shared_prefix(&self, other: &Tree) -> usize {
        let mine: HashMap<TreeId, usize> = self
            .lineage
            .iter()
            .copied()
            .chain(std::iter::once((self.id, self.actions.len())))
            .collect();
        other
            .lineage
            .iter()
            .copied()
            .chain(std::iter::once((other.id, other.actions.len())))
            .filter_map(|(id, len)| mine.get(&id).map(|own| (*own).min(len)))
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn record_create(&mut self, file_path: String, content: Content) {
        self.staged
            .insert(file_path.clone(), Staged::File(content.clone()));
        self.actions.push(Action::Create {
            path: file_path,
            content,
        });
    }

    pub(crate) fn record_overwrite(&mut self, file_path: String, content: Content) {
        self.staged
            .insert(file_path.clone(), Staged::File(content.clone()));
        self.actions.push(Action::Overwrite {
            path: file_path,
            content,
        });
    }

    pub(crate) fn record_delete(&mut self, file_path: String) {
        self.staged.insert(file_path.clone(), Staged::Deleted);
        self.actions.push(Action::Delete { path: file_path });
    }

    pub(crate) fn record_rename(&mut self, from: String, to: String, content: Content) {
        self.staged.insert(from.clone(), Staged::Moved(to.clone()));
        self.staged.insert(to.clone(), Staged::File(content));
        self.actions.push(Action::Rename { from, to });
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("id", &self.id)
            .field("actions", &self.actions.len())
            .field("staged", &self.staged.len())
            .field("strategy", &self.strategy)
            .finish()
    }
}
