//! Per-file rules: visiting, filtering and relocating files.

use crate::engine::SchematicContext;
use crate::error::{SchematicError, TreeError};
use crate::host::{Content, PathFilter};
use crate::rules::base::{rule, RuleRef};
use crate::tree::{path, Tree};
use std::sync::Arc;
use tracing::trace;

/// A file handed to a [`for_each`] operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub content: Content,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: impl AsRef<[u8]>) -> Self {
        Self {
            path: path.into(),
            content: Content::from(content.as_ref()),
        }
    }
}

/// Visit every live file in lexicographic path order.
///
/// The operator may return the entry unchanged, with a new path and/or content,
/// or `None` to delete the file. Files created or moved by earlier visits are not
/// visited again.
pub fn for_each<F>(operator: F) -> RuleRef
where
    F: Fn(FileEntry) -> Result<Option<FileEntry>, SchematicError> + Send + Sync + 'static,
{
    rule(move |mut tree: Tree, _context: &SchematicContext| {
        for file_path in tree.files()? {
            let Some(content) = tree.read(&file_path)? else {
                continue;
            };
            let entry = FileEntry {
                path: file_path.clone(),
                content: content.clone(),
            };
            match operator(entry)? {
                None => tree.delete(&file_path)?,
                Some(next) => {
                    let target = path::normalize_file(&next.path)?;
                    if target != file_path {
                        tree.rename(&file_path, &target)?;
                    }
                    if next.content[..] != content[..] {
                        tree.overwrite(&target, &next.content)?;
                    }
                }
            }
        }
        Ok(tree)
    })
}

/// Keep only files whose path satisfies `predicate`.
pub fn filter<F>(predicate: F) -> RuleRef
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    let predicate: PathFilter = Arc::new(predicate);
    rule(move |tree: Tree, _context: &SchematicContext| Ok(tree.filtered(predicate.clone())?))
}

/// Move every file under `from` to the same relative location under `to`.
pub fn move_to(from: &str, to: &str) -> RuleRef {
    let from = from.to_string();
    let to = to.to_string();
    rule(move |mut tree: Tree, _context: &SchematicContext| {
        let from = path::normalize(&from)?;
        let to = path::normalize(&to)?;
        if from == to {
            return Ok(tree);
        }
        for file_path in tree.files()? {
            if !path::is_within(&file_path, &from) {
                continue;
            }
            let target = relocate(&file_path, &from, &to)?;
            trace!(from = %file_path, to = %target, "Moving file");
            tree.rename(&file_path, &target)?;
        }
        Ok(tree)
    })
}

fn relocate(file_path: &str, from: &str, to: &str) -> Result<String, TreeError> {
    if file_path == from {
        // `from` named a single file
        return Ok(to.to_string());
    }
    let relative = if from == path::ROOT {
        &file_path[1..]
    } else {
        &file_path[from.len() + 1..]
    };
    path::join(to, relative)
}
