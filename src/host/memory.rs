//! In-memory host.

use crate::error::TreeError;
use crate::host::{Content, Host};
use crate::tree::path;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// Thread-safe in-memory host keyed by normalized path.
#[derive(Debug, Default)]
pub struct MemoryHost {
    files: RwLock<BTreeMap<String, Content>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a host pre-populated with files.
    pub fn with_files<P, C, I>(files: I) -> Result<Self, TreeError>
    where
        P: AsRef<str>,
        C: AsRef<[u8]>,
        I: IntoIterator<Item = (P, C)>,
    {
        let host = Self::new();
        for (file_path, content) in files {
            host.write(file_path.as_ref(), content.as_ref())?;
        }
        Ok(host)
    }

    /// Copy of every stored file.
    pub fn snapshot(&self) -> BTreeMap<String, Content> {
        self.files.read().clone()
    }

    fn file_ancestor<'a>(files: &BTreeMap<String, Content>, file_path: &'a str) -> Option<&'a str> {
        let mut dir = path::dirname(file_path);
        while dir != path::ROOT {
            if files.contains_key(dir) {
                return Some(dir);
            }
            dir = path::dirname(dir);
        }
        None
    }

    fn has_children(files: &BTreeMap<String, Content>, dir: &str) -> bool {
        if dir == path::ROOT {
            return !files.is_empty();
        }
        let prefix = format!("{}/", dir);
        files
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .next()
            .map_or(false, |(key, _)| key.starts_with(&prefix))
    }
}

impl Host for MemoryHost {
    fn read(&self, file_path: &str) -> Result<Option<Content>, TreeError> {
        let file_path = path::normalize(file_path)?;
        Ok(self.files.read().get(&file_path).cloned())
    }

    fn write(&self, file_path: &str, content: &[u8]) -> Result<(), TreeError> {
        let file_path = path::normalize_file(file_path)?;
        let mut files = self.files.write();
        if Self::has_children(&files, &file_path) {
            return Err(TreeError::host(&file_path, "path is a directory"));
        }
        if let Some(parent) = Self::file_ancestor(&files, &file_path) {
            return Err(TreeError::host(
                &file_path,
                format!("parent {} is a file", parent),
            ));
        }
        files.insert(file_path, Content::from(content));
        Ok(())
    }

    fn delete(&self, file_path: &str) -> Result<(), TreeError> {
        let file_path = path::normalize_file(file_path)?;
        self.files.write().remove(&file_path);
        Ok(())
    }

    fn list(&self, dir: &str) -> Result<Vec<String>, TreeError> {
        let dir = path::normalize(dir)?;
        let files = self.files.read();
        let names: BTreeSet<String> = files
            .keys()
            .filter_map(|key| path::child_segment(key, &dir))
            .map(str::to_string)
            .collect();
        Ok(names.into_iter().collect())
    }

    fn is_file(&self, file_path: &str) -> Result<bool, TreeError> {
        let file_path = path::normalize(file_path)?;
        Ok(self.files.read().contains_key(&file_path))
    }

    fn is_directory(&self, dir: &str) -> Result<bool, TreeError> {
        let dir = path::normalize(dir)?;
        if dir == path::ROOT {
            return Ok(true);
        }
        Ok(Self::has_children(&self.files.read(), &dir))
    }

    fn files(&self) -> Result<Vec<String>, TreeError> {
        Ok(self.files.read().keys().cloned().collect())
    }
}
