//! Filtering host: a delegating view that hides paths rejected by a predicate.

use crate::error::TreeError;
use crate::host::{Content, Host};
use crate::tree::path;
use std::sync::Arc;

/// Path predicate shared between hosts, trees and rules.
pub type PathFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

pub struct FilteredHost {
    inner: Arc<dyn Host>,
    filter: PathFilter,
}

impl FilteredHost {
    pub fn new(inner: Arc<dyn Host>, filter: PathFilter) -> Self {
        Self { inner, filter }
    }

    fn visible(&self, file_path: &str) -> bool {
        (self.filter)(file_path)
    }

    /// A directory is visible when at least one file below it is.
    fn has_visible_files(&self, dir: &str) -> Result<bool, TreeError> {
        Ok(self
            .inner
            .files()?
            .iter()
            .any(|file| path::is_within(file, dir) && file != dir && self.visible(file)))
    }
}

impl Host for FilteredHost {
    fn read(&self, file_path: &str) -> Result<Option<Content>, TreeError> {
        let file_path = path::normalize(file_path)?;
        if !self.visible(&file_path) {
            return Ok(None);
        }
        self.inner.read(&file_path)
    }

    fn write(&self, file_path: &str, content: &[u8]) -> Result<(), TreeError> {
        let file_path = path::normalize_file(file_path)?;
        if !self.visible(&file_path) {
            return Err(TreeError::host(&file_path, "path is filtered out"));
        }
        self.inner.write(&file_path, content)
    }

    fn delete(&self, file_path: &str) -> Result<(), TreeError> {
        let file_path = path::normalize_file(file_path)?;
        if !self.visible(&file_path) {
            return Err(TreeError::host(&file_path, "path is filtered out"));
        }
        self.inner.delete(&file_path)
    }

    fn list(&self, dir: &str) -> Result<Vec<String>, TreeError> {
        let dir = path::normalize(dir)?;
        let mut names = Vec::new();
        for name in self.inner.list(&dir)? {
            let child = path::join(&dir, &name)?;
            if self.is_file(&child)? || self.is_directory(&child)? {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn is_file(&self, file_path: &str) -> Result<bool, TreeError> {
        let file_path = path::normalize(file_path)?;
        Ok(self.visible(&file_path) && self.inner.is_file(&file_path)?)
    }

    fn is_directory(&self, dir: &str) -> Result<bool, TreeError> {
        let dir = path::normalize(dir)?;
        if dir == path::ROOT {
            return Ok(true);
        }
        Ok(self.inner.is_directory(&dir)? && self.has_visible_files(&dir)?)
    }

    fn files(&self) -> Result<Vec<String>, TreeError> {
        Ok(self
            .inner
            .files()?
            .into_iter()
            .filter(|file| self.visible(file))
            .collect())
    }
}
