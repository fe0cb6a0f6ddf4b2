//! Disk-backed host rooted at a real directory.
//!
//! Only used to read a base snapshot and as a commit target; trees never write
//! through it on their own.

use crate::error::TreeError;
use crate::host::{Content, Host};
use crate::tree::path;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Disk host configuration
#[derive(Debug, Clone)]
pub struct DiskHostConfig {
    /// Whether to follow symbolic links that stay inside the root (default: false)
    pub follow_symlinks: bool,
    /// Entry names that are never listed (e.g., ".git", "target", "node_modules")
    pub ignore_patterns: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

impl Default for DiskHostConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_patterns: vec![
                ".git".to_string(),
                "target".to_string(),
                "node_modules".to_string(),
            ],
            max_depth: None,
        }
    }
}

pub struct DiskHost {
    root: PathBuf,
    config: DiskHostConfig,
}

impl DiskHost {
    /// Create a host rooted at an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, TreeError> {
        Self::with_config(root, DiskHostConfig::default())
    }

    pub fn with_config(root: impl AsRef<Path>, config: DiskHostConfig) -> Result<Self, TreeError> {
        let root = root.as_ref();
        let root = dunce::canonicalize(root).map_err(|e| {
            TreeError::host(&root.display().to_string(), format!("Failed to canonicalize root: {}", e))
        })?;
        if !root.is_dir() {
            return Err(TreeError::host(
                &root.display().to_string(),
                "root is not a directory",
            ));
        }
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn to_fs_path(&self, virtual_path: &str) -> Result<(String, PathBuf), TreeError> {
        let normalized = path::normalize(virtual_path)?;
        let mut fs_path = self.root.clone();
        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            fs_path.push(segment);
            self.check_link(&normalized, &fs_path)?;
        }
        Ok((normalized, fs_path))
    }

    /// Refuse symbolic links unless following is enabled, and even then refuse
    /// links that resolve outside the root.
    fn check_link(&self, normalized: &str, fs_path: &Path) -> Result<(), TreeError> {
        let metadata = match fs::symlink_metadata(fs_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(TreeError::host(normalized, e)),
        };
        if !metadata.file_type().is_symlink() {
            return Ok(());
        }
        if !self.config.follow_symlinks {
            return Err(TreeError::host(normalized, "path crosses a symbolic link"));
        }
        let target = dunce::canonicalize(fs_path).map_err(|e| TreeError::host(normalized, e))?;
        if !target.starts_with(&self.root) {
            return Err(TreeError::host(
                normalized,
                "symbolic link points outside the root",
            ));
        }
        Ok(())
    }

    fn should_ignore(&self, name: &str) -> bool {
        self.config.ignore_patterns.iter().any(|pattern| pattern == name)
    }

    fn is_ignored_entry(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .map_or(false, |name| self.should_ignore(name))
    }

    fn to_virtual_path(&self, fs_path: &Path) -> Option<String> {
        let relative = fs_path.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        path::normalize(&segments.join("/")).ok()
    }
}

impl Host for DiskHost {
    fn read(&self, virtual_path: &str) -> Result<Option<Content>, TreeError> {
        let (normalized, fs_path) = self.to_fs_path(virtual_path)?;
        if fs_path.is_dir() {
            return Ok(None);
        }
        match fs::read(&fs_path) {
            Ok(bytes) => Ok(Some(Content::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TreeError::host(&normalized, e)),
        }
    }

    fn write(&self, virtual_path: &str, content: &[u8]) -> Result<(), TreeError> {
        let (normalized, fs_path) = self.to_fs_path(virtual_path)?;
        if normalized == path::ROOT {
            return Err(TreeError::InvalidPath(normalized));
        }
        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent).map_err(|e| TreeError::host(&normalized, e))?;
        }
        fs::write(&fs_path, content).map_err(|e| TreeError::host(&normalized, e))?;
        debug!(path = %normalized, bytes = content.len(), "Wrote file");
        Ok(())
    }

    fn delete(&self, virtual_path: &str) -> Result<(), TreeError> {
        let (normalized, fs_path) = self.to_fs_path(virtual_path)?;
        match fs::remove_file(&fs_path) {
            Ok(()) => {
                debug!(path = %normalized, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %normalized, "Delete of missing file ignored");
                Ok(())
            }
            Err(e) => Err(TreeError::host(&normalized, e)),
        }
    }

    fn list(&self, virtual_path: &str) -> Result<Vec<String>, TreeError> {
        let (normalized, fs_path) = self.to_fs_path(virtual_path)?;
        let entries = match fs::read_dir(&fs_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TreeError::host(&normalized, e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TreeError::host(&normalized, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_link = entry
                .file_type()
                .map_err(|e| TreeError::host(&normalized, e))?
                .is_symlink();
            if is_link && !self.config.follow_symlinks {
                continue;
            }
            if !self.should_ignore(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn is_file(&self, virtual_path: &str) -> Result<bool, TreeError> {
        let (_, fs_path) = self.to_fs_path(virtual_path)?;
        Ok(fs_path.is_file())
    }

    fn is_directory(&self, virtual_path: &str) -> Result<bool, TreeError> {
        let (_, fs_path) = self.to_fs_path(virtual_path)?;
        Ok(fs_path.is_dir())
    }

    fn files(&self) -> Result<Vec<String>, TreeError> {
        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|entry| !self.is_ignored_entry(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                TreeError::host(path::ROOT, format!("Failed to walk directory: {}", e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(virtual_path) = self.to_virtual_path(entry.path()) {
                files.push(virtual_path);
            }
        }
        files.sort();
        debug!(file_count = files.len(), root = %self.root.display(), "Listed disk host");
        Ok(files)
    }
}
