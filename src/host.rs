//! Host Storage
//!
//! A host is the byte-addressable storage a tree reads its base snapshot from and
//! that a finished tree is eventually committed to. Paths handed to a host are
//! virtual, absolute and POSIX-style (see [`crate::tree::path`]).

use crate::error::TreeError;
use crate::tree::path;
use std::sync::Arc;

pub mod disk;
pub mod filtered;
pub mod memory;

pub use disk::{DiskHost, DiskHostConfig};
pub use filtered::{FilteredHost, PathFilter};
pub use memory::MemoryHost;

/// Immutable, cheaply clonable file content.
pub type Content = Arc<[u8]>;

/// Storage backend consumed by trees and sinks.
pub trait Host: Send + Sync {
    /// Read a file. Directories and missing paths read as `None`.
    fn read(&self, path: &str) -> Result<Option<Content>, TreeError>;

    fn write(&self, path: &str, content: &[u8]) -> Result<(), TreeError>;

    fn delete(&self, path: &str) -> Result<(), TreeError>;

    /// Names of the immediate children of a directory, sorted.
    fn list(&self, path: &str) -> Result<Vec<String>, TreeError>;

    fn is_file(&self, path: &str) -> Result<bool, TreeError>;

    fn is_directory(&self, path: &str) -> Result<bool, TreeError>;

    fn exists(&self, path: &str) -> Result<bool, TreeError> {
        Ok(self.is_file(path)? || self.is_directory(path)?)
    }

    /// Every file below the root, sorted.
    fn files(&self) -> Result<Vec<String>, TreeError> {
        let mut files = Vec::new();
        let mut pending = vec![path::ROOT.to_string()];
        while let Some(dir) = pending.pop() {
            for name in self.list(&dir)? {
                let child = path::join(&dir, &name)?;
                if self.is_file(&child)? {
                    files.push(child);
                } else if self.is_directory(&child)? {
                    pending.push(child);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}
