//! Virtual File Tree
//!
//! A staged, branchable, mergeable view of a file system. A tree wraps a host
//! snapshot and an append-only log of actions; nothing reaches a real host until
//! the tree is handed to a sink.

pub mod action;
pub mod hasher;
mod merge;
pub mod path;
pub mod recorder;
mod staged;
pub mod strategy;

pub use crate::host::Content;
pub use action::{Action, ActionKind};
pub use recorder::UpdateRecorder;
pub use staged::{Staged, Tree, TreeId};
pub use strategy::MergeStrategy;
