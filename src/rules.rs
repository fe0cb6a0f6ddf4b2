//! Rules
//!
//! A rule turns one tree into another. Rules may finish immediately, hand back a
//! future, or emit a stream of trees; [`RuleOutput::resolve`] collapses all three
//! into a single result. Sources are rules without an input tree.

pub mod base;
pub mod combinators;
pub mod schematic;
pub mod visitors;

pub use base::{
    rule, rule_async, source, Rule, RuleOutput, RuleRef, Source, SourceRef, TreeFuture,
    TreeStream,
};
pub use combinators::{
    apply, branch_and_merge, chain, empty, files_source, merge_with, noop, tree_source,
};
pub use schematic::{external_schematic, schematic};
pub use visitors::{filter, for_each, move_to, FileEntry};
