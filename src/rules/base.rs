//! Rule and source traits, and the output type they share.

use crate::engine::SchematicContext;
use crate::error::SchematicError;
use crate::tree::Tree;
use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub type TreeFuture = BoxFuture<'static, Result<Tree, SchematicError>>;
pub type TreeStream = BoxStream<'static, Result<Tree, SchematicError>>;

/// What a rule or source hands back.
pub enum RuleOutput {
    Ready(Result<Tree, SchematicError>),
    Future(TreeFuture),
    /// Every emitted tree but the last is discarded.
    Stream(TreeStream),
}

impl RuleOutput {
    pub fn error(err: impl Into<SchematicError>) -> Self {
        RuleOutput::Ready(Err(err.into()))
    }

    /// Drive the output to completion.
    ///
    /// A stream resolves to its last tree; an empty stream is `EmptyRuleResult`
    /// and the first error item ends the stream.
    pub async fn resolve(self) -> Result<Tree, SchematicError> {
        match self {
            RuleOutput::Ready(result) => result,
            RuleOutput::Future(future) => future.await,
            RuleOutput::Stream(mut stream) => {
                let mut last = None;
                while let Some(item) = stream.next().await {
                    last = Some(item?);
                }
                last.ok_or(SchematicError::EmptyRuleResult)
            }
        }
    }

    /// Convert into a boxed future without polling anything yet.
    pub fn into_future(self) -> TreeFuture {
        match self {
            RuleOutput::Future(future) => future,
            other => Box::pin(other.resolve()),
        }
    }
}

impl From<Tree> for RuleOutput {
    fn from(tree: Tree) -> Self {
        RuleOutput::Ready(Ok(tree))
    }
}

impl From<Result<Tree, SchematicError>> for RuleOutput {
    fn from(result: Result<Tree, SchematicError>) -> Self {
        RuleOutput::Ready(result)
    }
}

impl fmt::Debug for RuleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOutput::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            RuleOutput::Future(_) => f.write_str("Future(..)"),
            RuleOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A tree transformation.
pub trait Rule: Send + Sync {
    fn apply(&self, tree: Tree, context: &SchematicContext) -> RuleOutput;
}

impl<F> Rule for F
where
    F: Fn(Tree, &SchematicContext) -> RuleOutput + Send + Sync,
{
    fn apply(&self, tree: Tree, context: &SchematicContext) -> RuleOutput {
        self(tree, context)
    }
}

pub type RuleRef = Arc<dyn Rule>;

/// Produces a fresh tree.
pub trait Source: Send + Sync {
    fn create(&self, context: &SchematicContext) -> RuleOutput;
}

impl<F> Source for F
where
    F: Fn(&SchematicContext) -> RuleOutput + Send + Sync,
{
    fn create(&self, context: &SchematicContext) -> RuleOutput {
        self(context)
    }
}

pub type SourceRef = Arc<dyn Source>;

/// Wrap a synchronous closure as a rule.
pub fn rule<F>(f: F) -> RuleRef
where
    F: Fn(Tree, &SchematicContext) -> Result<Tree, SchematicError> + Send + Sync + 'static,
{
    Arc::new(move |tree: Tree, context: &SchematicContext| RuleOutput::Ready(f(tree, context)))
}

/// Wrap an async closure as a rule. The closure gets its own handle on the context.
pub fn rule_async<F, Fut>(f: F) -> RuleRef
where
    F: Fn(Tree, SchematicContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Tree, SchematicError>> + Send + 'static,
{
    Arc::new(move |tree: Tree, context: &SchematicContext| {
        RuleOutput::Future(Box::pin(f(tree, context.clone())))
    })
}

/// Wrap a synchronous closure as a source.
pub fn source<F>(f: F) -> SourceRef
where
    F: Fn(&SchematicContext) -> Result<Tree, SchematicError> + Send + Sync + 'static,
{
    Arc::new(move |context: &SchematicContext| RuleOutput::Ready(f(context)))
}
