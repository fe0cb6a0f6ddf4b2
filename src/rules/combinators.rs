//! Composition operators and the stock sources.

use crate::engine::SchematicContext;
use crate::error::SchematicError;
use crate::host::Content;
use crate::rules::base::{source, RuleOutput, RuleRef, SourceRef};
use crate::tree::{MergeStrategy, Tree};
use std::sync::Arc;
use tracing::debug;

/// Returns its input unchanged.
pub fn noop() -> RuleRef {
    Arc::new(|tree: Tree, _context: &SchematicContext| RuleOutput::from(tree))
}

/// Run rules in order, each on the previous one's result.
pub fn chain(rules: impl IntoIterator<Item = RuleRef>) -> RuleRef {
    let rules: Arc<[RuleRef]> = rules.into_iter().collect();
    Arc::new(move |tree: Tree, context: &SchematicContext| {
        RuleOutput::Future(Box::pin(run_chain(rules.clone(), tree, context.clone())))
    })
}

async fn run_chain(
    rules: Arc<[RuleRef]>,
    mut tree: Tree,
    context: SchematicContext,
) -> Result<Tree, SchematicError> {
    for (index, rule) in rules.iter().enumerate() {
        tree = rule.apply(tree, &context).resolve().await?;
        debug!(step = index, actions = tree.actions().len(), "Chain step finished");
    }
    Ok(tree)
}

/// A source whose fresh tree is passed through `rules`.
pub fn apply(source: SourceRef, rules: impl IntoIterator<Item = RuleRef>) -> SourceRef {
    let rule = chain(rules);
    Arc::new(move |context: &SchematicContext| {
        let created = source.create(context);
        let rule = rule.clone();
        let context = context.clone();
        RuleOutput::Future(Box::pin(async move {
            let tree = created.resolve().await?;
            rule.apply(tree, &context).resolve().await
        }))
    })
}

/// Merge a source's tree into the working tree.
///
/// `MergeStrategy::Default` defers to the context's strategy.
pub fn merge_with(source: SourceRef, strategy: MergeStrategy) -> RuleRef {
    Arc::new(move |tree: Tree, context: &SchematicContext| {
        let strategy = effective_strategy(strategy, context);
        let incoming = source.create(context);
        RuleOutput::Future(Box::pin(merge_resolved(tree, incoming, strategy)))
    })
}

/// Run `rule` on a branch of the working tree and merge the branch back.
pub fn branch_and_merge(rule: RuleRef, strategy: MergeStrategy) -> RuleRef {
    Arc::new(move |tree: Tree, context: &SchematicContext| {
        let strategy = effective_strategy(strategy, context);
        let branched = rule.apply(tree.branch(), context);
        RuleOutput::Future(Box::pin(merge_resolved(tree, branched, strategy)))
    })
}

fn effective_strategy(strategy: MergeStrategy, context: &SchematicContext) -> MergeStrategy {
    if strategy == MergeStrategy::Default {
        context.strategy()
    } else {
        strategy
    }
}

async fn merge_resolved(
    mut tree: Tree,
    incoming: RuleOutput,
    strategy: MergeStrategy,
) -> Result<Tree, SchematicError> {
    let other = incoming.resolve().await?;
    tree.merge(&other, strategy)?;
    Ok(tree)
}

/// A source producing an empty tree.
pub fn empty() -> SourceRef {
    source(|_context| Ok(Tree::empty()))
}

/// A source materializing the given files into an empty tree.
pub fn files_source<P, C, I>(files: I) -> SourceRef
where
    I: IntoIterator<Item = (P, C)>,
    P: Into<String>,
    C: AsRef<[u8]>,
{
    let files: Vec<(String, Content)> = files
        .into_iter()
        .map(|(p, c)| (p.into(), Content::from(c.as_ref())))
        .collect();
    source(move |_context| {
        let mut tree = Tree::empty();
        for (file_path, content) in &files {
            tree.create(file_path, content)?;
        }
        Ok(tree)
    })
}

/// A source handing out a fresh branch of `tree` on every invocation.
pub fn tree_source(tree: Tree) -> SourceRef {
    let held = Arc::new(tree);
    source(move |_context| Ok(held.branch()))
}
