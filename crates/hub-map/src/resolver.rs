//! Source path resolution.
//!
//! Turns a selected source node into the XPath-like expression stored for a
//! target property, relative to the active source context or to the
//! document root. Resolution always starts from the clicked node handle, so
//! two nodes sharing a key at different places in the tree can never be
//! confused with each other.

use tracing::debug;

use hub_model::{NodeId, SourcePath, SourceTree};

use crate::error::ResolveError;

/// Path from `context` (or the document root) down to `target`.
///
/// - no context, or the root as context: the full path of `target`;
/// - context is a strict ancestor: the part below the context;
/// - context equals target: the empty path, rendered as `/`;
/// - any other context: only the last key of `target`.
pub fn relative_path(target: &SourcePath, context: Option<&SourcePath>) -> SourcePath {
    let Some(context) = context.filter(|c| !c.is_root()) else {
        return target.clone();
    };
    if target == context {
        return SourcePath::root();
    }
    if let Some(rest) = target
        .strip_prefix(context)
        .filter(|_| target.is_descendant_of(context))
    {
        return rest;
    }
    debug!(
        target = %target,
        context = %context,
        "source context is not an ancestor of the selection; keeping last segment"
    );
    match target.key() {
        Some(key) => SourcePath::new([key]),
        None => SourcePath::root(),
    }
}

/// Resolve `target` relative to the node `context` within one tree.
pub fn resolve_path(
    tree: &SourceTree,
    target: NodeId,
    context: Option<NodeId>,
) -> Result<SourcePath, ResolveError> {
    let context_path = match context {
        Some(id) => Some(
            &tree
                .get(id)
                .ok_or(ResolveError::ContextNotFound(id))?
                .path,
        ),
        None => None,
    };
    resolve_from(tree, target, context_path)
}

/// Resolve `target` relative to a context given by path. The context path
/// does not need to exist in `tree`.
pub fn resolve_from(
    tree: &SourceTree,
    target: NodeId,
    context: Option<&SourcePath>,
) -> Result<SourcePath, ResolveError> {
    let node = tree.get(target).ok_or(ResolveError::NodeNotFound(target))?;
    Ok(relative_path(&node.path, context))
}

/// Parse a typed expression that is a plain key path (no functions,
/// predicates or axes). Accepts exactly what [`SourcePath`] renders, quoted
/// `node('...')` keys included. `/` and the empty string yield the root path.
pub fn parse_plain_path(expression: &str) -> Option<SourcePath> {
    SourcePath::parse(expression).ok()
}

/// Locate the node a typed plain path points at, relative to `context`.
pub fn resolve_expression(
    tree: &SourceTree,
    expression: &str,
    context: Option<&SourcePath>,
) -> Result<NodeId, ResolveError> {
    let relative =
        parse_plain_path(expression).ok_or_else(|| ResolveError::NotAPath(expression.to_string()))?;
    let full = match context {
        Some(context) => context.join(&relative),
        None => relative,
    };
    tree.find(&full)
        .ok_or_else(|| ResolveError::PathNotFound(full.to_string()))
}
