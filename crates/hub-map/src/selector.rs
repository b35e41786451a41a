//! Options offered by the per-property source selector.

use hub_model::{NodeId, SourcePath, SourceTree};

/// Indentation applied per nesting level in the selector list.
pub const INDENT_PX: usize = 20;

/// One entry of the source selector dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOption {
    pub id: NodeId,
    pub key: String,
    pub path: SourcePath,
    pub depth: usize,
    /// Shown with the "Multiple" icon.
    pub is_array: bool,
    pub has_children: bool,
}

impl SourceOption {
    pub fn indent_px(&self) -> usize {
        self.depth * INDENT_PX
    }
}

/// Every node of `tree` in document order. Merged nodes appear once.
pub fn source_options(tree: &SourceTree) -> Vec<SourceOption> {
    tree.walk()
        .into_iter()
        .filter_map(|id| tree.get(id))
        .map(|node| SourceOption {
            id: node.id,
            key: node.key.clone(),
            path: node.path.clone(),
            depth: node.depth(),
            is_array: node.is_array,
            has_children: node.has_children(),
        })
        .collect()
}

/// Options whose key contains `search`, ignoring case. An empty search
/// keeps everything.
pub fn search_options<'a>(options: &'a [SourceOption], search: &str) -> Vec<&'a SourceOption> {
    let needle = search.trim().to_lowercase();
    options
        .iter()
        .filter(|option| needle.is_empty() || option.key.to_lowercase().contains(&needle))
        .collect()
}
