//! Local view state of the source and entity tables: expansion, name
//! filter, key sort and column visibility. Each table owns its own view.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use hub_model::{NodeId, PropertyPath, SourceTree};

use crate::state::EntityTable;

/// Order of sibling rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Document,
    Ascending,
    Descending,
}

/// Hierarchical rows a [`TreeView`] can display.
pub trait RowTree {
    type Key: Clone + Ord;

    fn roots(&self) -> Vec<Self::Key>;

    fn children(&self, key: &Self::Key) -> Vec<Self::Key>;

    fn label(&self, key: &Self::Key) -> &str;
}

impl RowTree for SourceTree {
    type Key = NodeId;

    fn roots(&self) -> Vec<NodeId> {
        self.top_level().to_vec()
    }

    fn children(&self, key: &NodeId) -> Vec<NodeId> {
        SourceTree::children(self, Some(*key)).to_vec()
    }

    fn label(&self, key: &NodeId) -> &str {
        self.get(*key).map_or("", |node| node.key.as_str())
    }
}

impl RowTree for EntityTable {
    type Key = PropertyPath;

    fn roots(&self) -> Vec<PropertyPath> {
        self.rows
            .iter()
            .filter(|row| row.depth() == 0)
            .map(|row| row.path.clone())
            .collect()
    }

    fn children(&self, key: &PropertyPath) -> Vec<PropertyPath> {
        self.rows
            .iter()
            .filter(|row| row.path.parent().as_ref() == Some(key))
            .map(|row| row.path.clone())
            .collect()
    }

    fn label(&self, key: &PropertyPath) -> &str {
        self.row(key).map_or("", |row| row.name())
    }
}

/// A row as currently shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleRow<K> {
    pub key: K,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
}

#[derive(Debug, Clone)]
pub struct TreeView<K> {
    expanded: BTreeSet<K>,
    filter: String,
    sort: SortOrder,
}

impl<K: Clone + Ord> Default for TreeView<K> {
    fn default() -> Self {
        Self {
            expanded: BTreeSet::new(),
            filter: String::new(),
            sort: SortOrder::Document,
        }
    }
}

impl<K: Clone + Ord> TreeView<K> {
    pub fn new(sort: SortOrder) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn is_expanded(&self, key: &K) -> bool {
        self.expanded.contains(key)
    }

    pub fn toggle(&mut self, key: &K) {
        if !self.expanded.remove(key) {
            self.expanded.insert(key.clone());
        }
    }

    pub fn expand_all<T: RowTree<Key = K>>(&mut self, tree: &T) {
        let mut stack = tree.roots();
        while let Some(key) = stack.pop() {
            let children = tree.children(&key);
            if !children.is_empty() {
                self.expanded.insert(key);
                stack.extend(children);
            }
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Case-insensitive name filter; empty text shows everything.
    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.trim().to_lowercase();
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    fn ordered<T: RowTree<Key = K>>(&self, tree: &T, mut keys: Vec<K>) -> Vec<K> {
        match self.sort {
            SortOrder::Document => {}
            SortOrder::Ascending => {
                keys.sort_by(|a, b| tree.label(a).cmp(tree.label(b)));
            }
            SortOrder::Descending => {
                keys.sort_by(|a, b| tree.label(b).cmp(tree.label(a)));
            }
        }
        keys
    }

    fn matches<T: RowTree<Key = K>>(&self, tree: &T, key: &K) -> bool {
        tree.label(key).to_lowercase().contains(&self.filter)
    }

    fn subtree_matches<T: RowTree<Key = K>>(&self, tree: &T, key: &K) -> bool {
        self.matches(tree, key)
            || tree
                .children(key)
                .iter()
                .any(|child| self.subtree_matches(tree, child))
    }

    /// Rows currently shown, in display order. With a filter, matching rows
    /// and their ancestors are shown whatever their expansion.
    pub fn visible_rows<T: RowTree<Key = K>>(&self, tree: &T) -> Vec<VisibleRow<K>> {
        let mut out = Vec::new();
        self.push_visible(tree, tree.roots(), 0, &mut out);
        out
    }

    fn push_visible<T: RowTree<Key = K>>(
        &self,
        tree: &T,
        keys: Vec<K>,
        depth: usize,
        out: &mut Vec<VisibleRow<K>>,
    ) {
        let filtering = !self.filter.is_empty();
        for key in self.ordered(tree, keys) {
            if filtering && !self.subtree_matches(tree, &key) {
                continue;
            }
            let children = tree.children(&key);
            let descend = if filtering {
                children.iter().any(|child| self.subtree_matches(tree, child))
            } else {
                self.expanded.contains(&key)
            };
            out.push(VisibleRow {
                key: key.clone(),
                depth,
                has_children: !children.is_empty(),
                expanded: descend && !children.is_empty(),
            });
            if descend {
                self.push_visible(tree, children, depth + 1, out);
            }
        }
    }
}

/// Columns of an entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityColumn {
    Name,
    Type,
    Expression,
    Value,
}

impl EntityColumn {
    pub const ALL: [EntityColumn; 4] = [
        EntityColumn::Name,
        EntityColumn::Type,
        EntityColumn::Expression,
        EntityColumn::Value,
    ];
}

impl fmt::Display for EntityColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityColumn::Name => "Name",
            EntityColumn::Type => "Type",
            EntityColumn::Expression => "XPath Expression",
            EntityColumn::Value => "Value",
        })
    }
}

/// Entity table columns hidden through the column options menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnVisibility {
    hidden: BTreeSet<EntityColumn>,
}

impl ColumnVisibility {
    pub fn is_visible(&self, column: EntityColumn) -> bool {
        !self.hidden.contains(&column)
    }

    pub fn set_visible(&mut self, column: EntityColumn, visible: bool) {
        if visible {
            self.hidden.remove(&column);
        } else {
            self.hidden.insert(column);
        }
    }

    pub fn toggle(&mut self, column: EntityColumn) {
        let visible = self.is_visible(column);
        self.set_visible(column, !visible);
    }

    pub fn visible(&self) -> Vec<EntityColumn> {
        EntityColumn::ALL
            .into_iter()
            .filter(|column| self.is_visible(*column))
            .collect()
    }
}
