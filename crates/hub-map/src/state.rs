//! Mapping state for the entity tables of one mapping step.
//!
//! The [`MappingArtifact`] is the single store of expressions. Entity tables
//! add the row layout derived from the entity definition and the source
//! contexts that selections are resolved against.

use std::collections::BTreeMap;

use tracing::debug;

use hub_model::{
    EntityDefinition, EntityProperty, MappingArtifact, NodeId, PropertyPath, SourcePath,
    SourceTree, TableId,
};

use crate::error::{MappingError, Result};
use crate::resolver::{parse_plain_path, resolve_from, resolve_path};

/// One target property row of an entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    pub path: PropertyPath,
    pub datatype: String,
    pub multiple: bool,
    /// Has nested properties; its selected source node scopes the children.
    pub structured: bool,
    pub related_entity_type: Option<String>,
}

impl PropertyRow {
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Nesting level below the table; top-level properties have depth 0.
    pub fn depth(&self) -> usize {
        self.path.names().len() - 1
    }
}

/// A primary or related entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTable {
    pub id: TableId,
    pub title: String,
    pub entity_type: String,
    /// Table this one is related through; `None` for the primary table and
    /// for tables related directly to it.
    pub parent: Option<TableId>,
    /// Property rows in definition order, parents before their children.
    pub rows: Vec<PropertyRow>,
    context: Option<SourcePath>,
    scope_contexts: BTreeMap<PropertyPath, SourcePath>,
}

impl EntityTable {
    fn new(id: TableId, title: String, entity_type: String, parent: Option<TableId>) -> Self {
        Self {
            id,
            title,
            entity_type,
            parent,
            rows: Vec::new(),
            context: None,
            scope_contexts: BTreeMap::new(),
        }
    }

    /// Related tables carry a `Context` row; the primary table does not.
    pub fn has_context_row(&self) -> bool {
        matches!(self.id, TableId::Related(_))
    }

    /// Table-level source context; `None` means the document root.
    pub fn context(&self) -> Option<&SourcePath> {
        self.context.as_ref()
    }

    pub fn row(&self, property: &PropertyPath) -> Option<&PropertyRow> {
        self.rows.iter().find(|row| &row.path == property)
    }

    /// Source context scoped by a structured property, if one is set.
    pub fn scope_context(&self, property: &PropertyPath) -> Option<&SourcePath> {
        self.scope_contexts.get(property)
    }

    /// Context that selections for `property` resolve against: the scope of
    /// the innermost enclosing structured property that has one, else the
    /// table context.
    pub fn effective_context(&self, property: &PropertyPath) -> Option<&SourcePath> {
        property
            .ancestors()
            .skip(1)
            .find_map(|ancestor| self.scope_contexts.get(&ancestor))
            .or(self.context.as_ref())
    }

    fn push_rows(&mut self, parent: Option<&PropertyPath>, properties: &[EntityProperty]) {
        for property in properties {
            let path = match parent {
                Some(parent) if !property.name.trim().is_empty() => {
                    parent.child(property.name.clone())
                }
                Some(_) => continue,
                None => match PropertyPath::new([property.name.clone()]) {
                    Ok(path) => path,
                    Err(_) => continue,
                },
            };
            self.rows.push(PropertyRow {
                path: path.clone(),
                datatype: property.datatype.clone(),
                multiple: property.multiple,
                structured: property.is_structured(),
                related_entity_type: property.related_entity_type.clone(),
            });
            self.push_rows(Some(&path), &property.properties);
        }
    }

    /// Set or clear the scope of a structured property from the text stored
    /// in it. Text that is empty or not a plain path clears the scope.
    fn rescope(&mut self, property: &PropertyPath, expression: &str) {
        let relative = match expression.trim() {
            "" => None,
            text => parse_plain_path(text),
        };
        match relative {
            Some(relative) => {
                let scope = match self.effective_context(property) {
                    Some(context) => context.join(&relative),
                    None => relative,
                };
                self.scope_contexts.insert(property.clone(), scope);
            }
            None => {
                self.scope_contexts.remove(property);
            }
        }
    }
}

/// Expressions and contexts of every entity table of a mapping step.
#[derive(Debug, Clone)]
pub struct MappingState {
    artifact: MappingArtifact,
    tables: Vec<EntityTable>,
}

impl MappingState {
    /// Build tables from `definition` and restore the contexts recorded in
    /// `artifact`.
    pub fn new(artifact: MappingArtifact, definition: &EntityDefinition) -> Self {
        let mut primary = EntityTable::new(
            TableId::Primary,
            definition.entity_type.clone(),
            definition.entity_type.clone(),
            None,
        );
        primary.push_rows(None, &definition.properties);
        let mut tables = vec![primary];

        for (parent, related) in definition.related_tables() {
            let id = related.mapping_id();
            let mut table = EntityTable::new(
                TableId::Related(id.clone()),
                related.title(),
                related.entity_type.clone(),
                parent.map(TableId::Related),
            );
            table.push_rows(None, &related.properties);
            table.context = artifact
                .expression_context(&id)
                .and_then(parse_plain_path)
                .filter(|path| !path.is_root());
            tables.push(table);
        }

        for table in &mut tables {
            let structured: Vec<PropertyPath> = table
                .rows
                .iter()
                .filter(|row| row.structured)
                .map(|row| row.path.clone())
                .collect();
            for property in structured {
                if let Some(expression) = artifact.expression(&table.id, &property) {
                    table.rescope(&property, expression);
                }
            }
        }

        Self { artifact, tables }
    }

    pub fn artifact(&self) -> &MappingArtifact {
        &self.artifact
    }

    /// Mapping artifact with every stored expression and context.
    pub fn export(&self) -> MappingArtifact {
        self.artifact.clone()
    }

    pub fn tables(&self) -> &[EntityTable] {
        &self.tables
    }

    pub fn table(&self, id: &TableId) -> Result<&EntityTable> {
        self.tables
            .iter()
            .find(|table| &table.id == id)
            .ok_or_else(|| MappingError::UnknownTable(id.clone()))
    }

    fn table_mut(&mut self, id: &TableId) -> Result<&mut EntityTable> {
        self.tables
            .iter_mut()
            .find(|table| &table.id == id)
            .ok_or_else(|| MappingError::UnknownTable(id.clone()))
    }

    fn row(&self, table: &TableId, property: &PropertyPath) -> Result<&PropertyRow> {
        self.table(table)?
            .row(property)
            .ok_or_else(|| MappingError::UnknownProperty {
                table: table.clone(),
                property: property.to_string(),
            })
    }

    /// Stored expression of a property; empty when never mapped.
    pub fn expression(&self, table: &TableId, property: &PropertyPath) -> &str {
        self.artifact.expression(table, property).unwrap_or_default()
    }

    /// Stored `expressionContext` of a related table; `/` when unset.
    pub fn context_expression(&self, table: &TableId) -> &str {
        match table {
            TableId::Primary => "/",
            TableId::Related(id) => self.artifact.expression_context(id).unwrap_or("/"),
        }
    }

    pub fn effective_context(
        &self,
        table: &TableId,
        property: &PropertyPath,
    ) -> Result<Option<&SourcePath>> {
        Ok(self.table(table)?.effective_context(property))
    }

    /// Store the path of `node` for `property`, relative to the property's
    /// effective context, and return it. A structured property also scopes
    /// its children to `node`. On error nothing changes.
    pub fn select_source(
        &mut self,
        tree: &SourceTree,
        table: &TableId,
        property: &PropertyPath,
        node: NodeId,
    ) -> Result<String> {
        let structured = self.row(table, property)?.structured;
        let entity_table = self.table(table)?;
        let expression =
            resolve_from(tree, node, entity_table.effective_context(property))?.to_string();
        let full = resolve_path(tree, node, None)?;

        self.artifact.set_expression(table, property, &expression);
        let entity_table = self.table_mut(table)?;
        if structured {
            entity_table
                .scope_contexts
                .insert(property.clone(), full);
        }
        debug!(%table, %property, %expression, "source selected");
        Ok(expression)
    }

    /// Store typed text verbatim. A structured property re-points its scope
    /// to the typed path or clears it when the text is empty.
    pub fn edit_expression(
        &mut self,
        table: &TableId,
        property: &PropertyPath,
        text: &str,
    ) -> Result<()> {
        let structured = self.row(table, property)?.structured;
        self.artifact.set_expression(table, property, text);
        if structured {
            self.table_mut(table)?.rescope(property, text);
        }
        debug!(%table, %property, expression = text, "expression edited");
        Ok(())
    }

    fn related_id(&self, table: &TableId) -> Result<String> {
        let entity_table = self.table(table)?;
        match &entity_table.id {
            TableId::Related(id) => Ok(id.clone()),
            TableId::Primary => Err(MappingError::NoContextRow(table.clone())),
        }
    }

    /// Use `node` as the source context of a related table. The context is
    /// stored as the node's full path and returned. Stored expressions of
    /// the table are left untouched.
    pub fn select_context(
        &mut self,
        tree: &SourceTree,
        table: &TableId,
        node: NodeId,
    ) -> Result<String> {
        let id = self.related_id(table)?;
        let path = resolve_path(tree, node, None)?;
        let expression = path.to_string();
        self.artifact.set_expression_context(&id, &expression);
        self.table_mut(table)?.context = Some(path);
        debug!(%table, context = %expression, "source context selected");
        Ok(expression)
    }

    /// Store a typed context verbatim. Empty text or `/` clears the context;
    /// text that is not a plain path is kept but leaves selections resolving
    /// from the document root.
    pub fn edit_context(&mut self, table: &TableId, text: &str) -> Result<()> {
        let id = self.related_id(table)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return self.clear_context(table);
        }
        self.artifact.set_expression_context(&id, trimmed);
        let context = parse_plain_path(trimmed).filter(|path| !path.is_root());
        if context.is_none() && trimmed != "/" {
            debug!(%table, context = trimmed, "context is not a plain path; resolving from root");
        }
        self.table_mut(table)?.context = context;
        Ok(())
    }

    /// Revert a related table to the document root context (`/`).
    pub fn clear_context(&mut self, table: &TableId) -> Result<()> {
        let id = self.related_id(table)?;
        self.artifact.set_expression_context(&id, "/");
        self.table_mut(table)?.context = None;
        debug!(%table, "source context cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hub_model::{DocumentFormat, RelatedEntityDefinition, SourceValue};

    use super::*;

    fn prop(name: &str) -> EntityProperty {
        EntityProperty {
            name: name.into(),
            datatype: "string".into(),
            ..EntityProperty::default()
        }
    }

    fn definition() -> EntityDefinition {
        EntityDefinition {
            entity_type: "Person".into(),
            properties: vec![
                prop("propId"),
                EntityProperty {
                    name: "items".into(),
                    datatype: "parent-ItemType".into(),
                    multiple: true,
                    properties: vec![prop("itemTypes"), prop("itemCategory")],
                    ..EntityProperty::default()
                },
            ],
            related_entity_types: vec![RelatedEntityDefinition {
                entity_type: "BabyRegistry".into(),
                relationship_name: "ownedBy".into(),
                related_from: "Person".into(),
                properties: vec![prop("babyRegistryId")],
                related_entity_types: vec![],
            }],
        }
    }

    fn tree() -> SourceTree {
        let mut tree = SourceTree::new(DocumentFormat::Json);
        let (first, _) = tree.insert(None, "FirstNamePreferred").unwrap();
        tree.append_value(first, SourceValue::Text("Top".into())).unwrap();
        let (names, _) = tree.insert(None, "nutFreeName").unwrap();
        let (nested, _) = tree.insert(Some(names), "FirstNamePreferred").unwrap();
        tree.append_value(nested, SourceValue::Text("John".into())).unwrap();
        let (last, _) = tree.insert(Some(names), "LastName").unwrap();
        tree.append_value(last, SourceValue::Text("Smith".into())).unwrap();
        let (registry, _) = tree.insert(None, "BabyRegistry").unwrap();
        let (id, _) = tree.insert(Some(registry), "BabyRegistryId").unwrap();
        tree.append_value(id, SourceValue::Text("3039".into())).unwrap();
        tree
    }

    fn path(text: &str) -> PropertyPath {
        PropertyPath::parse(text).unwrap()
    }

    fn node(tree: &SourceTree, text: &str) -> NodeId {
        tree.find(&SourcePath::parse(text).unwrap()).unwrap()
    }

    fn registry() -> TableId {
        TableId::Related("BabyRegistry.ownedBy:Person".into())
    }

    #[test]
    fn tables_follow_definition() {
        let state = MappingState::new(MappingArtifact::new("m", "Person"), &definition());
        assert_eq!(state.tables().len(), 2);
        let rows: Vec<String> = state.tables()[0]
            .rows
            .iter()
            .map(|row| row.path.to_string())
            .collect();
        assert_eq!(rows, vec!["propId", "items", "items/itemTypes", "items/itemCategory"]);
        assert_eq!(state.tables()[1].title, "BabyRegistry (ownedBy Person)");
        assert!(!state.tables()[0].has_context_row());
        assert!(state.tables()[1].has_context_row());
    }

    #[test]
    fn structured_selection_scopes_children() {
        let tree = tree();
        let mut state = MappingState::new(MappingArtifact::new("m", "Person"), &definition());
        let items = path("items");
        assert_eq!(
            state
                .select_source(&tree, &TableId::Primary, &items, node(&tree, "nutFreeName"))
                .unwrap(),
            "nutFreeName"
        );
        let item_types = path("items/itemTypes");
        let expression = state
            .select_source(
                &tree,
                &TableId::Primary,
                &item_types,
                node(&tree, "nutFreeName/FirstNamePreferred"),
            )
            .unwrap();
        assert_eq!(expression, "FirstNamePreferred");
        assert_eq!(state.expression(&TableId::Primary, &item_types), "FirstNamePreferred");
    }

    #[test]
    fn clearing_structured_expression_clears_scope() {
        let tree = tree();
        let mut state = MappingState::new(MappingArtifact::new("m", "Person"), &definition());
        state
            .select_source(&tree, &TableId::Primary, &path("items"), node(&tree, "nutFreeName"))
            .unwrap();
        state.edit_expression(&TableId::Primary, &path("items"), "").unwrap();
        let expression = state
            .select_source(
                &tree,
                &TableId::Primary,
                &path("items/itemTypes"),
                node(&tree, "nutFreeName/FirstNamePreferred"),
            )
            .unwrap();
        assert_eq!(expression, "nutFreeName/FirstNamePreferred");
    }

    #[test]
    fn related_context_round_trip() {
        let tree = tree();
        let mut state = MappingState::new(MappingArtifact::new("m", "Person"), &definition());
        let table = registry();
        let id_prop = path("babyRegistryId");

        state.edit_context(&table, "BabyRegistry").unwrap();
        let scoped = state
            .select_source(&tree, &table, &id_prop, node(&tree, "BabyRegistry/BabyRegistryId"))
            .unwrap();
        assert_eq!(scoped, "BabyRegistryId");

        state.clear_context(&table).unwrap();
        assert_eq!(state.context_expression(&table), "/");
        // clearing does not rewrite what was stored
        assert_eq!(state.expression(&table, &id_prop), "BabyRegistryId");
        let full = state
            .select_source(&tree, &table, &id_prop, node(&tree, "BabyRegistry/BabyRegistryId"))
            .unwrap();
        assert_eq!(full, "BabyRegistry/BabyRegistryId");

        // a node outside the old context resolves from the root again
        state.edit_context(&table, "BabyRegistry").unwrap();
        let outside = node(&tree, "nutFreeName/LastName");
        assert_eq!(
            state.select_source(&tree, &table, &id_prop, outside).unwrap(),
            "LastName"
        );
        state.clear_context(&table).unwrap();
        assert_eq!(
            state.select_source(&tree, &table, &id_prop, outside).unwrap(),
            "nutFreeName/LastName"
        );
    }

    #[test]
    fn selecting_the_context_itself_gives_slash() {
        let tree = tree();
        let mut state = MappingState::new(MappingArtifact::new("m", "Person"), &definition());
        let table = registry();
        let context = state
            .select_context(&tree, &table, node(&tree, "BabyRegistry"))
            .unwrap();
        assert_eq!(context, "BabyRegistry");
        let expression = state
            .select_source(&tree, &table, &path("babyRegistryId"), node(&tree, "BabyRegistry"))
            .unwrap();
        assert_eq!(expression, "/");
    }

    #[test]
    fn primary_table_has_no_context_row() {
        let mut state = MappingState::new(MappingArtifact::new("m", "Person"), &definition());
        assert!(matches!(
            state.clear_context(&TableId::Primary),
            Err(MappingError::NoContextRow(TableId::Primary))
        ));
    }

    #[test]
    fn failed_selection_changes_nothing() {
        let tree = tree();
        let mut bigger = tree.clone();
        let (extra, _) = bigger.insert(None, "extra").unwrap();
        let mut state = MappingState::new(MappingArtifact::new("m", "Person"), &definition());
        assert!(
            state
                .select_source(&tree, &TableId::Primary, &path("propId"), extra)
                .is_err()
        );
        assert_eq!(state.expression(&TableId::Primary, &path("propId")), "");
        assert!(state.artifact().properties.is_empty());
    }

    #[test]
    fn contexts_restored_from_artifact() {
        let mut artifact = MappingArtifact::new("m", "Person");
        artifact.set_expression(&TableId::Primary, &path("items"), "nutFreeName");
        artifact.set_expression_context("BabyRegistry.ownedBy:Person", "BabyRegistry");
        let state = MappingState::new(artifact, &definition());
        assert_eq!(
            state
                .effective_context(&TableId::Primary, &path("items/itemTypes"))
                .unwrap()
                .map(ToString::to_string),
            Some("nutFreeName".to_string())
        );
        assert_eq!(
            state.table(&registry()).unwrap().context().map(ToString::to_string),
            Some("BabyRegistry".to_string())
        );
    }

    #[test]
    fn quoted_scope_survives_reload() {
        let mut tree = SourceTree::new(DocumentFormat::Json);
        let (group, _) = tree.insert(None, "my group").unwrap();
        let (inner, _) = tree.insert(Some(group), "inner").unwrap();
        tree.append_value(inner, SourceValue::Text("v".into())).unwrap();

        let mut state = MappingState::new(MappingArtifact::new("m", "Person"), &definition());
        let stored = state
            .select_source(&tree, &TableId::Primary, &path("items"), group)
            .unwrap();
        assert_eq!(stored, "node('my group')");
        let child = path("items/itemTypes");
        assert_eq!(
            state.select_source(&tree, &TableId::Primary, &child, inner).unwrap(),
            "inner"
        );

        let mut reloaded = MappingState::new(state.export(), &definition());
        assert_eq!(
            reloaded
                .effective_context(&TableId::Primary, &child)
                .unwrap()
                .map(ToString::to_string),
            Some("node('my group')".to_string())
        );
        assert_eq!(
            reloaded.select_source(&tree, &TableId::Primary, &child, inner).unwrap(),
            "inner"
        );
    }
}
