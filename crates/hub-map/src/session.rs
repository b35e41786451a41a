//! A mapping step opened against a [`MappingClient`].
//!
//! The session owns everything one mapping screen works with: the mapping
//! state, the current source document, save indicators, evaluated values,
//! the set of related tables on display and per-table view state.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, info_span, warn};

use hub_ingest::parse_document;
use hub_model::{
    Authorities, EntityDefinition, MappingArtifact, MappingFunction, NodeId, PropertyPath,
    SourceDocument, SourceTree, TableId,
};

use crate::client::MappingClient;
use crate::display::{DisplayValue, display_output, display_source_value};
use crate::error::{MappingError, Result};
use crate::evaluate::EvaluationState;
use crate::options::SessionOptions;
use crate::saves::{MappingField, SaveOutcome, SaveStatus, SaveTicket, SaveTracker};
use crate::selector::{SourceOption, search_options, source_options};
use crate::state::{EntityTable, MappingState};
use crate::view::{ColumnVisibility, TreeView};

/// Source document currently on display.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: SourceDocument,
    pub tree: SourceTree,
}

pub struct MappingSession<C: MappingClient> {
    client: C,
    authorities: Authorities,
    options: SessionOptions,
    definition: EntityDefinition,
    state: MappingState,
    saves: SaveTracker,
    evaluation: EvaluationState,
    functions: Vec<MappingFunction>,
    uris: Vec<String>,
    document: Option<LoadedDocument>,
    visible_related: BTreeSet<TableId>,
    source_view: TreeView<NodeId>,
    entity_views: BTreeMap<TableId, TreeView<PropertyPath>>,
    columns: ColumnVisibility,
}

impl<C: MappingClient> MappingSession<C> {
    /// Load the mapping step `name` with its entity definitions, document
    /// list and first document.
    pub fn open(
        client: C,
        name: &str,
        authorities: Authorities,
        options: SessionOptions,
    ) -> Result<Self> {
        let span = info_span!("open_mapping", mapping = %name);
        let _guard = span.enter();

        if !authorities.can_read_mapping() {
            return Err(MappingError::PermissionDenied {
                action: "open a mapping step",
                authority: "readMapping",
            });
        }

        let artifact = client.fetch_mapping_artifact(name)?;
        let definition = client.fetch_nested_entity_definitions(&artifact.target_entity_type)?;
        let query = artifact.source_query.clone().unwrap_or_default();
        let uris = client.fetch_source_document_uris(&query)?;
        let functions = client.list_mapping_functions().unwrap_or_else(|error| {
            warn!(%error, "mapping functions unavailable");
            Vec::new()
        });

        let state = MappingState::new(artifact, &definition);
        let entity_views = state
            .tables()
            .iter()
            .map(|table| (table.id.clone(), TreeView::new(options.default_sort)))
            .collect();

        let mut session = Self {
            client,
            authorities,
            source_view: TreeView::new(options.default_sort),
            options,
            definition,
            state,
            saves: SaveTracker::new(),
            evaluation: EvaluationState::new(),
            functions,
            uris,
            document: None,
            visible_related: BTreeSet::new(),
            entity_views,
            columns: ColumnVisibility::default(),
        };
        session.show_mapped_tables()?;

        if !session.uris.is_empty() {
            let index = session
                .options
                .initial_document
                .min(session.uris.len() - 1);
            let uri = session.uris[index].clone();
            session.load_document(&uri)?;
        }
        info!(
            tables = session.state.tables().len(),
            documents = session.uris.len(),
            "mapping step opened"
        );
        Ok(session)
    }

    /// Related tables that already carry mappings start out visible.
    fn show_mapped_tables(&mut self) -> Result<()> {
        let mapped: Vec<TableId> = self
            .state
            .artifact()
            .related_entity_mappings
            .iter()
            .map(|m| TableId::Related(m.related_entity_mapping_id.clone()))
            .filter(|id| self.state.table(id).is_ok())
            .collect();
        for id in mapped {
            self.show_related(&id)?;
        }
        Ok(())
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn authorities(&self) -> &Authorities {
        &self.authorities
    }

    /// Apply a refreshed set of authorities, e.g. after the user's session
    /// was renewed. Checks made later use the new set.
    pub fn update_authorities(&mut self, authorities: Authorities) {
        debug!(?authorities, "authorities updated");
        self.authorities = authorities;
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn definition(&self) -> &EntityDefinition {
        &self.definition
    }

    pub fn state(&self) -> &MappingState {
        &self.state
    }

    pub fn artifact(&self) -> &MappingArtifact {
        self.state.artifact()
    }

    pub fn functions(&self) -> &[MappingFunction] {
        &self.functions
    }

    // === Documents ===

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    pub fn tree(&self) -> Result<&SourceTree> {
        self.document
            .as_ref()
            .map(|loaded| &loaded.tree)
            .ok_or(MappingError::NoDocument)
    }

    pub fn uris(&self) -> &[String] {
        &self.uris
    }

    pub fn current_uri(&self) -> Option<&str> {
        self.document
            .as_ref()
            .map(|loaded| loaded.document.uri.as_str())
    }

    /// One-based position of the current document in the URI list.
    pub fn uri_position(&self) -> Option<usize> {
        let current = self.current_uri()?;
        self.uris
            .iter()
            .position(|uri| uri == current)
            .map(|index| index + 1)
    }

    fn load_document(&mut self, uri: &str) -> Result<()> {
        let document = self.client.fetch_source_document(uri)?;
        let tree = parse_document(&document)?;
        debug!(uri, nodes = tree.len(), "source document loaded");
        let mut view = TreeView::new(self.options.default_sort);
        if self.options.expand_all {
            view.expand_all(&tree);
        }
        self.source_view = view;
        self.evaluation.clear();
        self.document = Some(LoadedDocument { document, tree });
        Ok(())
    }

    /// Move to the next document. Returns `false` at the end of the list.
    pub fn next_document(&mut self) -> Result<bool> {
        let next = self.uri_position().unwrap_or(0);
        match self.uris.get(next).cloned() {
            Some(uri) => self.load_document(&uri).map(|()| true),
            None => Ok(false),
        }
    }

    /// Move to the previous document. Returns `false` at the start.
    pub fn previous_document(&mut self) -> Result<bool> {
        let Some(position) = self.uri_position().filter(|p| *p > 1) else {
            return Ok(false);
        };
        let uri = self.uris[position - 2].clone();
        self.load_document(&uri).map(|()| true)
    }

    /// Load a document by URI, whether or not it is part of the list.
    pub fn set_document_uri(&mut self, uri: &str) -> Result<()> {
        self.load_document(uri.trim())
    }

    // === Source selector ===

    pub fn source_options(&self) -> Vec<SourceOption> {
        self.document
            .as_ref()
            .map(|loaded| source_options(&loaded.tree))
            .unwrap_or_default()
    }

    pub fn search_source_options(&self, search: &str) -> Vec<SourceOption> {
        let options = self.source_options();
        search_options(&options, search)
            .into_iter()
            .cloned()
            .collect()
    }

    // === Related tables ===

    pub fn is_table_visible(&self, table: &TableId) -> bool {
        matches!(table, TableId::Primary) || self.visible_related.contains(table)
    }

    /// Tables on display, primary first.
    pub fn visible_tables(&self) -> Vec<&EntityTable> {
        self.state
            .tables()
            .iter()
            .filter(|table| self.is_table_visible(&table.id))
            .collect()
    }

    /// Show a related table together with the tables it is related through.
    pub fn show_related(&mut self, table: &TableId) -> Result<()> {
        let mut current = Some(table.clone());
        while let Some(id) = current {
            let entity_table = self.state.table(&id)?;
            current = entity_table.parent.clone();
            if matches!(id, TableId::Related(_)) {
                self.visible_related.insert(id);
            }
        }
        Ok(())
    }

    /// Hide a related table and every table related through it.
    pub fn hide_related(&mut self, table: &TableId) -> Result<()> {
        self.state.table(table)?;
        let mut hidden = vec![table.clone()];
        while let Some(id) = hidden.pop() {
            self.visible_related.remove(&id);
            hidden.extend(
                self.state
                    .tables()
                    .iter()
                    .filter(|t| t.parent.as_ref() == Some(&id))
                    .map(|t| t.id.clone()),
            );
        }
        Ok(())
    }

    // === Edits ===

    fn require_write(&self, action: &'static str) -> Result<()> {
        if self.authorities.can_write_mapping() {
            Ok(())
        } else {
            Err(MappingError::PermissionDenied {
                action,
                authority: "writeMapping",
            })
        }
    }

    /// Start tracking a save of `field`. Saves issued this way are finished
    /// with [`MappingSession::complete_save`].
    pub fn begin_save(&mut self, field: MappingField) -> SaveTicket {
        self.saves.begin(field)
    }

    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: std::result::Result<(), String>,
    ) -> SaveOutcome {
        self.saves.complete(ticket, result)
    }

    fn save(&mut self, field: MappingField) -> Result<SaveOutcome> {
        let ticket = self.saves.begin(field);
        match self.client.update_mapping_artifact(self.state.artifact()) {
            Ok(()) => Ok(self.saves.complete(ticket, Ok(()))),
            Err(error) => {
                self.saves.complete(ticket, Err(error.to_string()));
                Err(error.into())
            }
        }
    }

    /// Map `property` to the source node `node` and save the step.
    pub fn select_source(
        &mut self,
        table: &TableId,
        property: &PropertyPath,
        node: NodeId,
    ) -> Result<String> {
        self.require_write("map a property")?;
        let tree = &self
            .document
            .as_ref()
            .ok_or(MappingError::NoDocument)?
            .tree;
        let expression = self.state.select_source(tree, table, property, node)?;
        self.save(MappingField::property(table.clone(), property.clone()))?;
        Ok(expression)
    }

    pub fn edit_expression(
        &mut self,
        table: &TableId,
        property: &PropertyPath,
        text: &str,
    ) -> Result<()> {
        self.require_write("edit an expression")?;
        self.state.edit_expression(table, property, text)?;
        self.save(MappingField::property(table.clone(), property.clone()))?;
        Ok(())
    }

    pub fn select_context(&mut self, table: &TableId, node: NodeId) -> Result<String> {
        self.require_write("set a source context")?;
        let tree = &self
            .document
            .as_ref()
            .ok_or(MappingError::NoDocument)?
            .tree;
        let context = self.state.select_context(tree, table, node)?;
        self.save(MappingField::Context(table.clone()))?;
        Ok(context)
    }

    pub fn edit_context(&mut self, table: &TableId, text: &str) -> Result<()> {
        self.require_write("set a source context")?;
        self.state.edit_context(table, text)?;
        self.save(MappingField::Context(table.clone()))?;
        Ok(())
    }

    pub fn clear_context(&mut self, table: &TableId) -> Result<()> {
        self.require_write("clear a source context")?;
        self.state.clear_context(table)?;
        self.save(MappingField::Context(table.clone()))?;
        Ok(())
    }

    pub fn save_status(&self, field: &MappingField) -> Option<&SaveStatus> {
        self.saves.status(field)
    }

    pub fn acknowledge_save(&mut self, field: &MappingField) {
        self.saves.acknowledge(field);
    }

    pub fn saves(&self) -> &SaveTracker {
        &self.saves
    }

    // === Evaluation ===

    /// Test is offered once a document is loaded and every save settled.
    pub fn can_test(&self) -> bool {
        self.authorities.can_read_mapping() && self.document.is_some() && self.saves.all_settled()
    }

    /// Evaluate the step against the current document.
    pub fn test(&mut self) -> Result<()> {
        if !self.authorities.can_read_mapping() {
            return Err(MappingError::PermissionDenied {
                action: "test a mapping step",
                authority: "readMapping",
            });
        }
        if !self.saves.all_settled() {
            return Err(MappingError::SavesPending);
        }
        let uri = self
            .current_uri()
            .ok_or(MappingError::NoDocument)?
            .to_string();
        let response = self
            .client
            .evaluate_mapping_expression(self.state.artifact(), &uri)?;
        self.evaluation.apply(&response);
        Ok(())
    }

    pub fn clear_test(&mut self) {
        self.evaluation.clear();
    }

    pub fn evaluation(&self) -> &EvaluationState {
        &self.evaluation
    }

    // === Display ===

    pub fn source_value(&self, node: NodeId) -> Option<DisplayValue> {
        let value = self.document.as_ref()?.tree.get(node)?.value.as_ref()?;
        Some(display_source_value(value, self.options.source_value_limit))
    }

    pub fn entity_value(&self, table: &TableId, property: &PropertyPath) -> Option<DisplayValue> {
        let output = self.evaluation.output(table, property)?;
        Some(display_output(output, self.options.entity_value_limit))
    }

    // === Views ===

    pub fn source_view(&self) -> &TreeView<NodeId> {
        &self.source_view
    }

    pub fn source_view_mut(&mut self) -> &mut TreeView<NodeId> {
        &mut self.source_view
    }

    pub fn entity_view_mut(&mut self, table: &TableId) -> Result<&mut TreeView<PropertyPath>> {
        self.entity_views
            .get_mut(table)
            .ok_or_else(|| MappingError::UnknownTable(table.clone()))
    }

    pub fn entity_view(&self, table: &TableId) -> Result<&TreeView<PropertyPath>> {
        self.entity_views
            .get(table)
            .ok_or_else(|| MappingError::UnknownTable(table.clone()))
    }

    pub fn columns(&self) -> &ColumnVisibility {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut ColumnVisibility {
        &mut self.columns
    }
}
