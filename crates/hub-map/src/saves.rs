//! Save tracking for mapping fields.
//!
//! Each edit issues a [`SaveTicket`] carrying a generation number. Saves for
//! different fields are independent. For one field only the most recently
//! issued ticket may change its indicator: completions of older tickets are
//! reported as [`SaveOutcome::Superseded`] and ignored, whatever order the
//! responses arrive in. In-flight requests are never cancelled.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use hub_model::{PropertyPath, TableId};

/// A persisted unit of mapping state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MappingField {
    Property {
        table: TableId,
        property: PropertyPath,
    },
    /// Source context row of a related entity table.
    Context(TableId),
}

impl MappingField {
    pub fn property(table: TableId, property: PropertyPath) -> Self {
        Self::Property { table, property }
    }

    pub fn table(&self) -> &TableId {
        match self {
            MappingField::Property { table, .. } | MappingField::Context(table) => table,
        }
    }
}

impl fmt::Display for MappingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingField::Property { table, property } => write!(f, "{table}:{property}"),
            MappingField::Context(table) => write!(f, "{table}:Context"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    field: MappingField,
    generation: u64,
}

impl SaveTicket {
    pub fn field(&self) -> &MappingField {
        &self.field
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Indicator shown next to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Pending,
    /// Transient success indicator; cleared by [`SaveTracker::acknowledge`].
    Saved,
    /// The save failed; the local edit stays visible.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Applied(SaveStatus),
    Superseded,
}

#[derive(Debug, Clone, Default)]
pub struct SaveTracker {
    next_generation: u64,
    latest: BTreeMap<MappingField, u64>,
    status: BTreeMap<MappingField, SaveStatus>,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, field: MappingField) -> SaveTicket {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.latest.insert(field.clone(), generation);
        self.status.insert(field.clone(), SaveStatus::Pending);
        SaveTicket { field, generation }
    }

    pub fn complete(&mut self, ticket: SaveTicket, result: Result<(), String>) -> SaveOutcome {
        let latest = self.latest.get(&ticket.field).copied();
        if latest != Some(ticket.generation) {
            debug!(
                field = %ticket.field,
                generation = ticket.generation,
                "ignoring superseded save response"
            );
            return SaveOutcome::Superseded;
        }
        let status = match result {
            Ok(()) => SaveStatus::Saved,
            Err(message) => {
                warn!(field = %ticket.field, %message, "mapping save failed");
                SaveStatus::Failed(message)
            }
        };
        self.status.insert(ticket.field, status.clone());
        SaveOutcome::Applied(status)
    }

    pub fn status(&self, field: &MappingField) -> Option<&SaveStatus> {
        self.status.get(field)
    }

    /// Dismiss a transient success indicator.
    pub fn acknowledge(&mut self, field: &MappingField) {
        if matches!(self.status.get(field), Some(SaveStatus::Saved)) {
            self.status.remove(field);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.status
            .values()
            .filter(|s| matches!(s, SaveStatus::Pending))
            .count()
    }

    pub fn all_settled(&self) -> bool {
        self.pending_count() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&MappingField, &str)> {
        self.status.iter().filter_map(|(field, status)| match status {
            SaveStatus::Failed(message) => Some((field, message.as_str())),
            _ => None,
        })
    }
}
