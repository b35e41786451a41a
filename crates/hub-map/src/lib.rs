//! Mapping of source documents onto entity properties.
//!
//! The core piece is the source path resolver: given the node a user picked
//! in the source tree and the active source context, it produces the
//! expression stored for a target property. Around it sit the mapping state
//! of each entity table, save tracking, evaluation, display formatting and
//! the [`MappingSession`] tying them to a [`MappingClient`].

#![deny(unsafe_code)]

pub mod client;
pub mod display;
pub mod error;
pub mod evaluate;
pub mod options;
pub mod resolver;
pub mod saves;
pub mod selector;
pub mod session;
pub mod state;
pub mod view;

// === Error Types ===
pub use error::{MappingError, ResolveError, Result};

// === Resolution ===
pub use resolver::{
    parse_plain_path, relative_path, resolve_expression, resolve_from, resolve_path,
};
pub use selector::{INDENT_PX, SourceOption, search_options, source_options};

// === State ===
pub use saves::{MappingField, SaveOutcome, SaveStatus, SaveTicket, SaveTracker};
pub use state::{EntityTable, MappingState, PropertyRow};

// === Evaluation & Display ===
pub use display::{
    DisplayValue, ENTITY_VALUE_LIMIT, SOURCE_VALUE_LIMIT, display_items, display_output,
    display_source_value, truncate,
};
pub use evaluate::{EvaluatedValue, EvaluationState, evaluate_artifact, evaluate_expression};

// === Session ===
pub use client::{ClientError, ClientResult, MappingClient};
pub use options::SessionOptions;
pub use session::{LoadedDocument, MappingSession};
pub use view::{ColumnVisibility, EntityColumn, RowTree, SortOrder, TreeView, VisibleRow};
