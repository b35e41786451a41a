//! Session-wide display options.

use serde::{Deserialize, Serialize};

use crate::display::{ENTITY_VALUE_LIMIT, SOURCE_VALUE_LIMIT};
use crate::view::SortOrder;

/// Options shared by every table of a mapping session.
///
/// Missing fields fall back to their defaults when read from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionOptions {
    /// Characters of a source value shown before truncation.
    pub source_value_limit: usize,
    /// Characters of an evaluated entity value shown before truncation.
    pub entity_value_limit: usize,
    /// Zero-based index of the document loaded first.
    pub initial_document: usize,
    /// Start with every source row expanded.
    pub expand_all: bool,
    pub default_sort: SortOrder,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            source_value_limit: SOURCE_VALUE_LIMIT,
            entity_value_limit: ENTITY_VALUE_LIMIT,
            initial_document: 0,
            expand_all: false,
            default_sort: SortOrder::Document,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options: SessionOptions =
            serde_json::from_str(r#"{"entityValueLimit": 40, "defaultSort": "descending"}"#)
                .unwrap();
        assert_eq!(options.entity_value_limit, 40);
        assert_eq!(options.source_value_limit, SOURCE_VALUE_LIMIT);
        assert_eq!(options.default_sort, SortOrder::Descending);
        assert!(!options.expand_all);
    }
}
