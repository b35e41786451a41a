//! Value formatting for the source and entity tables.
//!
//! Formatting only produces display text; stored values are never touched.

use hub_model::{EvaluatedOutput, SourceValue};

/// Characters of a source value shown before truncation.
pub const SOURCE_VALUE_LIMIT: usize = 14;
/// Characters of an evaluated entity value shown before truncation.
pub const ENTITY_VALUE_LIMIT: usize = 23;

const ELLIPSIS: &str = "...";

/// Display text plus the tooltip revealing what was cut or hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayValue {
    pub text: String,
    pub tooltip: Option<String>,
}

impl DisplayValue {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tooltip: None,
        }
    }
}

/// Keep the first `limit` characters and append `...` when anything was cut.
pub fn truncate(value: &str, limit: usize) -> (String, bool) {
    match value.char_indices().nth(limit) {
        Some((end, _)) => (format!("{}{ELLIPSIS}", &value[..end]), true),
        None => (value.to_string(), false),
    }
}

/// Render a list of values: the first one, truncated to `limit`, followed by
/// ` (N more)` counting the remaining non-empty values. The tooltip lists
/// every value joined by `, `.
pub fn display_items(items: &[&str], limit: usize) -> DisplayValue {
    let Some((first, rest)) = items.split_first() else {
        return DisplayValue::default();
    };
    let (text, truncated) = truncate(first, limit);
    let hidden = rest.iter().filter(|item| !item.is_empty()).count();
    if rest.is_empty() {
        return if truncated {
            DisplayValue {
                text,
                tooltip: Some((*first).to_string()),
            }
        } else {
            DisplayValue::plain(text)
        };
    }
    let text = if hidden > 0 {
        format!("{text} ({hidden} more)")
    } else {
        text
    };
    DisplayValue {
        text,
        tooltip: (truncated || hidden > 0).then(|| items.join(", ")),
    }
}

pub fn display_source_value(value: &SourceValue, limit: usize) -> DisplayValue {
    match value {
        SourceValue::Null => DisplayValue::plain("null"),
        other => display_items(&other.items(), limit),
    }
}

pub fn display_output(output: &EvaluatedOutput, limit: usize) -> DisplayValue {
    display_items(&output.items(), limit)
}
