//! JSON documents to source trees.
//!
//! Objects become nodes with children. Arrays become a single node flagged
//! as an array: elements that are objects contribute the union of their
//! keys, scalar elements are gathered into a sequence value.

use serde_json::{Map, Value};
use tracing::debug;

use hub_model::{DocumentFormat, NodeId, SourceTree, SourceValue};

use crate::error::{IngestError, Result};

/// Parse JSON text into a source tree.
///
/// A document wrapped in an `envelope.instance` pair is unwrapped first, so
/// paths start at the instance content.
pub fn parse_json(content: &str) -> Result<SourceTree> {
    let value: Value = serde_json::from_str(content)?;
    let root = match value {
        Value::Object(map) => unwrap_envelope(map),
        other => {
            return Err(IngestError::UnsupportedJsonRoot {
                found: kind_name(&other),
            });
        }
    };
    let mut tree = SourceTree::new(DocumentFormat::Json);
    for (key, value) in &root {
        insert_value(&mut tree, None, key, value)?;
    }
    debug!(nodes = tree.len(), "parsed JSON document");
    Ok(tree)
}

fn unwrap_envelope(mut map: Map<String, Value>) -> Map<String, Value> {
    if map.len() == 1
        && let Some(Value::Object(envelope)) = map.get_mut("envelope")
        && matches!(envelope.get("instance"), Some(Value::Object(_)))
        && let Some(Value::Object(instance)) = envelope.remove("instance")
    {
        debug!("unwrapped envelope instance");
        return instance;
    }
    map
}

fn insert_value(
    tree: &mut SourceTree,
    parent: Option<NodeId>,
    key: &str,
    value: &Value,
) -> Result<()> {
    let (id, existed) = tree.insert(parent, key)?;
    if existed {
        tree.mark_array(id)?;
    }
    match value {
        Value::Object(map) => {
            for (child_key, child) in map {
                insert_value(tree, Some(id), child_key, child)?;
            }
        }
        Value::Array(items) => {
            tree.mark_array(id)?;
            let mut scalars = Vec::new();
            collect_array(tree, id, items, &mut scalars)?;
            if items.is_empty() || !scalars.is_empty() {
                tree.append_value(id, SourceValue::Sequence(scalars))?;
            }
        }
        scalar => tree.append_value(id, scalar_value(scalar))?,
    }
    Ok(())
}

fn collect_array(
    tree: &mut SourceTree,
    id: NodeId,
    items: &[Value],
    scalars: &mut Vec<String>,
) -> Result<()> {
    for item in items {
        match item {
            Value::Object(map) => {
                for (child_key, child) in map {
                    insert_value(tree, Some(id), child_key, child)?;
                }
            }
            Value::Array(nested) => collect_array(tree, id, nested, scalars)?,
            Value::Null => scalars.push(String::new()),
            scalar => scalars.push(scalar_text(scalar)),
        }
    }
    Ok(())
}

fn scalar_value(value: &Value) -> SourceValue {
    match value {
        Value::Null => SourceValue::Null,
        other => SourceValue::Text(scalar_text(other)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
