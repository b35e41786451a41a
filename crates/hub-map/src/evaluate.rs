//! Evaluated values shown in the entity tables after "Test".

use std::collections::BTreeMap;

use tracing::debug;

use hub_model::{
    EvaluatedOutput, EvaluationResponse, MappingArtifact, PropertyEvaluation, PropertyMapping,
    PropertyPath, RelatedEntityEvaluation, SourcePath, SourceTree, SourceValue, TableId,
};

use crate::resolver::parse_plain_path;

/// Outcome of evaluating one property expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluatedValue {
    Output(EvaluatedOutput),
    /// Shown inline under the expression; the value column stays empty.
    Error(String),
}

/// Evaluated values of the last Test run, keyed by table and property.
#[derive(Debug, Clone, Default)]
pub struct EvaluationState {
    values: BTreeMap<(TableId, PropertyPath), EvaluatedValue>,
}

impl EvaluationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values with those of `response`.
    pub fn apply(&mut self, response: &EvaluationResponse) {
        self.values.clear();
        self.collect(&TableId::Primary, None, &response.properties);
        for related in &response.related_entity_mappings {
            let table = TableId::Related(related.related_entity_mapping_id.clone());
            self.collect(&table, None, &related.properties);
        }
        debug!(values = self.values.len(), "evaluation applied");
    }

    fn collect(
        &mut self,
        table: &TableId,
        parent: Option<&PropertyPath>,
        properties: &BTreeMap<String, PropertyEvaluation>,
    ) {
        for (name, evaluation) in properties {
            let path = match parent {
                Some(parent) => parent.child(name.clone()),
                None => match PropertyPath::new([name.clone()]) {
                    Ok(path) => path,
                    Err(_) => continue,
                },
            };
            let value = match (&evaluation.error_message, &evaluation.output) {
                (Some(message), _) => Some(EvaluatedValue::Error(message.clone())),
                (None, Some(output)) => Some(EvaluatedValue::Output(output.clone())),
                (None, None) => None,
            };
            if let Some(value) = value {
                self.values.insert((table.clone(), path.clone()), value);
            }
            self.collect(table, Some(&path), &evaluation.properties);
        }
    }

    pub fn value(&self, table: &TableId, property: &PropertyPath) -> Option<&EvaluatedValue> {
        self.values.get(&(table.clone(), property.clone()))
    }

    pub fn output(&self, table: &TableId, property: &PropertyPath) -> Option<&EvaluatedOutput> {
        match self.value(table, property)? {
            EvaluatedValue::Output(output) => Some(output),
            EvaluatedValue::Error(_) => None,
        }
    }

    pub fn error(&self, table: &TableId, property: &PropertyPath) -> Option<&str> {
        match self.value(table, property)? {
            EvaluatedValue::Error(message) => Some(message),
            EvaluatedValue::Output(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Evaluate one expression against `tree` relative to `context`.
///
/// Only plain key paths are understood. `/` denotes the context node.
/// Anything else yields an inline error; paths without a match yield no
/// output.
pub fn evaluate_expression(
    tree: &SourceTree,
    expression: &str,
    context: Option<&SourcePath>,
) -> PropertyEvaluation {
    let expression = expression.trim();
    if expression.is_empty() {
        return PropertyEvaluation::default();
    }
    let Some(relative) = parse_plain_path(expression) else {
        return PropertyEvaluation {
            error_message: Some(format!("Invalid XPath expression: {expression}")),
            ..PropertyEvaluation::default()
        };
    };
    let full = match context {
        Some(context) => context.join(&relative),
        None => relative,
    };
    let output = tree
        .find(&full)
        .and_then(|id| tree.get(id))
        .and_then(|node| node.value.as_ref())
        .and_then(|value| match value {
            SourceValue::Null => None,
            SourceValue::Text(text) => Some(EvaluatedOutput::Single(text.clone())),
            SourceValue::Sequence(items) => Some(EvaluatedOutput::Multiple(items.clone())),
        });
    PropertyEvaluation {
        output,
        ..PropertyEvaluation::default()
    }
}

fn evaluate_properties(
    tree: &SourceTree,
    properties: &BTreeMap<String, PropertyMapping>,
    context: Option<&SourcePath>,
) -> BTreeMap<String, PropertyEvaluation> {
    properties
        .iter()
        .map(|(name, mapping)| {
            let mut evaluation = evaluate_expression(tree, &mapping.sourced_from, context);
            if !mapping.properties.is_empty() {
                let expression = mapping.sourced_from.trim();
                let scope = Some(expression)
                    .filter(|text| !text.is_empty())
                    .and_then(parse_plain_path)
                    .map(|relative| match context {
                        Some(context) => context.join(&relative),
                        None => relative,
                    });
                let scope = scope.as_ref().or(context);
                evaluation.properties = evaluate_properties(tree, &mapping.properties, scope);
            }
            (name.clone(), evaluation)
        })
        .collect()
}

/// Evaluate every expression of `artifact` against one document.
pub fn evaluate_artifact(tree: &SourceTree, artifact: &MappingArtifact) -> EvaluationResponse {
    let related_entity_mappings = artifact
        .related_entity_mappings
        .iter()
        .map(|related| {
            let context =
                parse_plain_path(&related.expression_context).filter(|path| !path.is_root());
            RelatedEntityEvaluation {
                related_entity_mapping_id: related.related_entity_mapping_id.clone(),
                properties: evaluate_properties(tree, &related.properties, context.as_ref()),
            }
        })
        .collect();
    EvaluationResponse {
        properties: evaluate_properties(tree, &artifact.properties, None),
        related_entity_mappings,
    }
}
