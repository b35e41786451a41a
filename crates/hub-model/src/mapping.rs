//! Mapping artifact types exchanged with the mapping service.
//!
//! Field names follow the hub's JSON wire shape (camelCase).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Path of property names from an entity table down to a (nested) property,
/// e.g. `items/itemTypes`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() || names.iter().any(|name| name.trim().is_empty()) {
            return Err(ModelError::InvalidPropertyPath(names.join("/")));
        }
        Ok(Self(names))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Self::new(text.split('/').map(str::trim))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn parent(&self) -> Option<Self> {
        (self.0.len() > 1).then(|| Self(self.0[..self.0.len() - 1].to_vec()))
    }

    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut names = self.0.clone();
        names.push(name.into());
        Self(names)
    }

    /// This path and every enclosing property path, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = PropertyPath> + '_ {
        (1..=self.0.len())
            .rev()
            .map(|len| Self(self.0[..len].to_vec()))
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Identifies one entity table inside a mapping step.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TableId {
    Primary,
    /// Related entity table keyed by its `relatedEntityMappingId`.
    Related(String),
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableId::Primary => f.write_str("primary"),
            TableId::Related(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMapping {
    #[serde(default)]
    pub sourced_from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntityMapping {
    pub related_entity_mapping_id: String,
    #[serde(default)]
    pub target_entity_type: String,
    /// Source context of the related table; `/` when unset.
    #[serde(default = "default_expression_context")]
    pub expression_context: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyMapping>,
}

fn default_expression_context() -> String {
    "/".to_string()
}

/// Mapping step definition as stored by the mapping service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingArtifact {
    pub name: String,
    pub target_entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_query: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_entity_mappings: Vec<RelatedEntityMapping>,
}

impl MappingArtifact {
    pub fn new(name: impl Into<String>, target_entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_entity_type: target_entity_type.into(),
            ..Self::default()
        }
    }

    pub fn related(&self, mapping_id: &str) -> Option<&RelatedEntityMapping> {
        self.related_entity_mappings
            .iter()
            .find(|m| m.related_entity_mapping_id == mapping_id)
    }

    fn table_properties(&self, table: &TableId) -> Option<&BTreeMap<String, PropertyMapping>> {
        match table {
            TableId::Primary => Some(&self.properties),
            TableId::Related(id) => self.related(id).map(|m| &m.properties),
        }
    }

    fn table_properties_mut(&mut self, table: &TableId) -> &mut BTreeMap<String, PropertyMapping> {
        match table {
            TableId::Primary => &mut self.properties,
            TableId::Related(id) => &mut self.related_mut(id).properties,
        }
    }

    /// Related mapping entry, created on first use.
    pub fn related_mut(&mut self, mapping_id: &str) -> &mut RelatedEntityMapping {
        let index = match self
            .related_entity_mappings
            .iter()
            .position(|m| m.related_entity_mapping_id == mapping_id)
        {
            Some(index) => index,
            None => {
                self.related_entity_mappings.push(RelatedEntityMapping {
                    related_entity_mapping_id: mapping_id.to_string(),
                    target_entity_type: mapping_id
                        .split('.')
                        .next()
                        .unwrap_or_default()
                        .to_string(),
                    expression_context: default_expression_context(),
                    properties: BTreeMap::new(),
                });
                self.related_entity_mappings.len() - 1
            }
        };
        &mut self.related_entity_mappings[index]
    }

    pub fn property(&self, table: &TableId, property: &PropertyPath) -> Option<&PropertyMapping> {
        let mut names = property.names().iter();
        let first = names.next()?;
        let mut current = self.table_properties(table)?.get(first)?;
        for name in names {
            current = current.properties.get(name)?;
        }
        Some(current)
    }

    pub fn expression(&self, table: &TableId, property: &PropertyPath) -> Option<&str> {
        self.property(table, property)
            .map(|p| p.sourced_from.as_str())
    }

    /// Store `expression` as the `sourcedFrom` of a property, creating any
    /// missing structured parents on the way.
    pub fn set_expression(&mut self, table: &TableId, property: &PropertyPath, expression: &str) {
        let mut names = property.names().iter();
        let Some(first) = names.next() else {
            return;
        };
        let mut current = self
            .table_properties_mut(table)
            .entry(first.clone())
            .or_default();
        for name in names {
            current = current.properties.entry(name.clone()).or_default();
        }
        current.sourced_from = expression.to_string();
    }

    pub fn expression_context(&self, mapping_id: &str) -> Option<&str> {
        self.related(mapping_id)
            .map(|m| m.expression_context.as_str())
    }

    pub fn set_expression_context(&mut self, mapping_id: &str, context: &str) {
        self.related_mut(mapping_id).expression_context = context.to_string();
    }
}

/// Function offered in the expression builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingFunction {
    pub function_name: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Output of an evaluated expression: one value or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvaluatedOutput {
    Single(String),
    Multiple(Vec<String>),
}

impl EvaluatedOutput {
    pub fn items(&self) -> Vec<&str> {
        match self {
            EvaluatedOutput::Single(value) => vec![value.as_str()],
            EvaluatedOutput::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyEvaluation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<EvaluatedOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyEvaluation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntityEvaluation {
    pub related_entity_mapping_id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyEvaluation>,
}

/// Response of the "Test" action: per-property computed values or errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyEvaluation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_entity_mappings: Vec<RelatedEntityEvaluation>,
}

impl EvaluationResponse {
    pub fn property(&self, table: &TableId, property: &PropertyPath) -> Option<&PropertyEvaluation> {
        let properties = match table {
            TableId::Primary => &self.properties,
            TableId::Related(id) => {
                &self
                    .related_entity_mappings
                    .iter()
                    .find(|m| &m.related_entity_mapping_id == id)?
                    .properties
            }
        };
        let mut names = property.names().iter();
        let mut current = properties.get(names.next()?)?;
        for name in names {
            current = current.properties.get(name)?;
        }
        Some(current)
    }
}
