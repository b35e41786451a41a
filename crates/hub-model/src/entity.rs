//! Target entity definitions as returned by the modeling service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityProperty {
    pub name: String,
    #[serde(default)]
    pub datatype: String,
    /// Property holds a list of values.
    #[serde(default)]
    pub multiple: bool,
    /// Foreign key to another entity type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_property_name: Option<String>,
    /// Nested properties of a structured type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<EntityProperty>,
}

impl EntityProperty {
    pub fn is_structured(&self) -> bool {
        !self.properties.is_empty()
    }
}

/// An entity type reachable from the primary entity through a relationship.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntityDefinition {
    pub entity_type: String,
    pub relationship_name: String,
    /// Entity type the relationship starts from.
    pub related_from: String,
    #[serde(default)]
    pub properties: Vec<EntityProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_entity_types: Vec<RelatedEntityDefinition>,
}

impl RelatedEntityDefinition {
    /// Identifier stored in `relatedEntityMappingId`, e.g.
    /// `BabyRegistry.ownedBy:Person`.
    pub fn mapping_id(&self) -> String {
        format!(
            "{}.{}:{}",
            self.entity_type, self.relationship_name, self.related_from
        )
    }

    /// Table title, e.g. `BabyRegistry (ownedBy Person)`.
    pub fn title(&self) -> String {
        format!(
            "{} ({} {})",
            self.entity_type, self.relationship_name, self.related_from
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    pub entity_type: String,
    #[serde(default)]
    pub properties: Vec<EntityProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_entity_types: Vec<RelatedEntityDefinition>,
}

impl EntityDefinition {
    /// All related entity definitions, depth-first, paired with the mapping
    /// id of the table they hang off (`None` for the primary table).
    pub fn related_tables(&self) -> Vec<(Option<String>, &RelatedEntityDefinition)> {
        fn visit<'a>(
            parent: Option<String>,
            defs: &'a [RelatedEntityDefinition],
            out: &mut Vec<(Option<String>, &'a RelatedEntityDefinition)>,
        ) {
            for def in defs {
                out.push((parent.clone(), def));
                visit(Some(def.mapping_id()), &def.related_entity_types, out);
            }
        }
        let mut out = Vec::new();
        visit(None, &self.related_entity_types, &mut out);
        out
    }
}
