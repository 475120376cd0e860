pub mod merge;
pub mod schema;

pub use merge::{ConflictPolicy, fold_page_data, is_absent, merge_preferring_present};
pub use schema::{Schema, SchemaError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A typed, identified bundle of attribute values extracted from a document.
///
/// `id` is unique within an entity set. Attribute values may be nested
/// maps/lists/scalars mirroring the schema leaf types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub attributes: Map<String, Value>,
}

impl Entity {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            attributes: Map::new(),
        }
    }
}

/// A named, directed edge between two entity ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

impl Relation {
    /// True if the relation touches `entity_id` as either endpoint.
    pub fn references(&self, entity_id: &str) -> bool {
        self.source == entity_id || self.target == entity_id
    }
}

/// An entity set scoped to one source document; the unit of output for
/// multi-document batch extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub entities: Vec<Entity>,
}
