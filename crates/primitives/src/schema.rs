use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Recursive structural description of a document's fields, independent of
/// any particular document instance.
///
/// Mirrors the JSON Schema subset the inference gateway is asked to emit:
/// every node has a `type`, object nodes carry `properties` and `required`,
/// array nodes carry `items`. Property keys are unique by map construction
/// and the tree is finite and acyclic by ownership. Unknown JSON Schema
/// keywords on input are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("required field '{name}' at '{path}' is not declared in properties")]
    RequiredNotDeclared { path: String, name: String },
    #[error("schema has no properties")]
    Empty,
}

impl Schema {
    /// A leaf node carrying only a scalar type name.
    pub fn leaf(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Self::default()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.properties.is_empty() && self.items.is_none()
    }

    /// Parse a schema from JSON text and check its invariants.
    pub fn parse(text: &str) -> Result<Self, SchemaParseError> {
        let schema: Schema = serde_json::from_str(text)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check `required ⊆ keys(properties)` at every node. A schema that
    /// names undeclared required fields is a contract violation from the
    /// gateway, not a valid state.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.validate_node("$")
    }

    fn validate_node(&self, path: &str) -> Result<(), SchemaError> {
        for name in &self.required {
            if !self.properties.contains_key(name) {
                return Err(SchemaError::RequiredNotDeclared {
                    path: path.to_string(),
                    name: name.clone(),
                });
            }
        }
        for (name, child) in &self.properties {
            child.validate_node(&format!("{path}.{name}"))?;
        }
        if let Some(items) = &self.items {
            items.validate_node(&format!("{path}[]"))?;
        }
        Ok(())
    }

    /// Names of the top-level properties, in stored order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}

/// Failure to turn gateway text into a valid schema.
#[derive(Debug, Error)]
pub enum SchemaParseError {
    #[error("schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] SchemaError),
}
