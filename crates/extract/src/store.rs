//! Parser-owned ontology state: the cached schema plus the current
//! entity and relation sets.

use primitives::{Entity, Relation, Schema};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default)]
pub struct OntologyStore {
    schema: Option<Schema>,
    entities: Vec<Entity>,
    relations: Vec<Relation>,
}

impl OntologyStore {
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn set_schema(&mut self, schema: Schema) {
        self.schema = Some(schema);
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Atomically overwrite the current entity set. Callers only invoke
    /// this after a successfully parsed reconciliation result, so a parse
    /// failure can never leave the set half-updated.
    pub fn replace_entities(&mut self, entities: Vec<Entity>) {
        self.entities = entities;
    }

    pub fn replace_relations(&mut self, relations: Vec<Relation>) {
        self.relations = relations;
    }

    /// Remove an entity and, with it, every relation referencing it as
    /// source or target. Returns false when no such entity exists.
    pub fn remove_entity(&mut self, entity_id: &str) -> bool {
        let before = self.entities.len();
        self.entities.retain(|entity| entity.id != entity_id);
        if self.entities.len() == before {
            return false;
        }

        let relations_before = self.relations.len();
        self.relations.retain(|relation| !relation.references(entity_id));
        info!(
            entity = entity_id,
            relations_removed = relations_before - self.relations.len(),
            "entity and its relations deleted"
        );
        true
    }

    /// Remove the relation identified by (source, target, name).
    pub fn remove_relation(&mut self, source: &str, target: &str, name: &str) -> bool {
        let before = self.relations.len();
        self.relations.retain(|relation| {
            !(relation.source == source && relation.target == target && relation.name == name)
        });
        self.relations.len() != before
    }
}

/// Parsed answer to the delete-by-description request.
#[derive(Debug, Deserialize)]
pub(crate) struct DeleteDirective {
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub clarification: Option<String>,
}

/// What a delete-by-description request ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    EntityDeleted(String),
    RelationDeleted {
        source: String,
        target: String,
        name: String,
    },
    /// The gateway could not resolve the description to one item; carries
    /// its clarification question.
    Unresolved(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(source: &str, target: &str, name: &str) -> Relation {
        Relation {
            source: source.to_string(),
            target: target.to_string(),
            name: name.to_string(),
            relation_type: None,
            attributes: None,
        }
    }

    fn store_with(entities: &[&str], relations: Vec<Relation>) -> OntologyStore {
        let mut store = OntologyStore::default();
        store.replace_entities(
            entities
                .iter()
                .map(|id| Entity::new(*id, "object"))
                .collect(),
        );
        store.replace_relations(relations);
        store
    }

    #[test]
    fn deleting_an_entity_cascades_to_its_relations() {
        let mut store = store_with(
            &["a", "b", "c"],
            vec![
                relation("a", "b", "uses"),
                relation("b", "a", "feeds"),
                relation("b", "c", "owns"),
            ],
        );

        assert!(store.remove_entity("a"));

        assert_eq!(store.entities().len(), 2);
        assert_eq!(store.relations().len(), 1);
        assert!(store.relations().iter().all(|r| !r.references("a")));
    }

    #[test]
    fn deleting_a_missing_entity_changes_nothing() {
        let mut store = store_with(&["a"], vec![relation("a", "a", "self")]);

        assert!(!store.remove_entity("ghost"));
        assert_eq!(store.entities().len(), 1);
        assert_eq!(store.relations().len(), 1);
    }

    #[test]
    fn removes_a_single_relation_by_key() {
        let mut store = store_with(
            &["a", "b"],
            vec![relation("a", "b", "uses"), relation("a", "b", "owns")],
        );

        assert!(store.remove_relation("a", "b", "uses"));
        assert_eq!(store.relations().len(), 1);
        assert_eq!(store.relations()[0].name, "owns");

        assert!(!store.remove_relation("a", "b", "uses"));
    }

    #[test]
    fn entity_replacement_is_wholesale() {
        let mut store = store_with(&["a"], Vec::new());
        store.replace_entities(vec![Entity::new("b", "object")]);

        assert_eq!(store.entities().len(), 1);
        assert_eq!(store.entities()[0].id, "b");
    }
}
