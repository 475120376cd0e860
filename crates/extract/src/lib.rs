//! Staged extraction pipeline: turn a multi-page document into a unified
//! structural schema and reconciled, typed entity/relation records.
//!
//! The pipeline is a sequence of stages threaded over a per-run
//! [`PipelineState`] value: per-page schema synthesis, gateway-assisted
//! schema merge, a bounded generate/validate/repair loop producing the
//! entity list, entity reconciliation against the previously known set,
//! and a deterministic per-field fold combining per-page data into
//! records. The inference gateway and the page source are external
//! collaborators reached through the [`llm::LlmClient`] and
//! [`ingest::PageSource`] traits.

pub mod config;
pub mod error;
pub mod prompt;
pub mod reconcile;
pub mod records;
pub mod relations;
pub mod repair;
pub mod schema_merge;
pub mod state;
pub mod store;
pub mod synthesis;

pub use config::ParserConfig;
pub use error::ExtractError;
pub use repair::{ExtractionOutcome, LoopState};
pub use state::{PageAnswer, PipelineState};
pub use store::{DeleteOutcome, OntologyStore};

use ingest::{PageSource, RasterizeError};
use llm::{LlmClient, strip_fence_markers};
use primitives::{Entity, Record, Relation, Schema};
use std::path::Path;
use store::DeleteDirective;
use tracing::error;

/// Pipeline orchestrator: owns the gateway client, the page source, and
/// the ontology state accumulated across calls.
///
/// Each operation creates its own [`PipelineState`], so concurrent runs
/// against the same document must use independent parser instances.
pub struct DocumentParser<C, S> {
    client: C,
    source: S,
    config: ParserConfig,
    store: OntologyStore,
}

impl<C: LlmClient, S: PageSource> DocumentParser<C, S> {
    pub fn new(client: C, source: S) -> Self {
        Self::with_config(client, source, ParserConfig::default())
    }

    pub fn with_config(client: C, source: S, config: ParserConfig) -> Self {
        Self {
            client,
            source,
            config,
            store: OntologyStore::default(),
        }
    }

    /// Rasterize the document, propose a partial schema per page, and
    /// merge the proposals into one unified schema. The result is cached
    /// and reused by every subsequent extraction call; invoking this
    /// again re-derives and overwrites the cache.
    pub async fn produce_schema(
        &mut self,
        document: &Path,
        filter: Option<&str>,
    ) -> Result<Schema, ExtractError> {
        let pages = self.source.rasterize(document).await?;
        let state = PipelineState::with_pages(pages);
        let state = synthesis::synthesize_page_schemas(&self.client, state, filter).await?;
        let state = schema_merge::merge_page_schemas(&self.client, state).await?;

        let schema = state.schema.ok_or_else(|| {
            ExtractError::malformed("schema merge", "stage completed without a schema")
        })?;
        self.store.set_schema(schema.clone());
        Ok(schema)
    }

    /// Derive the entity list for the cached schema (producing the schema
    /// first when none is cached), reconcile it against the current
    /// entity set, and persist the reconciled set as the new current
    /// state.
    ///
    /// The returned outcome is degraded when the repair loop exhausted
    /// its attempt bound; the entity set is still updated (reconciling an
    /// empty incoming set is a no-op).
    pub async fn extract_entities(
        &mut self,
        document: &Path,
        filter: Option<&str>,
    ) -> Result<ExtractionOutcome, ExtractError> {
        let schema = match self.store.schema() {
            Some(schema) => schema.clone(),
            None => self.produce_schema(document, filter).await?,
        };

        let outcome = repair::run(&self.client, &schema, &self.config).await?;
        let reconciled =
            reconcile::reconcile_entities(&self.client, self.store.entities(), outcome.entities)
                .await?;
        self.store.replace_entities(reconciled.clone());

        Ok(ExtractionOutcome {
            entities: reconciled,
            attempts: outcome.attempts,
            degraded: outcome.degraded,
        })
    }

    /// Extract named relations among the current entities. Precondition:
    /// entities must have been extracted first.
    pub async fn extract_relations(
        &mut self,
        filter: Option<&str>,
    ) -> Result<Vec<Relation>, ExtractError> {
        let relations =
            relations::extract_relations(&self.client, self.store.entities(), filter).await?;
        self.store.replace_relations(relations.clone());
        Ok(relations)
    }

    /// Extract one data record per document against the cached schema.
    /// Unreadable documents are skipped with a logged error; documents
    /// whose merged data is empty contribute no record.
    pub async fn extract_records(
        &mut self,
        documents: &[&Path],
        filter: Option<&str>,
    ) -> Result<Vec<Record>, ExtractError> {
        let schema = self.store.schema().ok_or_else(|| {
            ExtractError::Precondition(
                "schema is not generated, produce a schema before extracting records".to_string(),
            )
        })?;
        let schema_json = serde_json::to_string_pretty(schema)?;

        let mut records = Vec::new();
        for document in documents {
            let pages = match self.source.rasterize(document).await {
                Ok(pages) => pages,
                Err(RasterizeError::NotFound(path)) => {
                    error!(document = %path.display(), "document not found, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let state = PipelineState::with_pages(pages);
            let state =
                synthesis::extract_page_data(&self.client, state, &schema_json, filter).await;
            let state = records::merge_extracted_data(state, self.config.conflict_policy)?;

            if !state.entities.is_empty() {
                records.push(Record {
                    id: document.to_string_lossy().into_owned(),
                    entities: state.entities,
                });
            }
        }
        Ok(records)
    }

    /// Merge an externally supplied schema into the cached one.
    /// Precondition: a schema must already be cached. An unusable gateway
    /// response keeps the cached schema unchanged.
    pub async fn merge_schemas(&mut self, other: &Schema) -> Result<Schema, ExtractError> {
        let current = self
            .store
            .schema()
            .ok_or_else(|| {
                ExtractError::Precondition(
                    "no schema to merge into, produce a schema first".to_string(),
                )
            })?
            .clone();

        let merged = schema_merge::merge_with_schema(&self.client, &current, other).await?;
        self.store.set_schema(merged.clone());
        Ok(merged)
    }

    /// Ask the gateway which entity or relation a natural-language
    /// description refers to, then delete it deterministically (cascading
    /// relations on entity deletes).
    pub async fn delete_by_description(
        &mut self,
        description: &str,
    ) -> Result<DeleteOutcome, ExtractError> {
        let entity_ids: Vec<&str> = self.store.entities().iter().map(|e| e.id.as_str()).collect();
        let prompt = prompt::delete_prompt(&entity_ids, self.store.relations(), description);
        let answer = self.client.complete(&prompt, None).await?;

        let directive: DeleteDirective = serde_json::from_str(&strip_fence_markers(&answer))
            .map_err(|e| {
                ExtractError::malformed("delete resolution", format!("invalid directive: {e}"))
            })?;

        match directive.kind.as_str() {
            "entity" => {
                let id = directive.id.ok_or_else(|| {
                    ExtractError::malformed("delete resolution", "entity directive without id")
                })?;
                if self.store.remove_entity(&id) {
                    Ok(DeleteOutcome::EntityDeleted(id))
                } else {
                    Err(ExtractError::malformed(
                        "delete resolution",
                        format!("unknown entity '{id}'"),
                    ))
                }
            }
            "relation" => {
                let label = directive.id.ok_or_else(|| {
                    ExtractError::malformed("delete resolution", "relation directive without id")
                })?;
                let relation = self
                    .relation_by_label(&label)
                    .ok_or_else(|| {
                        ExtractError::malformed(
                            "delete resolution",
                            format!("unknown relation label '{label}'"),
                        )
                    })?
                    .clone();
                self.store
                    .remove_relation(&relation.source, &relation.target, &relation.name);
                Ok(DeleteOutcome::RelationDeleted {
                    source: relation.source,
                    target: relation.target,
                    name: relation.name,
                })
            }
            _ => Ok(DeleteOutcome::Unresolved(
                directive
                    .clarification
                    .unwrap_or_else(|| "could not determine what to delete".to_string()),
            )),
        }
    }

    /// Resolve a positional relation label (R1, R2, ...) as used in the
    /// delete prompt.
    fn relation_by_label(&self, label: &str) -> Option<&Relation> {
        let index = label
            .strip_prefix('R')
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))?;
        self.store.relations().get(index)
    }

    /// Access the underlying gateway client.
    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.store.schema()
    }

    pub fn entities(&self) -> &[Entity] {
        self.store.entities()
    }

    pub fn relations(&self) -> &[Relation] {
        self.store.relations()
    }

    /// Delete an entity directly by id, cascading its relations.
    pub fn delete_entity(&mut self, entity_id: &str) -> bool {
        self.store.remove_entity(entity_id)
    }

    /// Delete a relation directly by its (source, target, name) key.
    pub fn delete_relation(&mut self, source: &str, target: &str, name: &str) -> bool {
        self.store.remove_relation(source, target, name)
    }
}
