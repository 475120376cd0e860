//! Relation extraction over the current entity set.

use crate::error::ExtractError;
use crate::prompt;
use llm::{LlmClient, extract_json_block};
use primitives::{Entity, Relation};
use std::collections::HashSet;
use tracing::info;

/// One gateway request given the entity set and the target relation
/// shape. The response must be a ```json-fenced array; a missing fence or
/// unparseable array is surfaced, and every relation endpoint must name
/// an existing entity id.
pub async fn extract_relations<C: LlmClient>(
    client: &C,
    entities: &[Entity],
    filter: Option<&str>,
) -> Result<Vec<Relation>, ExtractError> {
    if entities.is_empty() {
        return Err(ExtractError::Precondition(
            "entities not found, extract entities before relations".to_string(),
        ));
    }

    let prompt = prompt::relations_prompt(entities, filter)?;
    let answer = client.complete(&prompt, None).await?;

    let content = extract_json_block(&answer);
    if content.is_empty() {
        return Err(ExtractError::malformed(
            "relation extraction",
            "no ```json fence in response",
        ));
    }

    let relations: Vec<Relation> = serde_json::from_str(&content)
        .map_err(|e| ExtractError::malformed("relation extraction", format!("invalid relation array: {e}")))?;

    let known_ids: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
    for relation in &relations {
        for endpoint in [&relation.source, &relation.target] {
            if !known_ids.contains(endpoint.as_str()) {
                return Err(ExtractError::malformed(
                    "relation extraction",
                    format!(
                        "relation '{}' references unknown entity '{endpoint}'",
                        relation.name
                    ),
                ));
            }
        }
    }

    info!(count = relations.len(), "extracted relations");
    Ok(relations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::LlmError;

    struct FixedAnswer(String);

    impl LlmClient for FixedAnswer {
        async fn complete(&self, _prompt: &str, _image: Option<&str>) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    fn entities() -> Vec<Entity> {
        vec![Entity::new("fund", "object"), Entity::new("fees", "object")]
    }

    #[tokio::test]
    async fn empty_entity_set_is_a_precondition_violation() {
        let client = FixedAnswer("unused".to_string());
        let result = extract_relations(&client, &[], None).await;
        assert!(matches!(result, Err(ExtractError::Precondition(_))));
    }

    #[tokio::test]
    async fn parses_fenced_relation_array() {
        let client = FixedAnswer(
            "```json\n[{\"source\": \"fund\", \"target\": \"fees\", \"name\": \"charges\"}]\n```"
                .to_string(),
        );
        let relations = extract_relations(&client, &entities(), None).await.unwrap();

        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].source, "fund");
        assert_eq!(relations[0].name, "charges");
        assert_eq!(relations[0].relation_type, None);
    }

    #[tokio::test]
    async fn missing_fence_is_surfaced() {
        let client = FixedAnswer("[{\"source\": \"fund\"}]".to_string());
        let result = extract_relations(&client, &entities(), None).await;
        assert!(matches!(result, Err(ExtractError::MalformedPayload { .. })));
    }

    #[tokio::test]
    async fn unknown_endpoint_is_surfaced() {
        let client = FixedAnswer(
            "```json\n[{\"source\": \"fund\", \"target\": \"ghost\", \"name\": \"haunts\"}]\n```"
                .to_string(),
        );
        let result = extract_relations(&client, &entities(), None).await;

        match result {
            Err(ExtractError::MalformedPayload { reason, .. }) => {
                assert!(reason.contains("ghost"));
            }
            other => panic!("expected malformed payload, got {other:?}"),
        }
    }
}
