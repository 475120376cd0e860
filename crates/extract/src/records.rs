//! Fold per-page extracted data into one record per document.

use crate::error::ExtractError;
use crate::state::{PageAnswer, PipelineState};
use primitives::{ConflictPolicy, Entity, fold_page_data};
use serde_json::{Map, Value};

/// Stage function: fold the state's page answers into entities.
pub fn merge_extracted_data(
    mut state: PipelineState,
    policy: ConflictPolicy,
) -> Result<PipelineState, ExtractError> {
    let merged = merge_page_answers(&state.page_answers, policy)?;
    state.entities = entities_from_merged(merged);
    Ok(state)
}

/// Parse every page answer and fold them in page order. A page answer
/// that is not a JSON object is fatal for the record: the gateway
/// delivered it, so this is a malformed payload, not a transient skip.
pub fn merge_page_answers(
    answers: &[PageAnswer],
    policy: ConflictPolicy,
) -> Result<Map<String, Value>, ExtractError> {
    let mut pages = Vec::with_capacity(answers.len());
    for answer in answers {
        let value: Value = serde_json::from_str(&answer.content).map_err(|e| {
            ExtractError::malformed("record merge", format!("page {}: {e}", answer.ordinal))
        })?;
        match value {
            Value::Object(map) => pages.push(map),
            other => {
                return Err(ExtractError::malformed(
                    "record merge",
                    format!("page {} data is not a JSON object: {other}", answer.ordinal),
                ));
            }
        }
    }
    Ok(fold_page_data(pages, policy))
}

/// Each top-level key of the merged map becomes one entity. A scalar
/// top-level value is wrapped under a `value` attribute so entity
/// attributes stay a map.
pub fn entities_from_merged(merged: Map<String, Value>) -> Vec<Entity> {
    merged
        .into_iter()
        .map(|(id, value)| {
            let attributes = match value {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other);
                    map
                }
            };
            Entity {
                id,
                entity_type: "object".to_string(),
                attributes,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answer(ordinal: u32, content: &str) -> PageAnswer {
        PageAnswer {
            ordinal,
            content: content.to_string(),
        }
    }

    #[test]
    fn folds_pages_in_document_order() {
        let answers = [
            answer(1, r#"{"amount": "NA", "employee": {"name": "Lorenzo"}}"#),
            answer(2, r#"{"amount": 42, "employee": {"name": "overridden"}}"#),
        ];
        let merged = merge_page_answers(&answers, ConflictPolicy::FirstWins).unwrap();

        assert_eq!(merged["amount"], json!(42));
        assert_eq!(merged["employee"]["name"], json!("Lorenzo"));
    }

    #[test]
    fn unparseable_page_answer_is_fatal() {
        let answers = [answer(1, r#"{"a": 1}"#), answer(2, "")];
        let result = merge_page_answers(&answers, ConflictPolicy::FirstWins);

        match result {
            Err(ExtractError::MalformedPayload { reason, .. }) => {
                assert!(reason.contains("page 2"));
            }
            other => panic!("expected malformed payload, got {other:?}"),
        }
    }

    #[test]
    fn non_object_page_answer_is_fatal() {
        let answers = [answer(1, "[1, 2, 3]")];
        assert!(merge_page_answers(&answers, ConflictPolicy::FirstWins).is_err());
    }

    #[test]
    fn merged_keys_become_entities() {
        let merged = merge_page_answers(
            &[answer(1, r#"{"employee": {"name": "Lorenzo"}, "total": 7}"#)],
            ConflictPolicy::FirstWins,
        )
        .unwrap();
        let mut entities = entities_from_merged(merged);
        entities.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id, "employee");
        assert_eq!(entities[0].entity_type, "object");
        assert_eq!(entities[0].attributes["name"], json!("Lorenzo"));
        assert_eq!(entities[1].id, "total");
        assert_eq!(entities[1].attributes["value"], json!(7));
    }
}
