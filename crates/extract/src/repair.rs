//! The bounded generate/validate/repair loop that turns a schema into a
//! typed entity list.
//!
//! Earlier revisions of this pipeline synthesized executable code and ran
//! it in an isolated scope; here the gateway is asked for the structured
//! entity array directly and "execution" is deserialization into
//! [`Entity`] values plus validation. Repair is best-effort, not guaranteed
//! convergent: the contract only promises termination within the attempt
//! bound.

use crate::config::ParserConfig;
use crate::error::ExtractError;
use crate::prompt;
use llm::{LlmClient, strip_fence_markers};
use primitives::{Entity, Schema};
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Previous payload and captured fault, carried into a repair generation.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairFeedback {
    pub payload: String,
    pub error: String,
}

/// Every state the loop can be in. `Success` and `Failed` are the only
/// terminal states; `step` returns terminal states unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    /// Request a payload from the gateway; fresh on first entry, carrying
    /// feedback on re-entry from a failed validation.
    Generate {
        attempt: usize,
        feedback: Option<RepairFeedback>,
    },
    /// Deserialize and validate the stripped payload.
    Validate { attempt: usize, payload: String },
    Success {
        entities: Vec<Entity>,
        attempts: usize,
    },
    Failed {
        attempts: usize,
        last_error: String,
    },
}

impl LoopState {
    pub fn start() -> Self {
        Self::Generate {
            attempt: 0,
            feedback: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Failed { .. })
    }
}

/// Result of a full loop run. Exhaustion is non-fatal for the pipeline —
/// an empty entity list is valid input to the next stage — but callers
/// must be able to tell it apart from "legitimately empty", which is what
/// `degraded` is for.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub entities: Vec<Entity>,
    pub attempts: usize,
    /// Last validation fault when the attempt bound was exhausted.
    pub degraded: Option<String>,
}

impl ExtractionOutcome {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// One transition of the loop. Gateway failures during `Generate`
/// propagate as stage failures; validation faults feed the repair path.
pub async fn step<C: LlmClient>(
    client: &C,
    schema: &Schema,
    config: &ParserConfig,
    state: LoopState,
) -> Result<LoopState, ExtractError> {
    match state {
        LoopState::Generate { attempt, feedback } => {
            let prompt = match &feedback {
                None => prompt::entity_array_prompt(schema)?,
                Some(feedback) => prompt::repair_prompt(&feedback.payload, &feedback.error),
            };
            let answer = client.complete(&prompt, None).await?;
            Ok(LoopState::Validate {
                attempt,
                payload: strip_fence_markers(&answer),
            })
        }
        LoopState::Validate { attempt, payload } => {
            let attempts = attempt + 1;
            match parse_entity_array(&payload) {
                Ok(entities) => Ok(LoopState::Success { entities, attempts }),
                Err(fault) if attempts >= config.max_repair_attempts => Ok(LoopState::Failed {
                    attempts,
                    last_error: fault,
                }),
                Err(fault) => {
                    warn!(
                        attempt = attempts,
                        max_attempts = config.max_repair_attempts,
                        error = %fault,
                        "synthesized payload invalid, repairing"
                    );
                    Ok(LoopState::Generate {
                        attempt: attempts,
                        feedback: Some(RepairFeedback {
                            payload,
                            error: fault,
                        }),
                    })
                }
            }
        }
        terminal => Ok(terminal),
    }
}

/// Drive the loop from its initial state to a terminal one.
pub async fn run<C: LlmClient>(
    client: &C,
    schema: &Schema,
    config: &ParserConfig,
) -> Result<ExtractionOutcome, ExtractError> {
    let mut state = LoopState::start();
    loop {
        match step(client, schema, config, state).await? {
            LoopState::Success { entities, attempts } => {
                info!(entities = entities.len(), attempts, "entity extraction succeeded");
                return Ok(ExtractionOutcome {
                    entities,
                    attempts,
                    degraded: None,
                });
            }
            LoopState::Failed {
                attempts,
                last_error,
            } => {
                error!(
                    attempts,
                    error = %last_error,
                    "max attempts reached, returning empty entity list"
                );
                return Ok(ExtractionOutcome {
                    entities: Vec::new(),
                    attempts,
                    degraded: Some(last_error),
                });
            }
            next => state = next,
        }
    }
}

/// "Execute" a payload: parse it as an entity array and check the entity
/// invariants (non-empty, unique ids). Faults are returned as plain text
/// so they can be quoted back to the gateway in the repair prompt.
pub(crate) fn parse_entity_array(payload: &str) -> Result<Vec<Entity>, String> {
    if payload.trim().is_empty() {
        return Err("payload is empty".to_string());
    }

    let entities: Vec<Entity> =
        serde_json::from_str(payload).map_err(|e| format!("invalid entity array: {e}"))?;

    let mut seen = HashSet::new();
    for entity in &entities {
        if entity.id.is_empty() {
            return Err("entity with empty id".to_string());
        }
        if !seen.insert(entity.id.as_str()) {
            return Err(format!("duplicate entity id '{}'", entity.id));
        }
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::LlmError;
    use primitives::Schema;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(responses: impl IntoIterator<Item = Result<String, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn call(&self, index: usize) -> String {
            self.calls.lock().unwrap()[index].clone()
        }
    }

    impl LlmClient for ScriptedClient {
        async fn complete(
            &self,
            prompt: &str,
            _image: Option<&str>,
        ) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Transport("script exhausted".to_string())))
        }
    }

    fn schema() -> Schema {
        Schema::parse(r#"{"type": "object", "properties": {"a": {"type": "string"}}}"#).unwrap()
    }

    const VALID: &str = r#"```json
[{"id": "a", "type": "object", "attributes": {"x": "string"}}]
```"#;

    #[tokio::test]
    async fn succeeds_on_first_valid_payload() {
        let client = ScriptedClient::new([Ok(VALID.to_string())]);
        let outcome = run(&client, &schema(), &ParserConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.is_degraded());
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn repairs_after_invalid_payload() {
        let client = ScriptedClient::new([
            Ok("not json at all".to_string()),
            Ok(VALID.to_string()),
        ]);
        let outcome = run(&client, &schema(), &ParserConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.attempts, 2);
        assert!(!outcome.is_degraded());
        // The second generation is a repair prompt quoting the bad payload.
        assert!(client.call(1).contains("not json at all"));
    }

    #[tokio::test]
    async fn never_exceeds_the_attempt_bound() {
        let client = ScriptedClient::new([
            Ok("bad 1".to_string()),
            Ok("bad 2".to_string()),
            Ok("bad 3".to_string()),
            Ok("never requested".to_string()),
        ]);
        let outcome = run(&client, &schema(), &ParserConfig::default())
            .await
            .unwrap();

        assert!(outcome.entities.is_empty());
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.is_degraded());
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn gateway_failure_propagates() {
        let client = ScriptedClient::new([Err(LlmError::Timeout)]);
        let result = run(&client, &schema(), &ParserConfig::default()).await;
        assert!(matches!(result, Err(ExtractError::Gateway(_))));
    }

    #[test]
    fn rejects_duplicate_and_empty_ids() {
        let duplicate = r#"[
            {"id": "a", "type": "object", "attributes": {}},
            {"id": "a", "type": "object", "attributes": {}}
        ]"#;
        assert!(parse_entity_array(duplicate).unwrap_err().contains("duplicate"));

        let empty_id = r#"[{"id": "", "type": "object", "attributes": {}}]"#;
        assert!(parse_entity_array(empty_id).unwrap_err().contains("empty id"));

        assert!(parse_entity_array("   ").unwrap_err().contains("empty"));
    }

    #[test]
    fn terminal_states_are_stable() {
        let success = LoopState::Success {
            entities: Vec::new(),
            attempts: 1,
        };
        assert!(success.is_terminal());
        assert!(!LoopState::start().is_terminal());
    }
}
