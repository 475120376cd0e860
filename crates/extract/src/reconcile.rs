//! Merge newly produced entities into the existing entity set without
//! losing previously known data.

use crate::error::ExtractError;
use crate::prompt;
use crate::repair::parse_entity_array;
use llm::{LlmClient, strip_fence_markers};
use primitives::Entity;
use tracing::{error, info};

/// Reconcile `incoming` against `existing`.
///
/// The adoption rule is enforced deterministically: an empty existing set
/// takes the incoming set verbatim with no gateway involvement, and an
/// empty incoming set changes nothing. Otherwise the gateway is asked to
/// merge under the declared rules (matching id → update attributes,
/// unmatched id → append). A response that does not parse as an entity
/// array leaves the existing set untouched — the update degrades to a
/// logged no-op, never to partial corruption.
pub async fn reconcile_entities<C: LlmClient>(
    client: &C,
    existing: &[Entity],
    incoming: Vec<Entity>,
) -> Result<Vec<Entity>, ExtractError> {
    if existing.is_empty() {
        info!(count = incoming.len(), "no existing entities, adopting incoming set");
        return Ok(incoming);
    }
    if incoming.is_empty() {
        return Ok(existing.to_vec());
    }

    let prompt = prompt::reconcile_prompt(existing, &incoming)?;
    let answer = client.complete(&prompt, None).await?;

    match parse_entity_array(&strip_fence_markers(&answer)) {
        Ok(updated) => {
            info!(count = updated.len(), "entities updated");
            Ok(updated)
        }
        Err(fault) => {
            error!(error = %fault, "unable to parse reconciliation response, keeping existing entities");
            Ok(existing.to_vec())
        }
    }
}
