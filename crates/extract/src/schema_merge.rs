//! Fold all per-page schema proposals into one unified schema, and merge
//! externally supplied schemas into the cached one.

use crate::error::ExtractError;
use crate::prompt;
use crate::state::PipelineState;
use llm::{LlmClient, extract_json_block, strip_fence_markers};
use primitives::Schema;
use tracing::{error, info};

/// One gateway request carrying every page answer; the response must be a
/// ```json-fenced schema. A missing fence or an unparseable schema is a
/// hard failure for this stage — an empty payload is never treated as an
/// empty schema.
pub async fn merge_page_schemas<C: LlmClient>(
    client: &C,
    mut state: PipelineState,
) -> Result<PipelineState, ExtractError> {
    let prompt = prompt::schema_merge_prompt(&state.page_answers);
    let answer = client.complete(&prompt, None).await?;

    let content = extract_json_block(&answer);
    if content.is_empty() {
        return Err(ExtractError::malformed(
            "schema merge",
            "no ```json fence in response",
        ));
    }

    let schema = Schema::parse(&content)?;
    info!(
        properties = schema.properties.len(),
        "merged page schemas into unified schema"
    );
    state.schema = Some(schema);
    Ok(state)
}

/// Merge `incoming` into `current` via one gateway request. A response
/// that does not parse as a schema keeps `current` unchanged (logged
/// no-op); gateway failures propagate.
pub async fn merge_with_schema<C: LlmClient>(
    client: &C,
    current: &Schema,
    incoming: &Schema,
) -> Result<Schema, ExtractError> {
    let prompt = prompt::schema_update_prompt(current, incoming)?;
    let answer = client.complete(&prompt, None).await?;

    match Schema::parse(&strip_fence_markers(&answer)) {
        Ok(merged) => Ok(merged),
        Err(e) => {
            error!(error = %e, "unable to parse merged schema, keeping current schema");
            Ok(current.clone())
        }
    }
}
