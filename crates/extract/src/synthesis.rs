//! Per-page gateway stages: structural schema proposals and value
//! extraction. Pages are processed one at a time in document order.

use crate::prompt;
use crate::state::{PageAnswer, PipelineState};
use crate::error::ExtractError;
use llm::{LlmClient, extract_json_block};
use tracing::{info, warn};

/// Ask the gateway for a partial schema proposal per page.
///
/// A transient failure on one page (timeout, network blip) is logged and
/// the page is skipped; the stage output may therefore be shorter than the
/// page list. Any other gateway failure aborts the stage.
pub async fn synthesize_page_schemas<C: LlmClient>(
    client: &C,
    mut state: PipelineState,
    filter: Option<&str>,
) -> Result<PipelineState, ExtractError> {
    let mut answers = Vec::with_capacity(state.pages.len());
    for page in &state.pages {
        let prompt = prompt::page_schema_prompt(page.ordinal, filter);
        match client.complete(&prompt, Some(&page.data)).await {
            Ok(answer) => {
                answers.push(PageAnswer {
                    ordinal: page.ordinal,
                    content: extract_json_block(&answer),
                });
                info!(page = page.ordinal, "processed page");
            }
            Err(e) if e.is_transient() => {
                warn!(page = page.ordinal, error = %e, "transient gateway failure, skipping page");
            }
            Err(e) => return Err(e.into()),
        }
    }
    state.page_answers = answers;
    Ok(state)
}

/// Extract data values for each page against an already-merged schema.
///
/// A failed gateway call skips the page; a delivered answer is kept even
/// when its fence is missing (the parse failure surfaces later, at merge
/// time, where it is fatal for the record).
pub async fn extract_page_data<C: LlmClient>(
    client: &C,
    mut state: PipelineState,
    schema_json: &str,
    filter: Option<&str>,
) -> PipelineState {
    let mut answers = Vec::with_capacity(state.pages.len());
    for page in &state.pages {
        let prompt = prompt::data_extraction_prompt(schema_json, filter);
        match client.complete(&prompt, Some(&page.data)).await {
            Ok(answer) => {
                answers.push(PageAnswer {
                    ordinal: page.ordinal,
                    content: extract_json_block(&answer),
                });
                info!(page = page.ordinal, "extracted data from page");
            }
            Err(e) => {
                warn!(page = page.ordinal, error = %e, "error extracting data from page, skipping");
            }
        }
    }
    state.page_answers = answers;
    state
}
