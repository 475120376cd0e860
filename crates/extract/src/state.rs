use ingest::PageImage;
use primitives::{Entity, Schema};

/// Raw answer for one page, tagged with the page's 1-based ordinal.
/// Ordinals are preserved so that order-sensitive folds run in document
/// page order even if answers were gathered out of order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageAnswer {
    pub ordinal: u32,
    pub content: String,
}

/// Accumulated inputs/outputs of one pipeline run.
///
/// Created at invocation, threaded by value through the stage functions
/// (each stage consumes the state and returns it updated), and discarded
/// when the run reaches its terminal state. Never shared across
/// concurrent runs. The repair loop keeps its attempt counter in its own
/// [`crate::repair::LoopState`], created and discarded within that stage.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub pages: Vec<PageImage>,
    pub page_answers: Vec<PageAnswer>,
    pub schema: Option<Schema>,
    pub entities: Vec<Entity>,
}

impl PipelineState {
    pub fn with_pages(pages: Vec<PageImage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }
}
