use ingest::RasterizeError;
use llm::LlmError;
use primitives::schema::SchemaParseError;
use thiserror::Error;

/// Pipeline failure classes. Callers see three outcome shapes per
/// operation: success with data, success with an empty-and-degraded
/// outcome (see [`crate::ExtractionOutcome`]), or one of these errors.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("inference gateway: {0}")]
    Gateway(#[from] LlmError),
    #[error("page source: {0}")]
    PageSource(#[from] RasterizeError),
    /// The gateway answered, but the payload was unusable (missing fence,
    /// invalid JSON, shape violation) at a stage where that is fatal.
    #[error("malformed gateway payload during {stage}: {reason}")]
    MalformedPayload { stage: &'static str, reason: String },
    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] SchemaParseError),
    /// Caller programming error (e.g. requesting relations before any
    /// entities exist). Raised immediately, never retried.
    #[error("precondition violated: {0}")]
    Precondition(String),
    #[error("internal serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExtractError {
    pub(crate) fn malformed(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            stage,
            reason: reason.into(),
        }
    }
}
