pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fence;
pub mod retry;

pub use cache::ResponseCache;
pub use client::OpenAiClient;
pub use config::{CacheConfig, LlmConfig, RetryConfig};
pub use error::LlmError;
pub use fence::{extract_json_block, strip_fence_markers};
pub use retry::RetryPolicy;

/// Text/image-conditioned completion service.
///
/// Every call is a fallible, non-idempotent external dependency: callers
/// must not assume well-formed output and must keep their own invariants
/// regardless of what comes back. `image` is a base64-encoded JPEG page;
/// implementations that cannot attach images may ignore it.
#[allow(async_fn_in_trait)]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str, image: Option<&str>) -> Result<String, LlmError>;
}
