use thiserror::Error;

/// Gateway failure classes. Transport problems (timeout, network blip) and
/// malformed payloads (missing expected field in an otherwise delivered
/// response) must stay distinguishable to callers: the former may be
/// retried or skipped, the latter never should be.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("gateway returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),
    #[error("client configuration: {0}")]
    Config(String),
}

impl LlmError {
    /// Transient failures are safe to retry or recover from locally;
    /// everything else reflects a request or payload problem that a retry
    /// will not fix.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::MalformedResponse(_) | Self::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}
