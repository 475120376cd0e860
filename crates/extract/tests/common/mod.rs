//! Deterministic fakes for the two external collaborators: a scripted
//! gateway and a fixture page source.

use ingest::{PageImage, PageSource, RasterizeError};
use llm::{LlmClient, LlmError};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Gateway fake that answers from a fixed script, recording every prompt.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(responses: impl IntoIterator<Item = Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call(&self, index: usize) -> String {
        self.calls.lock().unwrap()[index].clone()
    }
}

impl LlmClient for ScriptedClient {
    async fn complete(&self, prompt: &str, _image: Option<&str>) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Transport("script exhausted".to_string())))
    }
}

/// Page source fake serving pre-rasterized fixtures per document path.
pub struct FixtureSource {
    documents: HashMap<PathBuf, Vec<PageImage>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }

    pub fn with_document(mut self, path: &str, page_count: u32) -> Self {
        let pages = (1..=page_count)
            .map(|ordinal| PageImage::new(ordinal, format!("page-{ordinal}-jpeg-base64")))
            .collect();
        self.documents.insert(PathBuf::from(path), pages);
        self
    }
}

impl PageSource for FixtureSource {
    async fn rasterize(&self, document: &Path) -> Result<Vec<PageImage>, RasterizeError> {
        self.documents
            .get(document)
            .cloned()
            .ok_or_else(|| RasterizeError::NotFound(document.to_path_buf()))
    }
}

/// Shorthand for a ```json-fenced response body.
pub fn fenced(json: &str) -> Result<String, LlmError> {
    Ok(format!("```json\n{json}\n```"))
}
