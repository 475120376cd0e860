use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// Completion cache keyed by a digest of (model, prompt, image payload).
/// Identical requests within one process reuse the previous answer.
pub struct ResponseCache {
    responses: DashMap<String, String>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            responses: DashMap::new(),
            max_entries,
        }
    }

    pub fn get(&self, model: &str, prompt: &str, image: Option<&str>) -> Option<String> {
        let key = Self::cache_key(model, prompt, image);
        self.responses.get(&key).map(|r| r.value().clone())
    }

    pub fn insert(&self, model: &str, prompt: &str, image: Option<&str>, response: String) {
        if self.responses.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self
                .responses
                .iter()
                .take(self.max_entries / 4)
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.responses.remove(&key);
            }
        }
        let key = Self::cache_key(model, prompt, image);
        self.responses.insert(key, response);
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    fn cache_key(model: &str, prompt: &str, image: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(prompt.as_bytes());
        if let Some(image) = image {
            hasher.update(image.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
