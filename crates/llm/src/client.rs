use crate::LlmClient;
use crate::cache::ResponseCache;
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Client for any OpenAI-compatible chat-completions endpoint, with
/// optional page-image attachment.
pub struct OpenAiClient {
    api_key: String,
    config: LlmConfig,
    http_client: reqwest::Client,
    retry: RetryPolicy,
    cache: Option<ResponseCache>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    #[serde(flatten)]
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text { content: String },
    Multimodal { content: Vec<ContentPart> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, config: LlmConfig) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        let retry = RetryPolicy::new(&config.retry);
        let cache = config
            .cache
            .enabled
            .then(|| ResponseCache::new(config.cache.max_entries));

        Ok(Self {
            api_key: api_key.into(),
            config,
            http_client,
            retry,
            cache,
        })
    }

    /// Read the API key from `OPENAI_API_KEY` (and the endpoint root from
    /// `OPENAI_API_BASE` when set).
    pub fn from_env(mut config: LlmConfig) -> Result<Self, LlmError> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::Config("OPENAI_API_KEY environment variable not set".into()))?;
        if let Ok(base_url) = env::var("OPENAI_API_BASE") {
            config.base_url = base_url;
        }
        Self::new(api_key, config)
    }

    fn build_request(&self, prompt: &str, image: Option<&str>) -> ChatRequest {
        let content = match image {
            Some(image) => MessageContent::Multimodal {
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/jpeg;base64,{image}"),
                        },
                    },
                ],
            },
            None => MessageContent::Text {
                content: prompt.to_string(),
            },
        };

        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    async fn request(&self, prompt: &str, image: Option<&str>) -> Result<String, LlmError> {
        let request = self.build_request(prompt, image);

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::MalformedResponse(format!("invalid completion body: {e}")))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("no choices in response".to_string()))?
            .message
            .content
            .ok_or_else(|| LlmError::MalformedResponse("no content in first choice".to_string()))
    }
}

impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str, image: Option<&str>) -> Result<String, LlmError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&self.config.model, prompt, image) {
                return Ok(hit);
            }
        }

        let answer = self
            .retry
            .retry("chat_completion", || self.request(prompt, image))
            .await?;

        if let Some(cache) = &self.cache {
            cache.insert(&self.config.model, prompt, image, answer.clone());
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_request_serializes_plain_content() {
        let client = OpenAiClient::new("key", LlmConfig::default()).unwrap();
        let request = client.build_request("hello", None);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hello");
    }

    #[test]
    fn image_request_serializes_multimodal_parts() {
        let client = OpenAiClient::new("key", LlmConfig::default()).unwrap();
        let request = client.build_request("describe", Some("QUJD"));

        let value = serde_json::to_value(&request).unwrap();
        let parts = value["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            "data:image/jpeg;base64,QUJD"
        );
    }
}
