use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::retry::is_throttling_message;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM provider rate limit exceeded (HTTP 429): {0}")]
    RateLimited(String),
    #[error("LLM provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("empty response from LLM provider")]
    EmptyResponse,
    #[error("invalid analysis from LLM provider: {0}")]
    InvalidAnalysis(String),
}

impl LlmError {
    // Only provider responses can signal throttling; parse and transport
    // failures may quote arbitrary text that happens to contain "429".
    pub fn is_throttled(&self) -> bool {
        match self {
            LlmError::RateLimited(_) => true,
            LlmError::Status { .. } => is_throttling_message(&self.to_string()),
            LlmError::Transport(_) | LlmError::EmptyResponse | LlmError::InvalidAnalysis(_) => {
                false
            }
        }
    }
}

/// Text completion backend used for transcript scoring.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

// OpenAI-compatible chat completions request format
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        model: &str,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(model = %self.model, prompt_len = prompt.len(), "calling LLM provider");
        let res = request.send().await?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::RateLimited(text));
        }
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = res.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_errors_are_recognised_by_message() {
        assert!(LlmError::RateLimited(String::new()).is_throttled());
        assert!(
            !LlmError::Status {
                status: 401,
                body: "bad key".into()
            }
            .is_throttled()
        );
        assert!(!LlmError::EmptyResponse.is_throttled());
    }

    #[test]
    fn invalid_analysis_quoting_429_is_not_throttling() {
        let err = LlmError::InvalidAnalysis(
            "invalid value: integer `429`, expected u8 at line 1 column 429".into(),
        );
        assert!(!err.is_throttled());

        let upstream = LlmError::Status {
            status: 503,
            body: "upstream rate limit reached".into(),
        };
        assert!(upstream.is_throttled());
    }

    #[test]
    fn request_body_matches_chat_completions_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.3,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client =
            OpenAiClient::new(reqwest::Client::new(), "http://localhost:8000/v1/", "m", None);
        assert_eq!(client.base_url, "http://localhost:8000/v1");
    }
}
