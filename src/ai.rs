//! Remote model collaborator
//!
//! One request per command, no retry. Non-2xx responses become
//! [`RewerError::Remote`] with a message chosen by status.

use crate::config::{Config, Credentials};
use crate::error::RewerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Text completion: prompt in, model-authored markdown out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, RewerError>;
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Anthropic Messages API over `reqwest`.
pub struct AnthropicClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(config: &Config, credentials: &Credentials) -> Result<Self, RewerError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| RewerError::Remote(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!("{}/v1/messages", config.api_base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: credentials.api_key().to_string(),
        })
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, RewerError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        info!(model = %self.model, prompt_bytes = prompt.len(), max_tokens, "sending request");

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| RewerError::Remote(format!("Request to the model API failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RewerError::Remote(format!("Failed to read model API response: {}", e)))?;
        debug!(status = status.as_u16(), bytes = text.len(), "response received");

        if !status.is_success() {
            return Err(RewerError::Remote(status_message(status.as_u16(), &text)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text).map_err(|e| {
            RewerError::Remote(format!(
                "Failed to parse model API response: {}\n{}",
                e,
                truncate_str(&text, 200)
            ))
        })?;

        let reply: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if reply.trim().is_empty() {
            return Err(RewerError::Remote("The model returned an empty response.".to_string()));
        }
        Ok(reply)
    }
}

fn status_message(status: u16, body: &str) -> String {
    match status {
        401 => format!(
            "Invalid API key. Check the {} environment variable.",
            crate::config::API_KEY_VAR
        ),
        429 => "Rate limited by the model API. Try again in a few minutes.".to_string(),
        500..=599 => format!(
            "Model API server error ({}). The service may be temporarily unavailable.",
            status
        ),
        _ => {
            let detail = serde_json::from_str::<ErrorEnvelope>(body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| truncate_str(body, 200).to_string());
            format!("API error {}: {}", status, detail)
        }
    }
}

/// Truncate a string for display (Unicode-safe)
fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
