//! Chat-completion client
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint (Groq by default).
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::memory::ConversationTurn;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// Sampling settings for a single completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Seam between the pipeline and whatever produces completions.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Return the first choice's message content.
    ///
    /// A response without choices is `AdvisorError::EmptyCompletion`.
    async fn complete(
        &self,
        messages: &[ConversationTurn],
        options: CompletionOptions,
    ) -> Result<String>;
}

/// Reusable chat-completion client (connection-pooled)
pub struct ChatClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(config: &AdvisorConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for ChatClient {
    async fn complete(
        &self,
        messages: &[ConversationTurn],
        options: CompletionOptions,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        info!(
            model = %self.model,
            messages = messages.len(),
            temperature = options.temperature,
            "Calling chat completion API"
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completion request failed: {}", e);
                AdvisorError::LlmError(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Chat completion API error response: {}", error_text);
            return Err(AdvisorError::LlmError(format!(
                "API returned {}: {}",
                status, error_text
            )));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completion response: {}", e);
            AdvisorError::LlmError(format!("parse error: {}", e))
        })?;

        let answer = completion
            .choices
            .into_iter()
            .next()
            .ok_or(AdvisorError::EmptyCompletion)?
            .message
            .content
            .unwrap_or_default();

        debug!(chars = answer.len(), "Chat completion received");

        Ok(answer)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationTurn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
