use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::TablesmithError;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const SYSTEM_PROMPT: &str = "You are a database expert. The user will be asking you questions \
about their CSV that they have uploaded. You will be providing them with what they want. \
For example, they might ask you, what are my top 5 highest grossing movies? You will then \
look into the database and provide them with the answer that makes it look all nice and \
clean in the terminal.";

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl CompletionConfig {
    pub fn builder() -> CompletionConfigBuilder {
        CompletionConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct CompletionConfigBuilder {
    config: CompletionConfig,
}

impl CompletionConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> CompletionConfig {
        self.config
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

/// Client for a hosted chat-completion model answering questions about loaded data.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    config: CompletionConfig,
    http: reqwest::Client,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self, TablesmithError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// The `ask` function sends `prompt` as the user turn, after the fixed system prompt, and
    /// waits for the full answer.
    ///
    /// Returns:
    ///
    /// The answer text, or a completion error for a missing API key, a non-success status or a
    /// response without content.
    pub async fn ask(&self, prompt: &str) -> Result<String, TablesmithError> {
        if self.config.api_key.trim().is_empty() {
            return Err(TablesmithError::Completion("API key is not set".into()));
        }

        let url = chat_url(&self.config.endpoint);

        log::debug!("Requesting completion from {} ({})", url, self.config.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body(&self.config.model, prompt))
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TablesmithError::Completion(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let body: Value = response.json().await?;

        parse_answer(&body)
    }
}

fn chat_url(endpoint: &str) -> String {
    format!("{}/chat/completions", endpoint.trim_end_matches('/'))
}

fn request_body(model: &str, prompt: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![
            Message {
                role: "system".into(),
                content: SYSTEM_PROMPT.into(),
            },
            Message {
                role: "user".into(),
                content: prompt.to_string(),
            },
        ],
        stream: false,
    }
}

/// Pulls `choices[0].message.content` out of a chat-completion response.
fn parse_answer(body: &Value) -> Result<String, TablesmithError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| {
            let detail = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("response has no message content");

            TablesmithError::Completion(detail.to_string())
        })
}
