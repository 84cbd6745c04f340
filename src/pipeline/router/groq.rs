//! Groq chat-completions adapter (OpenAI-compatible wire format).

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::http::{build_client, execute};
use super::types::{ProviderClient, ProviderRequest, RawProviderResponse};
use super::{ProviderError, RouterError};
use crate::models::{Provider, Role};

pub struct GroqClient {
    base_url: String,
    api_key: String,
    client: Client,
    timeout_secs: u64,
}

impl GroqClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, RouterError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: build_client(Provider::Groq, timeout_secs)?,
            timeout_secs,
        })
    }
}

impl ProviderClient for GroqClient {
    fn provider(&self) -> Provider {
        Provider::Groq
    }

    fn send(&self, request: &ProviderRequest<'_>) -> Result<RawProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = build_request(request);

        tracing::debug!(
            model = request.model,
            messages = body.messages.len(),
            has_image = request.image.is_some(),
            "Sending chat completion"
        );

        let builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatCompletionResponse =
            execute(Provider::Groq, &self.base_url, self.timeout_secs, builder)?;
        Ok(RawProviderResponse::ChatCompletion(response))
    }
}

// ── Wire format ──

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: ChatContent,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    pub fn from_text(text: &str) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: ChatResponseMessage {
                    content: Some(text.to_string()),
                },
                finish_reason: Some("stop".into()),
            }],
        }
    }

    /// Content of the first choice.
    pub fn into_text(self) -> Result<String, ProviderError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: Provider::Groq,
                reason: "no choices".into(),
            })?;
        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ProviderError::EmptyResponse {
                provider: Provider::Groq,
                reason: format!(
                    "empty message (finish_reason: {})",
                    choice.finish_reason.as_deref().unwrap_or("unknown")
                ),
            }),
        }
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// System message, then history in order, then the new user prompt.
/// An image turns the final message into text + image parts.
pub fn build_request(request: &ProviderRequest<'_>) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(request.history.len() + 2);

    if let Some(system) = request.system {
        messages.push(ChatMessage {
            role: "system",
            content: ChatContent::Text(system.to_string()),
        });
    }

    messages.extend(request.history.iter().map(|turn| ChatMessage {
        role: role_name(turn.role),
        content: ChatContent::Text(turn.content.clone()),
    }));

    let content = match request.image {
        Some(image) => ChatContent::Parts(vec![
            ContentPart::Text {
                text: request.prompt.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            },
        ]),
        None => ChatContent::Text(request.prompt.to_string()),
    };
    messages.push(ChatMessage {
        role: "user",
        content,
    });

    ChatCompletionRequest {
        model: request.model.to_string(),
        messages,
        temperature: request.temperature,
    }
}
