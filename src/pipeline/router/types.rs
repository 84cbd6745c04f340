use serde::{Deserialize, Serialize};

use super::catalog::ModelConfig;
use super::gemini::GenerateContentResponse;
use super::groq::ChatCompletionResponse;
use super::{ProviderError, RouterError};
use crate::models::{ConversationTurn, ImageAttachment, Provider};

/// Everything a provider adapter needs for one call, in provider-neutral form.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub system: Option<&'a str>,
    pub history: &'a [ConversationTurn],
    pub prompt: &'a str,
    pub image: Option<&'a ImageAttachment>,
}

/// A provider's response before normalization. Each variant is the
/// native shape of one provider family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "body", rename_all = "snake_case")]
pub enum RawProviderResponse {
    ChatCompletion(ChatCompletionResponse),
    GenerateContent(GenerateContentResponse),
}

impl RawProviderResponse {
    /// Normalize to plain text with the adapter for `provider`.
    pub fn into_text(self, provider: Provider) -> Result<String, ProviderError> {
        match (provider, self) {
            (Provider::Groq, Self::ChatCompletion(r)) => r.into_text(),
            (Provider::Google, Self::GenerateContent(r)) => r.into_text(),
            (provider, _) => Err(ProviderError::ResponseShape(provider)),
        }
    }
}

/// What a resolved model can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Accepts the running conversation as explicit history.
    pub history_aware: bool,
    /// Accepts an image alongside the prompt.
    pub vision: bool,
}

impl Capabilities {
    pub fn of(config: &ModelConfig) -> Self {
        Self {
            history_aware: config.provider.is_history_aware(),
            vision: config.supports_vision,
        }
    }
}

/// One provider family's wire adapter (allows mocking for tests).
pub trait ProviderClient: Send + Sync {
    fn provider(&self) -> Provider;

    fn send(&self, request: &ProviderRequest<'_>) -> Result<RawProviderResponse, ProviderError>;
}

/// Builds provider clients for resolved models.
pub trait ProviderFactory: Send + Sync {
    fn build(
        &self,
        config: &ModelConfig,
        api_key: &str,
    ) -> Result<Box<dyn ProviderClient>, RouterError>;
}
