use super::catalog::{default_catalog, ModelCatalog, ModelConfig};
use super::http::HttpProviderFactory;
use super::types::{Capabilities, ProviderClient, ProviderFactory, ProviderRequest, RawProviderResponse};
use super::{ProviderError, RouterError};
use crate::config::{AppConfig, Credentials};
use crate::models::{ConversationTurn, ImageAttachment};

/// Resolves model identifiers against the catalog and builds the matching
/// provider client.
pub struct ModelRouter {
    catalog: ModelCatalog,
    credentials: Credentials,
    factory: Box<dyn ProviderFactory>,
}

impl ModelRouter {
    pub fn new(
        catalog: ModelCatalog,
        credentials: Credentials,
        factory: Box<dyn ProviderFactory>,
    ) -> Self {
        Self {
            catalog,
            credentials,
            factory,
        }
    }

    /// Default catalog with real HTTP clients.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            default_catalog(),
            config.credentials.clone(),
            Box::new(HttpProviderFactory::new(config.endpoints.clone())),
        )
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Unknown identifiers fail before any provider client is built.
    pub fn resolve(&self, model_id: &str) -> Result<InvocableModel, RouterError> {
        let config = self
            .catalog
            .get(model_id)
            .ok_or_else(|| RouterError::UnsupportedModel(model_id.to_string()))?
            .clone();

        let api_key = self.credentials.get(config.provider).ok_or_else(|| {
            RouterError::ProviderInit {
                provider: config.provider,
                reason: format!("{} is not set", config.provider.credential_var()),
            }
        })?;

        let client = self.factory.build(&config, api_key)?;

        tracing::debug!(
            model = %config.identifier,
            provider = config.provider.as_str(),
            vision = config.supports_vision,
            "Model resolved"
        );

        Ok(InvocableModel { config, client })
    }
}

/// A resolved model bound to its provider client.
pub struct InvocableModel {
    config: ModelConfig,
    client: Box<dyn ProviderClient>,
}

impl InvocableModel {
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::of(&self.config)
    }

    /// Text prompt with explicit conversation history (may be empty).
    pub fn invoke(
        &self,
        prompt: &str,
        history: &[ConversationTurn],
    ) -> Result<RawProviderResponse, ProviderError> {
        self.client.send(&self.request(prompt, history, None))
    }

    /// Prompt plus image, without history. Only for vision models.
    pub fn invoke_with_image(
        &self,
        prompt: &str,
        image: &ImageAttachment,
    ) -> Result<RawProviderResponse, ProviderError> {
        if !self.config.supports_vision {
            return Err(ProviderError::VisionUnsupported(
                self.config.identifier.clone(),
            ));
        }
        self.client.send(&self.request(prompt, &[], Some(image)))
    }

    /// Normalize a raw response with this model's provider adapter.
    pub fn normalize(&self, raw: RawProviderResponse) -> Result<String, ProviderError> {
        raw.into_text(self.config.provider)
    }

    fn request<'a>(
        &'a self,
        prompt: &'a str,
        history: &'a [ConversationTurn],
        image: Option<&'a ImageAttachment>,
    ) -> ProviderRequest<'a> {
        ProviderRequest {
            model: &self.config.identifier,
            temperature: self.config.temperature,
            system: self.config.system_prompt.as_deref(),
            history,
            prompt,
            image,
        }
    }
}

impl std::fmt::Debug for InvocableModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocableModel")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
