use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::catalog::ModelConfig;
use super::gemini::GenerateContentResponse;
use super::groq::ChatCompletionResponse;
use super::types::{ProviderClient, ProviderFactory, ProviderRequest, RawProviderResponse};
use super::{ProviderError, RouterError};
use crate::models::{ConversationTurn, Provider};

/// A provider call as the mock saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub provider: Provider,
    pub model: String,
    pub system: Option<String>,
    pub history: Vec<ConversationTurn>,
    pub prompt: String,
    pub has_image: bool,
}

/// Mock provider for testing without network access. Answers every
/// prompt with a fixed reply in the provider's native response shape.
pub struct MockProviderClient {
    provider: Provider,
    reply: String,
    fail_when: Option<String>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockProviderClient {
    pub fn new(provider: Provider, reply: &str) -> Self {
        Self {
            provider,
            reply: reply.to_string(),
            fail_when: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ProviderClient for MockProviderClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn send(&self, request: &ProviderRequest<'_>) -> Result<RawProviderResponse, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                provider: self.provider,
                model: request.model.to_string(),
                system: request.system.map(str::to_string),
                history: request.history.to_vec(),
                prompt: request.prompt.to_string(),
                has_image: request.image.is_some(),
            });
        }

        if let Some(marker) = &self.fail_when {
            if request.prompt.contains(marker.as_str()) {
                return Err(ProviderError::Api {
                    provider: self.provider,
                    status: 500,
                    body: format!("mock failure on '{marker}'"),
                });
            }
        }

        Ok(match self.provider {
            Provider::Groq => {
                RawProviderResponse::ChatCompletion(ChatCompletionResponse::from_text(&self.reply))
            }
            Provider::Google => RawProviderResponse::GenerateContent(
                GenerateContentResponse::from_text(&self.reply),
            ),
        })
    }
}

/// Factory handing out `MockProviderClient`s that share one call log.
/// Clones share state, so a test can keep a handle after giving one to a router.
#[derive(Clone)]
pub struct MockProviderFactory {
    reply: String,
    fail_when: Option<String>,
    fail_build: bool,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    builds: Arc<AtomicUsize>,
}

impl MockProviderFactory {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail_when: None,
            fail_build: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            builds: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Calls whose prompt contains `marker` fail with an API error.
    pub fn failing_when(mut self, marker: &str) -> Self {
        self.fail_when = Some(marker.to_string());
        self
    }

    /// Client construction itself fails.
    pub fn failing_build(mut self) -> Self {
        self.fail_build = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for MockProviderFactory {
    fn build(
        &self,
        config: &ModelConfig,
        _api_key: &str,
    ) -> Result<Box<dyn ProviderClient>, RouterError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_build {
            return Err(RouterError::ProviderInit {
                provider: config.provider,
                reason: "mock build failure".into(),
            });
        }
        Ok(Box::new(MockProviderClient {
            provider: config.provider,
            reply: self.reply.clone(),
            fail_when: self.fail_when.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}
