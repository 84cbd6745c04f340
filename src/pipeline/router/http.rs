use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::catalog::ModelConfig;
use super::gemini::GeminiClient;
use super::groq::GroqClient;
use super::types::{ProviderClient, ProviderFactory};
use super::{ProviderError, RouterError};
use crate::config::ProviderEndpoints;
use crate::models::Provider;

/// Blocking HTTP client with the configured timeout.
pub(crate) fn build_client(provider: Provider, timeout_secs: u64) -> Result<Client, RouterError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RouterError::ProviderInit {
            provider,
            reason: format!("Failed to create HTTP client: {e}"),
        })
}

/// Send a request and decode a JSON body, mapping transport and status
/// failures onto `ProviderError`.
pub(crate) fn execute<R: DeserializeOwned>(
    provider: Provider,
    base_url: &str,
    timeout_secs: u64,
    request: RequestBuilder,
) -> Result<R, ProviderError> {
    let response = request.send().map_err(|e| {
        if e.is_connect() {
            ProviderError::Connection {
                provider,
                url: base_url.to_string(),
            }
        } else if e.is_timeout() {
            ProviderError::Timeout {
                provider,
                secs: timeout_secs,
            }
        } else {
            ProviderError::HttpClient(e.to_string())
        }
    })?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited { provider });
    }
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(ProviderError::Api {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .map_err(|e| ProviderError::ResponseParsing(e.to_string()))
}

/// Builds real HTTP clients against the configured endpoints.
pub struct HttpProviderFactory {
    endpoints: ProviderEndpoints,
}

impl HttpProviderFactory {
    pub fn new(endpoints: ProviderEndpoints) -> Self {
        Self { endpoints }
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn build(
        &self,
        config: &ModelConfig,
        api_key: &str,
    ) -> Result<Box<dyn ProviderClient>, RouterError> {
        let timeout = self.endpoints.timeout_secs;
        Ok(match config.provider {
            Provider::Groq => Box::new(GroqClient::new(
                &self.endpoints.groq_base_url,
                api_key,
                timeout,
            )?),
            Provider::Google => Box::new(GeminiClient::new(
                &self.endpoints.google_base_url,
                api_key,
                timeout,
            )?),
        })
    }
}
