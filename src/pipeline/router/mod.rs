//! Model catalog, provider adapters, and resolution of a model identifier
//! to something that can be invoked.

pub mod catalog;
pub mod gemini;
pub mod groq;
pub mod http;
pub mod mock;
pub mod model_router;
pub mod types;

pub use catalog::*;
pub use mock::*;
pub use model_router::*;
pub use types::*;

use thiserror::Error;

use crate::models::Provider;

/// Failure to turn a model identifier into an invocable model.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Cannot initialize {provider} client: {reason}")]
    ProviderInit { provider: Provider, reason: String },
}

/// Failure while invoking a provider or reading its response. Never retried.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Cannot reach {provider} at {url}")]
    Connection { provider: Provider, url: String },

    #[error("{provider} request timed out after {secs}s")]
    Timeout { provider: Provider, secs: u64 },

    #[error("{provider} rate limit exceeded")]
    RateLimited { provider: Provider },

    #[error("{provider} returned error (status {status}): {body}")]
    Api {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("{provider} returned no content: {reason}")]
    EmptyResponse { provider: Provider, reason: String },

    #[error("Model {0} does not accept images")]
    VisionUnsupported(String),

    #[error("Response shape does not match provider {0}")]
    ResponseShape(Provider),
}
