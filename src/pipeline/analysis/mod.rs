pub mod engine;
pub mod prompt_templates;

pub use engine::*;
pub use prompt_templates::*;

use thiserror::Error;

use crate::pipeline::router::{ProviderError, RouterError};

/// An analysis either fully succeeds or fails with one of these.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("Model invocation failed: {0}")]
    Invocation(#[from] ProviderError),
}
