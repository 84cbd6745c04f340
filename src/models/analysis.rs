use base64::Engine;
use serde::{Deserialize, Serialize};

use super::enums::AnalysisType;

/// Raw image bytes handed to a vision-capable model.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageAttachment {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:` URL form used by chat-completion image parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

impl std::fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// What gets analyzed. Exactly one shape per request.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisContent {
    Text(String),
    /// An image, optionally with text already extracted from it.
    Image {
        text: Option<String>,
        image: ImageAttachment,
    },
    /// Text plus snippets retrieved from previously stored analyses.
    TextWithContext { text: String, context: Vec<String> },
}

impl AnalysisContent {
    pub fn image(&self) -> Option<&ImageAttachment> {
        match self {
            Self::Image { image, .. } => Some(image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_text: String,
    pub model_used: String,
    pub analysis_type: AnalysisType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Success(AnalysisResult),
    Failure { error: String },
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl<E: std::fmt::Display> From<Result<AnalysisResult, E>> for AnalysisOutcome {
    fn from(result: Result<AnalysisResult, E>) -> Self {
        match result {
            Ok(r) => Self::Success(r),
            Err(e) => Self::Failure {
                error: e.to_string(),
            },
        }
    }
}
