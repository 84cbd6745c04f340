use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::models::EnhancementProfile;

/// Result of extracting text (or metadata) from one piece of media.
///
/// `confidence` is on a 0–100 scale and is 0 whenever `text` is `None`.
/// Failures are carried in `error`; extraction never returns `Err` to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: Option<String>,
    pub confidence: f32,
    pub stats: ExtractionStats,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExtractionWarning>,
}

impl ExtractionResult {
    pub fn success(text: String, confidence: f32, stats: ExtractionStats) -> Self {
        Self {
            text: Some(text),
            confidence: confidence.clamp(0.0, 100.0),
            stats,
            error: None,
            warnings: vec![],
        }
    }

    /// Extraction ran but produced nothing usable.
    pub fn empty(stats: ExtractionStats, message: &str) -> Self {
        Self {
            text: None,
            confidence: 0.0,
            stats,
            error: Some(message.to_string()),
            warnings: vec![],
        }
    }

    pub fn failed(error: &ExtractionError) -> Self {
        Self::empty(ExtractionStats::None, &error.to_string())
    }

    pub fn with_warnings(mut self, warnings: Vec<ExtractionWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }
}

/// Per-kind statistics. Serializes as a flat string→value mapping with a `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionStats {
    Image {
        /// Raw OCR rows, including structural rows with no text.
        word_count: usize,
        /// Tokens that actually carry text.
        recognized_words: usize,
        enhancement_profile: EnhancementProfile,
    },
    Pdf {
        page_count: usize,
        pages_with_text: usize,
    },
    Video(VideoMetadata),
    None,
}

/// Container-level video metadata. No frames are decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub duration_secs: f64,
    pub fps: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
    pub codec: Option<String>,
    pub container: Option<String>,
}

/// Warnings about extraction quality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtractionWarning {
    BlurryImage,
    HandwritingDetected,
    LowConfidencePage { page: usize, confidence: f32 },
    PartialExtraction { reason: String },
}

/// One OCR output row. `confidence` is 0–100, or -1 for rows that carry no
/// recognized text (page, block, paragraph and line rows).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub text: String,
    pub confidence: f32,
}

impl OcrToken {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.confidence < 0.0
    }
}

/// Raw OCR result from the engine
#[derive(Debug, Clone, PartialEq)]
pub struct OcrPageResult {
    pub text: String,
    pub tokens: Vec<OcrToken>,
}

/// A named image in a batch extraction.
#[derive(Debug, Clone)]
pub struct BatchImage {
    pub name: String,
    pub bytes: Vec<u8>,
    pub profile: EnhancementProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedExtraction {
    pub name: String,
    pub result: ExtractionResult,
}

/// OCR engine abstraction (allows mocking for tests).
/// Input is an encoded (PNG) image.
pub trait OcrEngine {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError>;
}

/// PDF text extraction abstraction. Returns one string per page, in order.
pub trait PdfExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// Video container probe abstraction.
pub trait VideoProbe {
    fn probe(&self, path: &Path) -> Result<VideoMetadata, ExtractionError>;
}
