//! Single entry point for one uploaded file:
//! extract → (optional retrieval context) → analyze → (optional) persist.

use serde::{Deserialize, Serialize};

use crate::models::{
    AnalysisContent, AnalysisOutcome, AnalysisResult, AnalysisType, EnhancementProfile,
    ImageAttachment,
};
use crate::pipeline::analysis::{AnalysisEngine, AnalysisError, SourceInfo};
use crate::pipeline::extraction::{ContentExtractor, ExtractionResult};
use crate::pipeline::import::{MediaInput, MediaKind};
use crate::pipeline::progress::ProgressFn;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRequest {
    pub model_id: String,
    pub analysis_type: AnalysisType,
    pub profile: EnhancementProfile,
    /// Ground text analysis on similar stored analyses. Images sent to a
    /// vision model are analyzed as images, without context.
    pub use_context: bool,
    /// Store a successful analysis for later retrieval.
    pub persist: bool,
}

impl ProcessRequest {
    pub fn new(model_id: impl Into<String>, analysis_type: AnalysisType) -> Self {
        Self {
            model_id: model_id.into(),
            analysis_type,
            profile: EnhancementProfile::Default,
            use_context: false,
            persist: false,
        }
    }
}

/// Everything that happened to one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    pub file_name: String,
    pub media_kind: MediaKind,
    pub extraction: ExtractionResult,
    /// `None` when extraction yielded no text to analyze.
    pub analysis: Option<AnalysisOutcome>,
    pub stored: bool,
}

pub struct DocumentProcessor<'a> {
    extractor: &'a ContentExtractor,
    engine: &'a mut AnalysisEngine,
}

impl<'a> DocumentProcessor<'a> {
    pub fn new(extractor: &'a ContentExtractor, engine: &'a mut AnalysisEngine) -> Self {
        Self { extractor, engine }
    }

    pub fn process(
        &mut self,
        input: &MediaInput,
        request: &ProcessRequest,
        progress_fn: ProgressFn<'_>,
    ) -> ProcessingOutcome {
        let _span = tracing::info_span!(
            "process",
            file = %input.file_name,
            model = %request.model_id
        )
        .entered();

        let kind = input.kind();
        let extraction = self.extractor.extract(input, request.profile, progress_fn);

        let Some(text) = extraction.text.clone().filter(|t| !t.trim().is_empty()) else {
            tracing::info!(
                error = extraction.error.as_deref().unwrap_or("no text"),
                "Skipping analysis"
            );
            return ProcessingOutcome {
                file_name: input.file_name.clone(),
                media_kind: kind,
                extraction,
                analysis: None,
                stored: false,
            };
        };

        let result = self.analyze(input, kind, text, request);
        let stored = match (&result, request.persist) {
            (Ok(analysis), true) => {
                let source = SourceInfo::from_extraction(kind, &input.file_name, &extraction);
                self.engine.persist(analysis, &source)
            }
            _ => false,
        };

        if let Err(e) = &result {
            tracing::warn!(error = %e, "Analysis failed");
        }

        ProcessingOutcome {
            file_name: input.file_name.clone(),
            media_kind: kind,
            extraction,
            analysis: Some(result.into()),
            stored,
        }
    }

    fn analyze(
        &mut self,
        input: &MediaInput,
        kind: MediaKind,
        text: String,
        request: &ProcessRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        let sends_image = self
            .engine
            .router()
            .catalog()
            .get(&request.model_id)
            .is_some_and(|model| model.supports_vision);

        match kind {
            // Text-only models get the OCR text, so it can be grounded like any text.
            MediaKind::Image if sends_image || !request.use_context => {
                let content = AnalysisContent::Image {
                    text: Some(text),
                    image: ImageAttachment::new(input.bytes.clone(), input.declared_type.clone()),
                };
                self.engine
                    .analyze(&content, &request.model_id, request.analysis_type)
            }
            _ if request.use_context => {
                self.engine
                    .analyze_with_context(&text, &request.model_id, request.analysis_type)
            }
            _ => self.engine.analyze(
                &AnalysisContent::Text(text),
                &request.model_id,
                request.analysis_type,
            ),
        }
    }
}
