use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::prompt_templates::render_prompt;
use super::AnalysisError;
use crate::config::EngineConfig;
use crate::models::{AnalysisContent, AnalysisResult, AnalysisType, ImageAttachment};
use crate::pipeline::conversation::ConversationMemory;
use crate::pipeline::extraction::{ExtractionResult, ExtractionStats};
use crate::pipeline::import::MediaKind;
use crate::pipeline::retrieval::RetrievalContext;
use crate::pipeline::router::ModelRouter;

/// Anything that can turn content into an analysis. Batch runs go through this.
pub trait ContentAnalyzer {
    fn analyze(
        &mut self,
        content: &AnalysisContent,
        model_id: &str,
        analysis_type: AnalysisType,
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// Where a persisted analysis came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub source_type: MediaKind,
    pub filename: String,
    pub confidence: f32,
    pub stats: ExtractionStats,
}

impl SourceInfo {
    pub fn from_extraction(kind: MediaKind, filename: &str, extraction: &ExtractionResult) -> Self {
        Self {
            source_type: kind,
            filename: filename.to_string(),
            confidence: extraction.confidence,
            stats: extraction.stats.clone(),
        }
    }
}

/// Templated analysis over routed models, with per-engine conversation memory.
///
/// Memory is only read and written for history-aware providers, and only
/// after the call fully succeeds.
pub struct AnalysisEngine {
    router: ModelRouter,
    memory: ConversationMemory,
    retrieval: RetrievalContext,
    context_k: usize,
}

impl AnalysisEngine {
    pub fn new(router: ModelRouter, retrieval: RetrievalContext, config: &EngineConfig) -> Self {
        Self {
            router,
            memory: ConversationMemory::new(config.retention),
            retrieval,
            context_k: config.context_k,
        }
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn retrieval(&self) -> &RetrievalContext {
        &self.retrieval
    }

    pub fn reset_memory(&mut self) {
        self.memory.reset();
    }

    pub fn analyze(
        &mut self,
        content: &AnalysisContent,
        model_id: &str,
        analysis_type: AnalysisType,
    ) -> Result<AnalysisResult, AnalysisError> {
        let _span = tracing::info_span!(
            "analyze",
            model = model_id,
            analysis_type = analysis_type.as_str()
        )
        .entered();

        let prompt = render_prompt(content, analysis_type);
        let analysis_text = self.complete(model_id, &prompt, content.image())?;

        tracing::info!(chars = analysis_text.len(), "Analysis complete");
        Ok(AnalysisResult {
            analysis_text,
            model_used: model_id.to_string(),
            analysis_type,
        })
    }

    /// Analyze text grounded on similar previously stored analyses.
    pub fn analyze_with_context(
        &mut self,
        text: &str,
        model_id: &str,
        analysis_type: AnalysisType,
    ) -> Result<AnalysisResult, AnalysisError> {
        let context = self.retrieval.search(text, self.context_k);
        tracing::debug!(snippets = context.len(), "Retrieved context");
        let content = if context.is_empty() {
            AnalysisContent::Text(text.to_string())
        } else {
            AnalysisContent::TextWithContext {
                text: text.to_string(),
                context,
            }
        };
        self.analyze(&content, model_id, analysis_type)
    }

    /// Free-form chat turn, sent without an analysis template.
    pub fn chat(&mut self, model_id: &str, message: &str) -> Result<String, AnalysisError> {
        let _span = tracing::info_span!("chat", model = model_id).entered();
        self.complete(model_id, message, None)
    }

    /// Store the analysis text with its source metadata. `false` when the
    /// store is unavailable or rejects it.
    pub fn persist(&self, result: &AnalysisResult, source: &SourceInfo) -> bool {
        let metadata = json!({
            "source_type": source.source_type,
            "filename": source.filename,
            "confidence": source.confidence,
            "stats": source.stats,
            "model_used": result.model_used,
            "analysis_type": result.analysis_type,
            "stored_at": Utc::now().to_rfc3339(),
        });
        self.retrieval.store(&result.analysis_text, &metadata)
    }

    /// Resolve, invoke and normalize. Vision requests bypass memory;
    /// history-aware providers see and extend it.
    fn complete(
        &mut self,
        model_id: &str,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String, AnalysisError> {
        let model = self.router.resolve(model_id)?;
        let caps = model.capabilities();

        match image {
            Some(image) if caps.vision => {
                tracing::debug!("Invoking with image, history bypassed");
                let raw = model.invoke_with_image(prompt, image)?;
                Ok(model.normalize(raw)?)
            }
            _ if caps.history_aware => {
                tracing::debug!(history = self.memory.len(), "Invoking with history");
                let raw = model.invoke(prompt, self.memory.turns())?;
                let text = model.normalize(raw)?;
                self.memory.append_exchange(prompt, &text);
                Ok(text)
            }
            _ => {
                let raw = model.invoke(prompt, &[])?;
                Ok(model.normalize(raw)?)
            }
        }
    }
}

impl ContentAnalyzer for AnalysisEngine {
    fn analyze(
        &mut self,
        content: &AnalysisContent,
        model_id: &str,
        analysis_type: AnalysisType,
    ) -> Result<AnalysisResult, AnalysisError> {
        AnalysisEngine::analyze(self, content, model_id, analysis_type)
    }
}
