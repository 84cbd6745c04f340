use std::time::Instant;

use uuid::Uuid;

use super::types::{BatchItem, BatchResult, BatchSummary};
use crate::models::{AnalysisOutcome, AnalysisType};
use crate::pipeline::analysis::ContentAnalyzer;
use crate::pipeline::progress::{report, ProgressFn};

pub fn new_batch_id() -> String {
    Uuid::new_v4().to_string()
}

/// Drives an analyzer over a list of items, one at a time.
pub struct BatchOrchestrator<'a> {
    analyzer: &'a mut dyn ContentAnalyzer,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(analyzer: &'a mut dyn ContentAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Exactly one result per item, in order. Progress is reported after
    /// every item, failed or not.
    pub fn run_batch(
        &mut self,
        items: &[BatchItem],
        model_id: &str,
        analysis_type: AnalysisType,
        progress_fn: ProgressFn<'_>,
    ) -> Vec<BatchResult> {
        let batch_id = new_batch_id();
        let _span = tracing::info_span!(
            "batch",
            batch_id = %batch_id,
            items = items.len(),
            model = model_id
        )
        .entered();
        let start = Instant::now();
        let total = items.len();

        let mut results = Vec::with_capacity(total);
        for (index, item) in items.iter().enumerate() {
            let content_id = item.id_or_index(index);
            let outcome = match self.analyzer.analyze(&item.content, model_id, analysis_type) {
                Ok(result) => AnalysisOutcome::Success(result),
                Err(e) => {
                    tracing::warn!(content_id = %content_id, error = %e, "Batch item failed");
                    AnalysisOutcome::Failure {
                        error: e.to_string(),
                    }
                }
            };
            results.push(BatchResult {
                content_id,
                outcome,
            });
            report(progress_fn, index + 1, total);
        }

        let summary = BatchSummary::from_results(&results);
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch complete"
        );
        results
    }
}
