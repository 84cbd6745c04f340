use serde::{Deserialize, Serialize};

use crate::models::{AnalysisContent, AnalysisOutcome};

/// One unit of batch work. Items without an id get `item_{index}`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub content_id: Option<String>,
    pub content: AnalysisContent,
}

impl BatchItem {
    pub fn new(content: AnalysisContent) -> Self {
        Self {
            content_id: None,
            content,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.content_id = Some(id.into());
        self
    }

    pub(crate) fn id_or_index(&self, index: usize) -> String {
        self.content_id
            .clone()
            .unwrap_or_else(|| format!("item_{index}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub content_id: String,
    pub outcome: AnalysisOutcome,
}

/// Counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[BatchResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}
