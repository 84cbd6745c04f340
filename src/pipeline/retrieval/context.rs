//! Optional long-term store of past analyses.
//!
//! Storage problems never reach the caller: `store` reports `false`,
//! `search` comes back empty, and the failure is logged.

use serde_json::Value;

use super::StorageError;

/// Similarity store for analysis text.
pub trait VectorBackend: Send + Sync {
    fn add_text(&self, text: &str, metadata: &Value) -> Result<(), StorageError>;

    /// Up to `k` stored texts, most similar first.
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>, StorageError>;
}

impl<T: VectorBackend + ?Sized> VectorBackend for std::sync::Arc<T> {
    fn add_text(&self, text: &str, metadata: &Value) -> Result<(), StorageError> {
        (**self).add_text(text, metadata)
    }

    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>, StorageError> {
        (**self).similarity_search(query, k)
    }
}

pub struct RetrievalContext {
    backend: Option<Box<dyn VectorBackend>>,
}

impl RetrievalContext {
    pub fn new(backend: Box<dyn VectorBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A context with no backing store. Stores fail, searches find nothing.
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn store(&self, text: &str, metadata: &Value) -> bool {
        let Some(backend) = &self.backend else {
            tracing::debug!("Retrieval store unavailable, skipping store");
            return false;
        };
        match backend.add_text(text, metadata) {
            Ok(()) => {
                tracing::debug!(chars = text.len(), "Stored analysis text");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store analysis text");
                false
            }
        }
    }

    pub fn search(&self, query: &str, k: usize) -> Vec<String> {
        let Some(backend) = &self.backend else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }
        match backend.similarity_search(query, k) {
            Ok(mut hits) => {
                hits.truncate(k);
                tracing::debug!(k, hits = hits.len(), "Similarity search");
                hits
            }
            Err(e) => {
                tracing::warn!(error = %e, "Similarity search failed");
                Vec::new()
            }
        }
    }
}

impl Default for RetrievalContext {
    fn default() -> Self {
        Self::unavailable()
    }
}

impl std::fmt::Debug for RetrievalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalContext")
            .field("available", &self.is_available())
            .finish()
    }
}
