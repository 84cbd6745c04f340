use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use uuid::Uuid;

use super::context::VectorBackend;
use super::StorageError;

/// Process-local backend ranking stored texts by shared-token count.
/// Nothing is persisted.
pub struct InMemoryVectorBackend {
    entries: Mutex<Vec<StoredText>>,
}

#[derive(Debug, Clone)]
struct StoredText {
    id: Uuid,
    text: String,
    metadata: Value,
    tokens: HashSet<String>,
}

impl InMemoryVectorBackend {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Metadata stored alongside each text, in insertion order.
    pub fn metadata(&self) -> Vec<(Uuid, Value)> {
        self.lock()
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| (e.id, e.metadata.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<StoredText>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl Default for InMemoryVectorBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

impl VectorBackend for InMemoryVectorBackend {
    fn add_text(&self, text: &str, metadata: &Value) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        entries.push(StoredText {
            id: Uuid::new_v4(),
            text: text.to_string(),
            metadata: metadata.clone(),
            tokens: tokenize(text),
        });
        Ok(())
    }

    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>, StorageError> {
        let query_tokens = tokenize(query);
        let entries = self.lock()?;

        let mut scored: Vec<(usize, &StoredText)> = entries
            .iter()
            .map(|e| (e.tokens.intersection(&query_tokens).count(), e))
            .filter(|(score, _)| *score > 0)
            .collect();
        // Stable: equal scores keep insertion order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, e)| e.text.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ranks_by_token_overlap() {
        let store = InMemoryVectorBackend::new();
        store.add_text("Rust ownership and borrowing", &json!({})).unwrap();
        store.add_text("Borrowing rules in Rust explained", &json!({})).unwrap();
        store.add_text("Baking sourdough bread", &json!({})).unwrap();

        let hits = store.similarity_search("rust borrowing rules", 5).unwrap();
        assert_eq!(
            hits,
            vec!["Borrowing rules in Rust explained", "Rust ownership and borrowing"]
        );
    }

    #[test]
    fn respects_k() {
        let store = InMemoryVectorBackend::new();
        for i in 0..5 {
            store.add_text(&format!("note {i} about cells"), &json!({})).unwrap();
        }
        assert_eq!(store.similarity_search("cells", 2).unwrap().len(), 2);
    }

    #[test]
    fn unrelated_query_finds_nothing() {
        let store = InMemoryVectorBackend::new();
        store.add_text("photosynthesis", &json!({})).unwrap();
        assert!(store.similarity_search("volcano", 3).unwrap().is_empty());
    }

    #[test]
    fn keeps_metadata() {
        let store = InMemoryVectorBackend::new();
        store
            .add_text("text", &json!({"filename": "a.pdf"}))
            .unwrap();
        assert_eq!(store.count(), 1);
        assert_eq!(store.metadata()[0].1["filename"], "a.pdf");
    }
}
