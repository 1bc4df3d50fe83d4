use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use conduit_common::{ChunkId, ConduitError, Result};

use crate::traits::VectorStore;

struct Entry {
    vector: Vec<f32>,
    content: String,
}

/// In-process vector store with brute-force cosine search. Adequate for
/// tests and small repositories; not a substitute for an indexed ANN store
/// in production.
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<HashMap<ChunkId, Entry>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn insert(&self, chunk_id: &ChunkId, vector: Vec<f32>, content: String) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        if let Some(existing) = entries.get(chunk_id) {
            if existing.content != content {
                return Err(ConduitError::DuplicateChunkConflict {
                    chunk_id: chunk_id.to_string(),
                });
            }
            return Ok(());
        }
        entries.insert(chunk_id.clone(), Entry { vector, content });
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<(ChunkId, f32)>> {
        let entries = self.entries.read().unwrap();
        let mut scored: Vec<(ChunkId, f32)> = entries
            .iter()
            .map(|(id, e)| (id.clone(), cosine(query_vector, &e.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, chunk_id: &ChunkId) -> Result<()> {
        self.entries.write().unwrap().remove(chunk_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity() {
        let store = InMemoryVectorStore::new();
        let a = ChunkId::new("a", 0, 1);
        let b = ChunkId::new("b", 0, 1);
        store.insert(&a, vec![1.0, 0.0], "a".to_string()).await.unwrap();
        store.insert(&b, vec![0.0, 1.0], "b".to_string()).await.unwrap();

        let results = store.search(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].0, a);
    }

    #[tokio::test]
    async fn reinsert_with_differing_content_conflicts() {
        let store = InMemoryVectorStore::new();
        let id = ChunkId::new("a", 0, 1);
        store.insert(&id, vec![1.0], "first".to_string()).await.unwrap();
        let err = store.insert(&id, vec![1.0], "second".to_string()).await.unwrap_err();
        assert!(matches!(err, ConduitError::DuplicateChunkConflict { .. }));
    }

    #[tokio::test]
    async fn reinsert_with_identical_content_is_a_no_op() {
        let store = InMemoryVectorStore::new();
        let id = ChunkId::new("a", 0, 1);
        store.insert(&id, vec![1.0], "same".to_string()).await.unwrap();
        store.insert(&id, vec![1.0], "same".to_string()).await.unwrap();
    }
}
