//! External-collaborator interfaces consumed by the core (§6). These are
//! out of scope for the core's correctness guarantees; only the interfaces
//! are specified here, with mockable/offline reference implementations
//! colocated for deterministic testing (grounded in the same rationale the
//! teacher states for its own fetcher/reader traits: no network, no
//! database, `cargo test` in seconds).

use std::collections::HashMap;

use async_trait::async_trait;
use conduit_common::{ChunkId, ConduitError, Result};
use conduit_lang::Language;

#[derive(Debug, Clone)]
pub struct CrawledFile {
    pub content: Vec<u8>,
    pub source_uri: String,
    pub language: Option<Language>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RawChunk {
    pub chunk_id: ChunkId,
    pub source_uri: String,
    pub content: String,
    pub start_byte: usize,
    pub end_byte: usize,
}

#[derive(Debug, Clone)]
pub struct CleanChunk {
    pub chunk_id: ChunkId,
    pub content: String,
}

#[derive(Debug, Clone)]
pub enum ScrubOutcome {
    Clean(CleanChunk),
    Failed { chunk_id: ChunkId, reason: String },
}

#[async_trait]
pub trait Crawler: Send + Sync {
    /// Crawls `root`, respecting ignore rules (typical build/cache
    /// directories and repository ignore files).
    async fn crawl(&self, root: &std::path::Path) -> Result<Vec<CrawledFile>>;
}

pub trait Chunker: Send + Sync {
    fn chunk(&self, content: &str, source_uri: &str, language: Option<Language>) -> Vec<RawChunk>;
}

#[async_trait]
pub trait Scrubber: Send + Sync {
    /// Raises on a per-chunk failure.
    async fn scrub(&self, chunk: &RawChunk) -> Result<CleanChunk>;

    /// Never raises; reports a per-item status instead.
    async fn scrub_batch(&self, chunks: &[RawChunk]) -> Vec<ScrubOutcome> {
        let mut out = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            out.push(match self.scrub(chunk).await {
                Ok(clean) => ScrubOutcome::Clean(clean),
                Err(e) => ScrubOutcome::Failed {
                    chunk_id: chunk.chunk_id.clone(),
                    reason: e.to_string(),
                },
            });
        }
        out
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Must match the configured `embedding_dimension` constant.
    fn dimension(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Re-insert with the same id and identical content is a no-op;
    /// differing content is a `DuplicateChunkConflict` (§7).
    async fn insert(&self, chunk_id: &ChunkId, vector: Vec<f32>, content: String) -> Result<()>;
    async fn insert_batch(&self, items: Vec<(ChunkId, Vec<f32>, String)>) -> Result<()> {
        for (id, vector, content) in items {
            self.insert(&id, vector, content).await?;
        }
        Ok(())
    }
    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<(ChunkId, f32)>>;
    async fn delete(&self, chunk_id: &ChunkId) -> Result<()>;
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn add_entity(&self, id: &str, labels: &[String], properties: HashMap<String, String>) -> Result<()>;

    /// Raised when an endpoint is missing; the core must ensure both
    /// endpoints exist before calling this (`EntityNotFound`, §7).
    async fn add_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: &str,
        properties: HashMap<String, String>,
    ) -> Result<()>;
    async fn search_entities(&self, query: &str) -> Result<Vec<String>>;
    async fn get_neighbors(&self, id: &str) -> Result<Vec<String>>;
    async fn add_episode(&self, text: &str) -> Result<()>;
}

pub(crate) fn entity_not_found(id: &str) -> ConduitError {
    ConduitError::EntityNotFound { id: id.to_string() }
}
