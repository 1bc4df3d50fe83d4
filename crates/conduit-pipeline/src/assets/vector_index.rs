use std::sync::Arc;

use async_trait::async_trait;
use conduit_collab::{Embedder, ScrubOutcome, Scrubber, VectorStore};

use crate::asset::{Asset, AssetKey};
use crate::error::PipelineError;

use super::CodeChunksOutput;

#[derive(Debug, Clone, Default)]
pub struct VectorIndexOutput {
    pub chunks_embedded: usize,
    pub chunks_skipped: usize,
}

/// Scrubs, embeds, and stores every chunk produced by `code_chunks`.
/// Per-chunk scrub failures are skipped rather than failing the asset
/// (§6: `scrub_batch` never raises).
pub struct VectorIndexAsset {
    scrubber: Arc<dyn Scrubber>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl VectorIndexAsset {
    pub fn new(scrubber: Arc<dyn Scrubber>, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        VectorIndexAsset {
            scrubber,
            embedder,
            store,
        }
    }
}

#[async_trait]
impl Asset for VectorIndexAsset {
    type Input = CodeChunksOutput;
    type Output = VectorIndexOutput;

    fn key(&self) -> AssetKey {
        AssetKey::VectorIndex
    }

    async fn materialize(&self, input: CodeChunksOutput) -> Result<Self::Output, PipelineError> {
        let mut output = VectorIndexOutput::default();
        for chunks in input.chunks_by_service.into_values() {
            let outcomes = self.scrubber.scrub_batch(&chunks).await;
            for outcome in outcomes {
                let clean = match outcome {
                    ScrubOutcome::Clean(c) => c,
                    ScrubOutcome::Failed { reason, .. } => {
                        tracing::warn!(reason, "skipping chunk that failed scrubbing");
                        output.chunks_skipped += 1;
                        continue;
                    }
                };
                let vector = self.embedder.embed(&clean.content).await?;
                self.store.insert(&clean.chunk_id, vector, clean.content).await?;
                output.chunks_embedded += 1;
            }
        }
        Ok(output)
    }
}
