use async_trait::async_trait;
use conduit_common::Result;

use crate::traits::{CleanChunk, RawChunk, Scrubber};

/// Pass-through scrubber: source code chunks carry no PII/PHI by
/// construction, so there is nothing to redact. A production deployment
/// wanting redaction swaps this for a collaborator that inspects content.
pub struct PassthroughScrubber;

#[async_trait]
impl Scrubber for PassthroughScrubber {
    async fn scrub(&self, chunk: &RawChunk) -> Result<CleanChunk> {
        Ok(CleanChunk {
            chunk_id: chunk.chunk_id.clone(),
            content: chunk.content.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_common::ChunkId;

    #[tokio::test]
    async fn scrub_batch_never_fails_on_passthrough() {
        let chunks = vec![RawChunk {
            chunk_id: ChunkId::new("f.py", 0, 3),
            source_uri: "f.py".to_string(),
            content: "abc".to_string(),
            start_byte: 0,
            end_byte: 3,
        }];
        let outcomes = PassthroughScrubber.scrub_batch(&chunks).await;
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], crate::traits::ScrubOutcome::Clean(_)));
    }
}
