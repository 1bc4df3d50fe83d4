use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_collab::{Chunker, RawChunk};

use crate::asset::{Asset, AssetKey};
use crate::error::PipelineError;

use super::RawCodeFilesOutput;

#[derive(Debug, Clone, Default)]
pub struct CodeChunksOutput {
    pub chunks_by_service: HashMap<String, Vec<RawChunk>>,
}

/// Runs the configured chunker over every crawled file, independent of the
/// route registry (§4.5: `raw_code_files` feeds both in parallel).
pub struct CodeChunksAsset {
    chunker: Arc<dyn Chunker>,
}

impl CodeChunksAsset {
    pub fn new(chunker: Arc<dyn Chunker>) -> Self {
        CodeChunksAsset { chunker }
    }
}

#[async_trait]
impl Asset for CodeChunksAsset {
    type Input = RawCodeFilesOutput;
    type Output = CodeChunksOutput;

    fn key(&self) -> AssetKey {
        AssetKey::CodeChunks
    }

    async fn materialize(&self, input: RawCodeFilesOutput) -> Result<Self::Output, PipelineError> {
        let mut output = CodeChunksOutput::default();
        for (service, files) in input.files_by_service {
            let mut chunks = Vec::new();
            for file in files {
                chunks.extend(self.chunker.chunk(&file.content, &file.path, Some(file.language)));
            }
            output.chunks_by_service.insert(service, chunks);
        }
        Ok(output)
    }
}
