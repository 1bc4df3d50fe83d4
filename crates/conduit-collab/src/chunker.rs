use conduit_common::ChunkId;
use conduit_lang::Language;

use crate::traits::{Chunker, RawChunk};

/// Splits content into roughly `limit`-character windows, breaking on line
/// boundaries so chunks stay readable. Not language-aware; used as the
/// fallback when no richer structural chunker is configured.
pub struct FixedWidthChunker {
    limit: usize,
}

impl FixedWidthChunker {
    pub fn new(limit: usize) -> Self {
        FixedWidthChunker { limit }
    }
}

impl Chunker for FixedWidthChunker {
    fn chunk(&self, content: &str, source_uri: &str, _language: Option<Language>) -> Vec<RawChunk> {
        let mut chunks = Vec::new();
        let mut start_byte = 0usize;
        let mut current = String::new();

        for line in content.split_inclusive('\n') {
            if !current.is_empty() && current.len() + line.len() > self.limit {
                let end_byte = start_byte + current.len();
                chunks.push(RawChunk {
                    chunk_id: ChunkId::new(source_uri, start_byte, end_byte),
                    source_uri: source_uri.to_string(),
                    content: std::mem::take(&mut current),
                    start_byte,
                    end_byte,
                });
                start_byte = end_byte;
            }
            current.push_str(line);
        }
        if !current.is_empty() {
            let end_byte = start_byte + current.len();
            chunks.push(RawChunk {
                chunk_id: ChunkId::new(source_uri, start_byte, end_byte),
                source_uri: source_uri.to_string(),
                content: current,
                start_byte,
                end_byte,
            });
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_line_boundaries_near_the_limit() {
        let content = "aaaa\nbbbb\ncccc\ndddd\n";
        let chunker = FixedWidthChunker::new(10);
        let chunks = chunker.chunk(content, "f.py", Some(Language::Python));
        assert!(chunks.len() > 1);
        assert_eq!(chunks.iter().map(|c| c.content.len()).sum::<usize>(), content.len());
    }

    #[test]
    fn single_small_file_yields_one_chunk() {
        let chunker = FixedWidthChunker::new(512);
        let chunks = chunker.chunk("def f():\n    pass\n", "f.py", None);
        assert_eq!(chunks.len(), 1);
    }
}
