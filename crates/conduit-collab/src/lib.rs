//! External-collaborator traits (§6) and their reference implementations.
//! Production adapters for LanceDB and Neo4j are feature-gated so the
//! default build stays free of network/database dependencies.

pub mod chunker;
pub mod crawler;
pub mod embedder;
pub mod graph_store;
pub mod scrubber;
pub mod traits;
pub mod vector_store;

#[cfg(feature = "lancedb-store")]
pub mod lancedb_store;
#[cfg(feature = "neo4j")]
pub mod neo4j;

pub use chunker::FixedWidthChunker;
pub use crawler::FsCrawler;
pub use embedder::HashEmbedder;
pub use graph_store::MockGraphStore;
pub use scrubber::PassthroughScrubber;
pub use traits::{Chunker, CleanChunk, CrawledFile, Crawler, Embedder, GraphStore, RawChunk, ScrubOutcome, Scrubber, VectorStore};
pub use vector_store::InMemoryVectorStore;

#[cfg(feature = "lancedb-store")]
pub use lancedb_store::LanceDbVectorStore;
#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jGraphStore;
