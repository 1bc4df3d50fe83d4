use std::fmt;

use async_trait::async_trait;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKey {
    RawCodeFiles,
    RouteRegistry,
    CodeChunks,
    ServiceRelations,
    VectorIndex,
    KnowledgeGraph,
}

impl AssetKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKey::RawCodeFiles => "raw_code_files",
            AssetKey::RouteRegistry => "route_registry",
            AssetKey::CodeChunks => "code_chunks",
            AssetKey::ServiceRelations => "service_relations",
            AssetKey::VectorIndex => "vector_index",
            AssetKey::KnowledgeGraph => "knowledge_graph",
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, rerunnable compute node in the pipeline's DAG (§4.5). Each asset
/// declares its own input/output types; the `AssetGraph` is responsible for
/// ensuring an asset's declared dependencies are materialized first.
#[async_trait]
pub trait Asset: Send + Sync {
    type Input;
    type Output: Clone + Send + Sync;

    fn key(&self) -> AssetKey;
    async fn materialize(&self, input: Self::Input) -> Result<Self::Output, PipelineError>;
}

/// The fixed schema version the `route_registry` asset reports and the
/// `service_relations` asset requires (§4.5's dependency invariant).
pub const SCHEMA_VERSION: u32 = 1;
