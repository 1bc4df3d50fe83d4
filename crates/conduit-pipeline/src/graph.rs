use conduit_common::RepoConfig;

use crate::asset::Asset;
use crate::assets::{
    CodeChunksAsset, CodeChunksOutput, KnowledgeGraphAsset, KnowledgeGraphOutput, RawCodeFilesAsset,
    RawCodeFilesOutput, RouteRegistryAsset, RouteRegistryOutput, ServiceRelationsAsset, ServiceRelationsOutput,
    VectorIndexAsset, VectorIndexOutput,
};
use crate::error::Result;

/// Wires the six named assets per the dependency diagram in §4.5 and runs a
/// topological materialization. `route_registry` and `code_chunks` depend
/// only on `raw_code_files` and run concurrently; `service_relations` waits
/// on both `raw_code_files` and `route_registry`.
pub struct AssetGraph {
    pub raw_code_files: RawCodeFilesAsset,
    pub route_registry: RouteRegistryAsset,
    pub code_chunks: CodeChunksAsset,
    pub service_relations: ServiceRelationsAsset,
    pub vector_index: VectorIndexAsset,
    pub knowledge_graph: KnowledgeGraphAsset,
}

#[derive(Debug, Clone)]
pub struct MaterializedGraph {
    pub raw_code_files: RawCodeFilesOutput,
    pub route_registry: RouteRegistryOutput,
    pub code_chunks: CodeChunksOutput,
    pub service_relations: ServiceRelationsOutput,
    pub vector_index: VectorIndexOutput,
    pub knowledge_graph: KnowledgeGraphOutput,
}

impl AssetGraph {
    /// Materializes the full graph. `route_registry` and `code_chunks` run
    /// concurrently since neither depends on the other (§5: "the pipeline's
    /// asset runtime may run independent assets in parallel").
    pub async fn materialize_all(&self, repos: Vec<RepoConfig>) -> Result<MaterializedGraph> {
        let raw_code_files = self.raw_code_files.materialize(repos).await?;

        let (route_registry, code_chunks) = tokio::try_join!(
            self.route_registry.materialize(raw_code_files.clone()),
            self.code_chunks.materialize(raw_code_files.clone()),
        )?;

        let service_relations = self
            .service_relations
            .materialize((raw_code_files.clone(), route_registry.clone()))
            .await?;

        let (vector_index, knowledge_graph) = tokio::try_join!(
            self.vector_index.materialize(code_chunks.clone()),
            self.knowledge_graph.materialize(service_relations.clone()),
        )?;

        Ok(MaterializedGraph {
            raw_code_files,
            route_registry,
            code_chunks,
            service_relations,
            vector_index,
            knowledge_graph,
        })
    }
}
