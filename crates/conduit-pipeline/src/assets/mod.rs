mod code_chunks;
mod knowledge_graph;
mod raw_code_files;
mod route_registry;
mod service_relations;
mod vector_index;

pub use code_chunks::{CodeChunksAsset, CodeChunksOutput};
pub use knowledge_graph::{KnowledgeGraphAsset, KnowledgeGraphOutput};
pub use raw_code_files::{RawCodeFilesAsset, RawCodeFilesOutput, ServiceFile};
pub use route_registry::{RouteRegistryAsset, RouteRegistryOutput};
pub use service_relations::{ServiceRelationsAsset, ServiceRelationsOutput};
pub use vector_index::{VectorIndexAsset, VectorIndexOutput};
