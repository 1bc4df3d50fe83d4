use std::sync::Arc;

use conduit_collab::{FixedWidthChunker, FsCrawler, HashEmbedder, InMemoryVectorStore, MockGraphStore, PassthroughScrubber};
use conduit_common::RepoConfig;
use conduit_extract::{RouteExtractor, ServiceCallExtractor};
use conduit_lang::ParserPool;
use conduit_link::RegistryCallLinker;
use conduit_pipeline::assets::{CodeChunksAsset, KnowledgeGraphAsset, RawCodeFilesAsset, RouteRegistryAsset, ServiceRelationsAsset, VectorIndexAsset};
use conduit_pipeline::AssetGraph;
use conduit_registry::InMemoryRouteRegistry;

fn write_repo(dir: &std::path::Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}

#[tokio::test]
async fn cross_service_call_resolves_end_to_end() {
    let user_service_dir = tempfile::tempdir().unwrap();
    write_repo(
        user_service_dir.path(),
        &[(
            "routes.py",
            "@router.get(\"/api/users/{user_id}\")\nasync def get_user(user_id):\n    pass\n",
        )],
    );

    let auth_dir = tempfile::tempdir().unwrap();
    write_repo(
        auth_dir.path(),
        &[(
            "login.py",
            "httpx.get(f\"http://user-service/api/users/{user_id}\")\n",
        )],
    );

    let pool = Arc::new(ParserPool::new(2));
    let call_extractor = Arc::new(ServiceCallExtractor::new(pool.clone()));
    let route_extractor = Arc::new(RouteExtractor::new(pool));
    let registry: Arc<dyn conduit_registry::RouteRegistry> = Arc::new(InMemoryRouteRegistry::new());
    let linker: Arc<dyn conduit_link::CallLinker> = Arc::new(RegistryCallLinker::new(registry.clone()));

    let crawler: Arc<dyn conduit_collab::Crawler> = Arc::new(FsCrawler::new());
    let chunker: Arc<dyn conduit_collab::Chunker> = Arc::new(FixedWidthChunker::new(512));
    let scrubber: Arc<dyn conduit_collab::Scrubber> = Arc::new(PassthroughScrubber);
    let embedder: Arc<dyn conduit_collab::Embedder> = Arc::new(HashEmbedder::new(16));
    let vector_store: Arc<dyn conduit_collab::VectorStore> = Arc::new(InMemoryVectorStore::new());
    let graph_store: Arc<dyn conduit_collab::GraphStore> = Arc::new(MockGraphStore::new());

    let asset_graph = AssetGraph {
        raw_code_files: RawCodeFilesAsset::new(crawler),
        route_registry: RouteRegistryAsset::new(route_extractor, registry, "test.db"),
        code_chunks: CodeChunksAsset::new(chunker),
        service_relations: ServiceRelationsAsset::new(call_extractor, linker),
        vector_index: VectorIndexAsset::new(scrubber, embedder, vector_store),
        knowledge_graph: KnowledgeGraphAsset::new(graph_store),
    };

    let repos = vec![
        RepoConfig {
            name: "user-service".to_string(),
            path: user_service_dir.path().to_path_buf(),
        },
        RepoConfig {
            name: "auth".to_string(),
            path: auth_dir.path().to_path_buf(),
        },
    ];

    let result = asset_graph.materialize_all(repos).await.unwrap();

    assert_eq!(result.route_registry.route_count, 1);
    assert_eq!(result.service_relations.linked_count, 1);
    assert_eq!(result.service_relations.relations[0].target_function, "get_user");
    assert_eq!(result.knowledge_graph.edges_written, 1);
    assert!(result.vector_index.chunks_embedded >= 1);
}

#[tokio::test]
async fn call_to_unregistered_service_is_reported_unlinked() {
    let auth_dir = tempfile::tempdir().unwrap();
    write_repo(
        auth_dir.path(),
        &[("login.py", "httpx.get(f\"http://ghost-service/api/x\")\n")],
    );

    let pool = Arc::new(ParserPool::new(2));
    let call_extractor = Arc::new(ServiceCallExtractor::new(pool.clone()));
    let route_extractor = Arc::new(RouteExtractor::new(pool));
    let registry: Arc<dyn conduit_registry::RouteRegistry> = Arc::new(InMemoryRouteRegistry::new());
    let linker: Arc<dyn conduit_link::CallLinker> = Arc::new(RegistryCallLinker::new(registry.clone()));

    let crawler: Arc<dyn conduit_collab::Crawler> = Arc::new(FsCrawler::new());
    let chunker: Arc<dyn conduit_collab::Chunker> = Arc::new(FixedWidthChunker::new(512));
    let scrubber: Arc<dyn conduit_collab::Scrubber> = Arc::new(PassthroughScrubber);
    let embedder: Arc<dyn conduit_collab::Embedder> = Arc::new(HashEmbedder::new(16));
    let vector_store: Arc<dyn conduit_collab::VectorStore> = Arc::new(InMemoryVectorStore::new());
    let graph_store: Arc<dyn conduit_collab::GraphStore> = Arc::new(MockGraphStore::new());

    let asset_graph = AssetGraph {
        raw_code_files: RawCodeFilesAsset::new(crawler),
        route_registry: RouteRegistryAsset::new(route_extractor, registry, "test.db"),
        code_chunks: CodeChunksAsset::new(chunker),
        service_relations: ServiceRelationsAsset::new(call_extractor, linker),
        vector_index: VectorIndexAsset::new(scrubber, embedder, vector_store),
        knowledge_graph: KnowledgeGraphAsset::new(graph_store),
    };

    let repos = vec![RepoConfig {
        name: "auth".to_string(),
        path: auth_dir.path().to_path_buf(),
    }];

    let result = asset_graph.materialize_all(repos).await.unwrap();
    assert_eq!(result.service_relations.linked_count, 0);
    assert_eq!(result.service_relations.unlinked_count, 1);
    assert!(result
        .service_relations
        .unlinked_calls_with_reasons
        .contains_key(&conduit_common::MissReason::NoRoutes));
}
