use std::collections::HashMap;
use std::sync::Arc;

use conduit_collab::{Chunker, Embedder, ScrubOutcome, Scrubber, VectorStore};
use conduit_common::{MissReason, RepoConfig};
use conduit_extract::{RouteExtractor, ServiceCallExtractor};
use conduit_lang::Language;
use conduit_link::CallLinker;
use conduit_registry::RouteRegistry;
use tokio::sync::watch;

use crate::error::Result;

/// Per-run statistics for a single source, aggregated across every file
/// (§4.6). Never fails the caller on a per-file error; errors are captured
/// in `errors` instead.
#[derive(Debug, Clone, Default)]
pub struct IngestionStats {
    pub chunks_created: usize,
    pub chunks_scrubbed: usize,
    pub chunks_stored: usize,
    pub relations_linked: usize,
    pub relations_unlinked_by_reason: HashMap<MissReason, usize>,
    pub errors: Vec<(String, String)>,
    pub partial: bool,
}

/// A single source file discovered for a service, ready for per-file
/// extraction.
pub struct SourceFile {
    pub path: String,
    pub content: Vec<u8>,
    pub language: Language,
}

/// Drives per-file processing end-to-end for one source: repopulates the
/// service's routes, extracts and links its outbound calls, and chunks,
/// scrubs, and stores its content for retrieval. Observes a cancellation
/// signal at each suspension point (§5, §4.6).
pub struct IngestionOrchestrator {
    call_extractor: Arc<ServiceCallExtractor>,
    route_extractor: Arc<RouteExtractor>,
    linker: Arc<dyn CallLinker>,
    registry: Arc<dyn RouteRegistry>,
    chunker: Arc<dyn Chunker>,
    scrubber: Arc<dyn Scrubber>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl IngestionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        call_extractor: Arc<ServiceCallExtractor>,
        route_extractor: Arc<RouteExtractor>,
        linker: Arc<dyn CallLinker>,
        registry: Arc<dyn RouteRegistry>,
        chunker: Arc<dyn Chunker>,
        scrubber: Arc<dyn Scrubber>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        IngestionOrchestrator {
            call_extractor,
            route_extractor,
            linker,
            registry,
            chunker,
            scrubber,
            embedder,
            vector_store,
        }
    }

    /// Ingests `files` belonging to `service`. `cancel` is polled between
    /// files; when it reads `true`, processing stops and `stats.partial` is
    /// set, returning whatever was aggregated so far.
    pub async fn ingest(
        &self,
        service: &RepoConfig,
        files: Vec<SourceFile>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<IngestionStats> {
        let mut stats = IngestionStats::default();

        let mut routes = Vec::new();
        for file in &files {
            if *cancel.borrow() {
                stats.partial = true;
                return Ok(stats);
            }
            routes.extend(
                self.route_extractor
                    .extract(&file.content, &file.path, &service.name, file.language)
                    .await,
            );
        }
        if let Err(e) = self.registry.add_routes(&service.name, routes).await {
            stats.errors.push((service.name.clone(), e.to_string()));
        }

        for file in &files {
            if *cancel.borrow() {
                stats.partial = true;
                return Ok(stats);
            }

            let content = match std::str::from_utf8(&file.content) {
                Ok(c) => c,
                Err(e) => {
                    stats.errors.push((file.path.clone(), e.to_string()));
                    continue;
                }
            };

            let calls = self
                .call_extractor
                .extract(&file.content, &file.path, file.language)
                .await;

            for call in calls {
                match self.linker.link(&call).await {
                    Ok(conduit_common::LinkResult::Linked(_)) => {
                        stats.relations_linked += 1;
                    }
                    Ok(conduit_common::LinkResult::Unlinked { reason, .. }) => {
                        *stats.relations_unlinked_by_reason.entry(reason).or_insert(0) += 1;
                    }
                    Err(e) => {
                        stats.errors.push((file.path.clone(), e.to_string()));
                    }
                }
            }

            if *cancel.borrow() {
                stats.partial = true;
                return Ok(stats);
            }

            let raw_chunks = self.chunker.chunk(content, &file.path, Some(file.language));
            stats.chunks_created += raw_chunks.len();

            let outcomes = self.scrubber.scrub_batch(&raw_chunks).await;
            for outcome in outcomes {
                let clean = match outcome {
                    ScrubOutcome::Clean(c) => c,
                    ScrubOutcome::Failed { reason, .. } => {
                        stats.errors.push((file.path.clone(), reason));
                        continue;
                    }
                };
                stats.chunks_scrubbed += 1;

                let vector = match self.embedder.embed(&clean.content).await {
                    Ok(v) => v,
                    Err(e) => {
                        stats.errors.push((file.path.clone(), e.to_string()));
                        continue;
                    }
                };
                match self.vector_store.insert(&clean.chunk_id, vector, clean.content).await {
                    Ok(()) => stats.chunks_stored += 1,
                    Err(e) => stats.errors.push((file.path.clone(), e.to_string())),
                }
            }
        }

        Ok(stats)
    }
}
