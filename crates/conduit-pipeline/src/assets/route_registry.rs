use std::sync::Arc;

use async_trait::async_trait;
use conduit_extract::RouteExtractor;
use conduit_registry::RouteRegistry;

use crate::asset::{Asset, AssetKey, SCHEMA_VERSION};
use crate::error::PipelineError;

use super::RawCodeFilesOutput;

#[derive(Debug, Clone)]
pub struct RouteRegistryOutput {
    pub db_path: String,
    pub service_count: usize,
    pub route_count: usize,
    pub schema_version: u32,
}

/// Runs the route extractor on every crawled file, then atomically replaces
/// each service's entry in the persistent registry (§4.5).
pub struct RouteRegistryAsset {
    extractor: Arc<RouteExtractor>,
    registry: Arc<dyn RouteRegistry>,
    db_path: String,
}

impl RouteRegistryAsset {
    pub fn new(extractor: Arc<RouteExtractor>, registry: Arc<dyn RouteRegistry>, db_path: impl Into<String>) -> Self {
        RouteRegistryAsset {
            extractor,
            registry,
            db_path: db_path.into(),
        }
    }
}

#[async_trait]
impl Asset for RouteRegistryAsset {
    type Input = RawCodeFilesOutput;
    type Output = RouteRegistryOutput;

    fn key(&self) -> AssetKey {
        AssetKey::RouteRegistry
    }

    async fn materialize(&self, input: RawCodeFilesOutput) -> Result<Self::Output, PipelineError> {
        let mut route_count = 0;
        let service_count = input.files_by_service.len();

        for (service, files) in &input.files_by_service {
            let mut routes = Vec::new();
            for file in files {
                let found = self
                    .extractor
                    .extract(file.content.as_bytes(), &file.path, service, file.language)
                    .await;
                routes.extend(found);
            }
            let report = self.registry.add_routes(service, routes).await?;
            route_count += report.accepted;
        }

        Ok(RouteRegistryOutput {
            db_path: self.db_path.clone(),
            service_count,
            route_count,
            schema_version: SCHEMA_VERSION,
        })
    }
}
