use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_common::{MissReason, ServiceCall, ServiceRelation};
use conduit_extract::ServiceCallExtractor;
use conduit_link::CallLinker;

use crate::asset::{Asset, AssetKey, SCHEMA_VERSION};
use crate::error::PipelineError;

use super::{RawCodeFilesOutput, RouteRegistryOutput};

#[derive(Debug, Clone, Default)]
pub struct ServiceRelationsOutput {
    pub relations: Vec<ServiceRelation>,
    pub unlinked_calls_with_reasons: HashMap<MissReason, Vec<ServiceCall>>,
    pub linked_count: usize,
    pub unlinked_count: usize,
}

/// Extracts outbound calls from every file and resolves each one against
/// the registry populated by `route_registry`. Cannot run until that
/// asset's reported `schema_version` matches (§4.5's dependency invariant).
pub struct ServiceRelationsAsset {
    extractor: Arc<ServiceCallExtractor>,
    linker: Arc<dyn CallLinker>,
}

impl ServiceRelationsAsset {
    pub fn new(extractor: Arc<ServiceCallExtractor>, linker: Arc<dyn CallLinker>) -> Self {
        ServiceRelationsAsset { extractor, linker }
    }
}

#[async_trait]
impl Asset for ServiceRelationsAsset {
    type Input = (RawCodeFilesOutput, RouteRegistryOutput);
    type Output = ServiceRelationsOutput;

    fn key(&self) -> AssetKey {
        AssetKey::ServiceRelations
    }

    async fn materialize(&self, (files, registry): Self::Input) -> Result<Self::Output, PipelineError> {
        if registry.schema_version != SCHEMA_VERSION {
            return Err(PipelineError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                actual: registry.schema_version,
            });
        }

        let mut output = ServiceRelationsOutput::default();
        for service_files in files.files_by_service.values() {
            for file in service_files {
                let calls = self
                    .extractor
                    .extract(file.content.as_bytes(), &file.path, file.language)
                    .await;
                for call in calls {
                    match self.linker.link(&call).await? {
                        conduit_common::LinkResult::Linked(relation) => {
                            output.linked_count += 1;
                            output.relations.push(relation);
                        }
                        conduit_common::LinkResult::Unlinked { call, reason } => {
                            output.unlinked_count += 1;
                            output.unlinked_calls_with_reasons.entry(reason).or_default().push(call);
                        }
                    }
                }
            }
        }
        Ok(output)
    }
}
