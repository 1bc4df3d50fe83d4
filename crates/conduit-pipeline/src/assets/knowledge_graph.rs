use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_collab::GraphStore;
use conduit_common::confidence;

use crate::asset::{Asset, AssetKey};
use crate::error::PipelineError;

use super::ServiceRelationsOutput;

#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraphOutput {
    pub edges_written: usize,
    pub edges_skipped_low_confidence: usize,
}

/// Writes file-to-file `CALLS` edges for every relation whose confidence
/// clears `MIN_FOR_GRAPH` (§4.5, §8 confidence gating). Entities are
/// upserted before the edge so `add_relationship` never sees a missing
/// endpoint for relations this core produced itself.
pub struct KnowledgeGraphAsset {
    graph: Arc<dyn GraphStore>,
}

impl KnowledgeGraphAsset {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        KnowledgeGraphAsset { graph }
    }
}

#[async_trait]
impl Asset for KnowledgeGraphAsset {
    type Input = ServiceRelationsOutput;
    type Output = KnowledgeGraphOutput;

    fn key(&self) -> AssetKey {
        AssetKey::KnowledgeGraph
    }

    async fn materialize(&self, input: ServiceRelationsOutput) -> Result<Self::Output, PipelineError> {
        let mut output = KnowledgeGraphOutput::default();
        for relation in &input.relations {
            if relation.confidence < confidence::MIN_FOR_GRAPH {
                output.edges_skipped_low_confidence += 1;
                continue;
            }
            self.graph.add_entity(&relation.source_file, &["File".to_string()], HashMap::new()).await?;
            self.graph.add_entity(&relation.target_file, &["File".to_string()], HashMap::new()).await?;

            let mut props = HashMap::new();
            props.insert("call_type".to_string(), relation.relation_type.as_str().to_string());
            props.insert(
                "route_path".to_string(),
                relation.route_path.clone().unwrap_or_default(),
            );
            props.insert("source_line".to_string(), relation.source_line.to_string());
            props.insert("confidence".to_string(), relation.confidence.to_string());

            self.graph
                .add_relationship(&relation.source_file, &relation.target_file, "CALLS", props)
                .await?;
            output.edges_written += 1;
        }
        Ok(output)
    }
}
