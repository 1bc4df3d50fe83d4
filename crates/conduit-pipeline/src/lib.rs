//! The asset graph (§4.5) and the Ingestion Orchestrator (§4.6): the
//! compute layer that sits above extraction, registry, and linking and
//! drives them against real (or collaborator-mocked) stores.

pub mod asset;
pub mod assets;
pub mod error;
pub mod graph;
pub mod orchestrator;

pub use asset::{Asset, AssetKey, SCHEMA_VERSION};
pub use error::{PipelineError, Result};
pub use graph::{AssetGraph, MaterializedGraph};
pub use orchestrator::{IngestionOrchestrator, IngestionStats, SourceFile};
