use conduit_common::ConduitError;
use thiserror::Error;

/// Failure domain for the asset graph and orchestrator. Wraps the core
/// taxonomy with the pipeline-specific failures named in §7: a schema
/// mismatch between `route_registry` and the linker, or an asset invoked
/// before its declared dependency materialized.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] ConduitError),

    #[error("asset {key} depends on {dependency}, which has not been materialized")]
    DependencyNotMaterialized { key: String, dependency: String },

    #[error("route registry schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },

    #[error("asset {key} failed: {source}")]
    AssetFailed {
        key: String,
        #[source]
        source: Box<PipelineError>,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
