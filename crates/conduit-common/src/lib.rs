pub mod confidence;
pub mod config;
pub mod error;
pub mod model;

pub use config::{Config, GraphCredentials, RepoConfig};
pub use error::{ConduitError, Result};
pub use model::{
    CallType, ChunkId, HttpMethod, LinkResult, MissReason, RelationType, RouteDefinition,
    ServiceCall, ServiceRelation,
};
