use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ConduitError, Result};

/// Content-addressed identifier derived from `(source_uri, start_byte, end_byte)`.
/// Opaque outside the collaborators that key chunks by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn new(source_uri: &str, start_byte: usize, end_byte: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source_uri.as_bytes());
        hasher.update(start_byte.to_le_bytes());
        hasher.update(end_byte.to_le_bytes());
        ChunkId(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reconstructs an id from its stored hex representation, e.g. when
    /// round-tripping through a vector store's primary key column.
    pub fn from_raw(hex: String) -> Self {
        ChunkId(hex)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Unknown,
}

impl HttpMethod {
    pub fn parse(s: &str) -> HttpMethod {
        match s.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            _ => HttpMethod::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Unknown => "unknown",
        }
    }

    /// Case-insensitive equality per the registry's matching rules (§4.3.4).
    pub fn matches(&self, other: &HttpMethod) -> bool {
        self.as_str().eq_ignore_ascii_case(other.as_str())
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallType {
    Http,
    Grpc,
    QueuePublish,
    QueueSubscribe,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Http => "http",
            CallType::Grpc => "grpc",
            CallType::QueuePublish => "queue_publish",
            CallType::QueueSubscribe => "queue_subscribe",
        }
    }
}

/// A detected outbound communication (client-side).
///
/// Invariant: `confidence > 0`. If `call_type == Http` and a literal URL was
/// parsed, `method` must be set (may still be `HttpMethod::Unknown`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub source_file: String,
    pub line_number: u32,
    pub target_service: String,
    pub call_type: CallType,
    pub confidence: f64,
    pub method: Option<HttpMethod>,
    pub url_path: Option<String>,
}

impl ServiceCall {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_file: impl Into<String>,
        line_number: u32,
        target_service: impl Into<String>,
        call_type: CallType,
        confidence: f64,
        method: Option<HttpMethod>,
        url_path: Option<String>,
    ) -> Result<Self> {
        if !(confidence > 0.0) {
            return Err(ConduitError::InvalidConfidence(confidence));
        }
        let method = if call_type == CallType::Http && url_path.is_some() {
            Some(method.unwrap_or(HttpMethod::Unknown))
        } else {
            method
        };
        Ok(ServiceCall {
            source_file: source_file.into(),
            line_number,
            target_service: target_service.into(),
            call_type,
            confidence,
            method,
            url_path,
        })
    }

    /// Deduplication key per §4.2: duplicates keep the highest confidence.
    pub fn dedup_key(&self) -> (String, u32, &'static str, String, Option<String>) {
        (
            self.source_file.clone(),
            self.line_number,
            self.call_type.as_str(),
            self.target_service.clone(),
            self.url_path.clone(),
        )
    }
}

/// A handler exposed by a service (server-side).
///
/// Invariant: `(service, method, path)` is unique within the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub service: String,
    pub method: HttpMethod,
    pub path: String,
    pub handler_file: String,
    pub handler_function: String,
    pub line_number: u32,
}

impl RouteDefinition {
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() || !self.path.starts_with('/') {
            return Err(ConduitError::RegistryValidation {
                service: self.service.clone(),
                method: self.method.as_str().to_string(),
                path: self.path.clone(),
                message: "path must be non-empty and start with '/'".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationType {
    HttpCall,
    GrpcCall,
    QueuePublish,
    QueueSubscribe,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::HttpCall => "HTTP_CALL",
            RelationType::GrpcCall => "GRPC_CALL",
            RelationType::QueuePublish => "QUEUE_PUBLISH",
            RelationType::QueueSubscribe => "QUEUE_SUBSCRIBE",
        }
    }
}

impl From<CallType> for RelationType {
    fn from(call_type: CallType) -> Self {
        match call_type {
            CallType::Http => RelationType::HttpCall,
            CallType::Grpc => RelationType::GrpcCall,
            CallType::QueuePublish => RelationType::QueuePublish,
            CallType::QueueSubscribe => RelationType::QueueSubscribe,
        }
    }
}

/// A resolved service call: a directed edge from the calling file to the
/// handler file. Every field is concrete; relations are only produced when
/// linking succeeds (no sentinel values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRelation {
    pub source_file: String,
    pub source_line: u32,
    pub target_file: String,
    pub target_function: String,
    pub target_line: u32,
    pub relation_type: RelationType,
    pub route_path: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissReason {
    NoRoutes,
    MethodMismatch,
    PathMismatch,
}

impl MissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissReason::NoRoutes => "no_routes",
            MissReason::MethodMismatch => "method_mismatch",
            MissReason::PathMismatch => "path_mismatch",
        }
    }
}

/// Tagged union: exactly one arm is populated. Neither arm is a fallback
/// value for the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkResult {
    Linked(ServiceRelation),
    Unlinked {
        call: ServiceCall,
        reason: MissReason,
    },
}

impl LinkResult {
    pub fn is_linked(&self) -> bool {
        matches!(self, LinkResult::Linked(_))
    }
}
