//! The pattern matcher library: one recognizer per idiom family, applied by
//! the extractor to a single tree-sitter node (§4.1). Matchers never
//! traverse children and never raise; a matcher that cannot make sense of a
//! node simply returns an empty vec.

mod util;

pub mod csharp;
pub mod go;
pub mod python;
pub mod typescript;

use conduit_common::{RouteDefinition, ServiceCall};
use tree_sitter::Node;

/// Recognizes one client-side idiom family (HTTP, gRPC, queue publish,
/// queue subscribe) over a call-expression node.
pub trait ClientMatcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall>;
}

/// Recognizes one server-side route-registration idiom over a decorator,
/// attribute, or call-expression node.
pub trait ServerMatcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn match_node(
        &self,
        node: Node,
        source: &[u8],
        service: &str,
        handler_file: &str,
    ) -> Vec<RouteDefinition>;
}

use conduit_lang::Language;

/// Client-side matchers registered for a language, in stable, deterministic
/// order.
pub fn client_matchers(language: Language) -> Vec<Box<dyn ClientMatcher>> {
    match language {
        Language::Python => python::client_matchers(),
        Language::Go => go::client_matchers(),
        Language::TypeScript => typescript::client_matchers(),
        Language::CSharp => csharp::client_matchers(),
    }
}

/// Server-side matchers registered for a language, in stable, deterministic
/// order.
pub fn server_matchers(language: Language) -> Vec<Box<dyn ServerMatcher>> {
    match language {
        Language::Python => python::server_matchers(),
        Language::Go => go::server_matchers(),
        Language::TypeScript => typescript::server_matchers(),
        Language::CSharp => csharp::server_matchers(),
    }
}
