//! Walks a parsed file once per extraction kind, presenting each candidate
//! node to every applicable pattern matcher (§4.2).

mod walk;

use std::collections::HashMap;
use std::sync::Arc;

use conduit_common::{ConduitError, RouteDefinition, ServiceCall};
use conduit_lang::{Language, ParserPool};
use conduit_patterns::{client_matchers, server_matchers};

use walk::collect_nodes;

/// Parses a file and runs every client-side matcher for the language over
/// every call-expression node, returning deduplicated, source-ordered
/// `ServiceCall` records. Never raises: parse failures and matcher panics
/// (there are none here, matchers are pure functions) yield an empty list
/// plus a side-channel log line.
pub struct ServiceCallExtractor {
    pool: Arc<ParserPool>,
}

impl ServiceCallExtractor {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        ServiceCallExtractor { pool }
    }

    pub async fn extract(
        &self,
        source: &[u8],
        source_file: &str,
        language: Language,
    ) -> Vec<ServiceCall> {
        let mut guard = self.pool.checkout(language).await;
        let tree = match guard.parser_mut().parse(source, None) {
            Some(tree) => tree,
            None => {
                tracing::warn!(
                    file = source_file,
                    "{}",
                    ConduitError::Parse {
                        file: source_file.to_string(),
                        message: "tree-sitter failed to produce a tree".to_string(),
                    }
                );
                return Vec::new();
            }
        };

        let matchers = client_matchers(language);
        let kind = language.call_expression_kind();
        let extra_kinds: &[&str] = match language {
            Language::TypeScript => &["new_expression"],
            Language::CSharp => &["object_creation_expression"],
            _ => &[],
        };
        let mut kinds = vec![kind];
        kinds.extend_from_slice(extra_kinds);

        let nodes = collect_nodes(tree.root_node(), &kinds);
        let mut calls = Vec::new();
        for node in nodes {
            for matcher in &matchers {
                for call in matcher.match_node(node, source, source_file) {
                    calls.push(call);
                }
            }
        }

        dedup_calls(calls)
    }
}

/// Parses a file and runs every server-side matcher for the language over
/// every decorator/annotation/route-call node, returning deduplicated,
/// source-ordered `RouteDefinition` records.
pub struct RouteExtractor {
    pool: Arc<ParserPool>,
}

impl RouteExtractor {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        RouteExtractor { pool }
    }

    pub async fn extract(
        &self,
        source: &[u8],
        handler_file: &str,
        service_name: &str,
        language: Language,
    ) -> Vec<RouteDefinition> {
        let mut guard = self.pool.checkout(language).await;
        let tree = match guard.parser_mut().parse(source, None) {
            Some(tree) => tree,
            None => {
                tracing::warn!(
                    file = handler_file,
                    "{}",
                    ConduitError::Parse {
                        file: handler_file.to_string(),
                        message: "tree-sitter failed to produce a tree".to_string(),
                    }
                );
                return Vec::new();
            }
        };

        let matchers = server_matchers(language);
        let mut kinds: Vec<&str> = language.route_registration_kinds().to_vec();
        // Go and TypeScript register routes as ordinary call expressions
        // (`router.GET(...)`, `app.get(...)`), so route calls are found
        // alongside client calls in the same walk.
        kinds.push(language.call_expression_kind());

        let nodes = collect_nodes(tree.root_node(), &kinds);
        let mut routes = Vec::new();
        for node in nodes {
            for matcher in &matchers {
                for route in matcher.match_node(node, source, service_name, handler_file) {
                    routes.push(route);
                }
            }
        }

        dedup_routes(routes)
    }
}

fn dedup_calls(calls: Vec<ServiceCall>) -> Vec<ServiceCall> {
    let mut best: HashMap<_, ServiceCall> = HashMap::new();
    let mut order = Vec::new();
    for call in calls {
        let key = call.dedup_key();
        match best.get(&key) {
            Some(existing) if existing.confidence >= call.confidence => {}
            Some(_) => {
                best.insert(key.clone(), call);
            }
            None => {
                order.push(key.clone());
                best.insert(key, call);
            }
        }
    }
    let mut result: Vec<ServiceCall> = order.into_iter().filter_map(|k| best.remove(&k)).collect();
    result.sort_by_key(|c| c.line_number);
    result
}

fn dedup_routes(routes: Vec<RouteDefinition>) -> Vec<RouteDefinition> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for route in routes {
        let key = (
            route.service.clone(),
            route.method.as_str().to_string(),
            route.path.clone(),
        );
        if seen.insert(key) {
            result.push(route);
        }
    }
    result.sort_by_key(|r| r.line_number);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn docstring_url_yields_zero_calls() {
        let pool = Arc::new(ParserPool::new(1));
        let extractor = ServiceCallExtractor::new(pool);
        let src = b"\"\"\"Example: http://user-service/api\"\"\"\n";
        let calls = extractor.extract(src, "x.py", Language::Python).await;
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn fastapi_route_extracted_with_line_number() {
        let pool = Arc::new(ParserPool::new(1));
        let extractor = RouteExtractor::new(pool);
        let src = b"@router.get(\"/api/users/{user_id}\")\nasync def get_user(user_id):\n    pass\n";
        let routes = extractor
            .extract(src, "user-service/routes.py", "user-service", Language::Python)
            .await;
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].line_number, 2);
    }

    #[tokio::test]
    async fn httpx_call_extracted_in_source_order() {
        let pool = Arc::new(ParserPool::new(1));
        let extractor = ServiceCallExtractor::new(pool);
        let src = b"httpx.get(f\"http://user-service/api/users/{user_id}\")\n";
        let calls = extractor.extract(src, "auth/login.py", Language::Python).await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_service, "user-service");
    }
}
