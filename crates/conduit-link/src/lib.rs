//! Resolves a single `ServiceCall` against the Route Registry to either a
//! concrete `ServiceRelation` or a classified miss (§4.4).

use std::sync::Arc;

use async_trait::async_trait;
use conduit_common::{
    confidence, HttpMethod, LinkResult, MissReason, Result, RouteDefinition, ServiceCall,
    ServiceRelation,
};
use conduit_registry::{best_path_match, RouteRegistry};

#[async_trait]
pub trait CallLinker: Send + Sync {
    /// Deterministic; pure with respect to the registry snapshot visible at
    /// the time of the call.
    async fn link(&self, call: &ServiceCall) -> Result<LinkResult>;
}

pub struct RegistryCallLinker {
    registry: Arc<dyn RouteRegistry>,
}

impl RegistryCallLinker {
    pub fn new(registry: Arc<dyn RouteRegistry>) -> Self {
        RegistryCallLinker { registry }
    }
}

/// An `unknown` call method matches any route method; a known method must
/// match the route's method case-insensitively (§4.4.3).
fn method_compatible(call_method: Option<HttpMethod>, route_method: HttpMethod) -> bool {
    match call_method {
        None | Some(HttpMethod::Unknown) => true,
        Some(m) => route_method.matches(&m),
    }
}

#[async_trait]
impl CallLinker for RegistryCallLinker {
    async fn link(&self, call: &ServiceCall) -> Result<LinkResult> {
        // Step 1: low-confidence calls never produce relations. If the
        // registry also has no routes for the target, the miss is
        // attributed to `no_routes`; otherwise `path_mismatch`, since a
        // route-bearing registry means the call simply isn't trusted enough
        // to admit, not that nothing was found.
        if call.confidence < confidence::MIN_FOR_LINKING {
            let routes = self.registry.get_routes(&call.target_service).await?;
            let reason = if routes.is_empty() {
                MissReason::NoRoutes
            } else {
                MissReason::PathMismatch
            };
            return Ok(LinkResult::Unlinked {
                call: call.clone(),
                reason,
            });
        }

        let routes = self.registry.get_routes(&call.target_service).await?;
        if routes.is_empty() {
            return Ok(LinkResult::Unlinked {
                call: call.clone(),
                reason: MissReason::NoRoutes,
            });
        }

        let method_matched: Vec<&RouteDefinition> = routes
            .iter()
            .filter(|r| method_compatible(call.method, r.method))
            .collect();

        if method_matched.is_empty() {
            return Ok(LinkResult::Unlinked {
                call: call.clone(),
                reason: MissReason::MethodMismatch,
            });
        }

        let url_path = call.url_path.as_deref().unwrap_or("");
        let Some(route) = best_path_match(&method_matched, url_path) else {
            return Ok(LinkResult::Unlinked {
                call: call.clone(),
                reason: MissReason::PathMismatch,
            });
        };

        Ok(LinkResult::Linked(ServiceRelation {
            source_file: call.source_file.clone(),
            source_line: call.line_number,
            target_file: format!("{}/{}", route.service, route.handler_file),
            target_function: route.handler_function.clone(),
            target_line: route.line_number,
            relation_type: call.call_type.into(),
            route_path: call.url_path.clone().map(|_| route.path.clone()),
            confidence: call.confidence,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_common::CallType;
    use conduit_registry::InMemoryRouteRegistry;

    async fn registry_with(routes: Vec<RouteDefinition>) -> Arc<dyn RouteRegistry> {
        let registry: Arc<dyn RouteRegistry> = Arc::new(InMemoryRouteRegistry::new());
        registry.add_routes("svc", routes).await.unwrap();
        registry
    }

    fn route(method: HttpMethod, path: &str, line: u32) -> RouteDefinition {
        RouteDefinition {
            service: "svc".to_string(),
            method,
            path: path.to_string(),
            handler_file: "routes.py".to_string(),
            handler_function: "handler".to_string(),
            line_number: line,
        }
    }

    fn call(method: Option<HttpMethod>, path: &str, confidence: f64) -> ServiceCall {
        ServiceCall::new(
            "auth/login.py",
            5,
            "svc",
            CallType::Http,
            confidence,
            method,
            Some(path.to_string()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn scenario_fastapi_cross_service_link() {
        let registry: Arc<dyn RouteRegistry> = Arc::new(InMemoryRouteRegistry::new());
        registry
            .add_routes(
                "user-service",
                vec![RouteDefinition {
                    service: "user-service".to_string(),
                    method: HttpMethod::Get,
                    path: "/api/users/{user_id}".to_string(),
                    handler_file: "user-service/routes.py".to_string(),
                    handler_function: "get_user".to_string(),
                    line_number: 10,
                }],
            )
            .await
            .unwrap();
        let linker = RegistryCallLinker::new(registry);
        let call = ServiceCall::new(
            "auth/login.py",
            1,
            "user-service",
            CallType::Http,
            confidence::MEDIUM,
            Some(HttpMethod::Get),
            Some("/api/users/{user_id}".to_string()),
        )
        .unwrap();

        let result = linker.link(&call).await.unwrap();
        match result {
            LinkResult::Linked(relation) => {
                assert_eq!(relation.source_file, "auth/login.py");
                assert_eq!(relation.target_file, "user-service/user-service/routes.py");
                assert_eq!(relation.target_function, "get_user");
                assert_eq!(relation.target_line, 10);
                assert_eq!(relation.route_path.as_deref(), Some("/api/users/{user_id}"));
                assert_eq!(relation.confidence, confidence::MEDIUM);
            }
            other => panic!("expected linked relation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scenario_method_mismatch() {
        let registry = registry_with(vec![route(HttpMethod::Get, "/api/users", 1)]).await;
        let linker = RegistryCallLinker::new(registry);
        let result = linker
            .link(&call(Some(HttpMethod::Post), "/api/users", confidence::HIGH))
            .await
            .unwrap();
        assert!(matches!(
            result,
            LinkResult::Unlinked {
                reason: MissReason::MethodMismatch,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn scenario_no_routes_registered() {
        let registry: Arc<dyn RouteRegistry> = Arc::new(InMemoryRouteRegistry::new());
        let linker = RegistryCallLinker::new(registry);
        let c = ServiceCall::new(
            "x.py",
            1,
            "unknown-svc",
            CallType::Http,
            confidence::HIGH,
            Some(HttpMethod::Get),
            Some("/api".to_string()),
        )
        .unwrap();
        let result = linker.link(&c).await.unwrap();
        assert!(matches!(
            result,
            LinkResult::Unlinked {
                reason: MissReason::NoRoutes,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn scenario_trailing_extension_still_links() {
        let registry = registry_with(vec![route(HttpMethod::Get, "/api/users/{id}", 4)]).await;
        let linker = RegistryCallLinker::new(registry);
        let result = linker
            .link(&call(
                Some(HttpMethod::Get),
                "/api/users/123/orders",
                confidence::HIGH,
            ))
            .await
            .unwrap();
        match result {
            LinkResult::Linked(relation) => {
                assert_eq!(relation.route_path.as_deref(), Some("/api/users/{id}"));
            }
            other => panic!("expected linked relation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn low_confidence_call_never_produces_a_relation() {
        let registry = registry_with(vec![route(HttpMethod::Get, "/api/users", 1)]).await;
        let linker = RegistryCallLinker::new(registry);
        let result = linker
            .link(&call(Some(HttpMethod::Get), "/api/users", confidence::LOW))
            .await
            .unwrap();
        assert!(!result.is_linked());
    }
}
