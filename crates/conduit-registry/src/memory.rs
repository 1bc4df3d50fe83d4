use std::collections::HashMap;

use async_trait::async_trait;
use conduit_common::{HttpMethod, Result, RouteDefinition};
use tokio::sync::RwLock;

use crate::{best_match, AddRoutesReport, RouteRegistry};

/// In-memory variant for tests. Must pass the same parity test suite as
/// [`crate::SqliteRouteRegistry`] (§9, "Registry persistence").
#[derive(Default)]
pub struct InMemoryRouteRegistry {
    routes: RwLock<HashMap<String, Vec<RouteDefinition>>>,
}

impl InMemoryRouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteRegistry for InMemoryRouteRegistry {
    async fn add_routes(&self, service: &str, routes: Vec<RouteDefinition>) -> Result<AddRoutesReport> {
        let mut report = AddRoutesReport::default();
        let mut accepted = Vec::with_capacity(routes.len());
        for route in routes {
            match route.validate() {
                Ok(()) => {
                    report.accepted += 1;
                    accepted.push(route);
                }
                Err(e) => report.rejected.push((route, e)),
            }
        }
        // Replace-all semantics: the write lock makes this atomic with
        // respect to any concurrent reader (§4.3's transactional guarantee).
        let mut guard = self.routes.write().await;
        guard.insert(service.to_string(), accepted);
        Ok(report)
    }

    async fn get_routes(&self, service: &str) -> Result<Vec<RouteDefinition>> {
        let guard = self.routes.read().await;
        Ok(guard.get(service).cloned().unwrap_or_default())
    }

    async fn find_route_by_request(
        &self,
        service: &str,
        method: HttpMethod,
        request_path: &str,
    ) -> Result<Option<RouteDefinition>> {
        let guard = self.routes.read().await;
        let routes = guard.get(service).map(|v| v.as_slice()).unwrap_or(&[]);
        Ok(best_match(routes, method, request_path).cloned())
    }

    async fn all_services(&self) -> Result<Vec<String>> {
        let guard = self.routes.read().await;
        Ok(guard.keys().cloned().collect())
    }

    async fn clear(&self, service: Option<&str>) -> Result<()> {
        let mut guard = self.routes.write().await;
        match service {
            Some(service) => {
                guard.remove(service);
            }
            None => guard.clear(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_common::HttpMethod;

    fn route(service: &str, method: HttpMethod, path: &str, line: u32) -> RouteDefinition {
        RouteDefinition {
            service: service.to_string(),
            method,
            path: path.to_string(),
            handler_file: format!("{service}/routes.py"),
            handler_function: "handler".to_string(),
            line_number: line,
        }
    }

    #[tokio::test]
    async fn replace_all_clears_previous_set() {
        let registry = InMemoryRouteRegistry::new();
        registry
            .add_routes(
                "svc",
                vec![
                    route("svc", HttpMethod::Get, "/a", 1),
                    route("svc", HttpMethod::Get, "/b", 2),
                ],
            )
            .await
            .unwrap();
        registry
            .add_routes("svc", vec![route("svc", HttpMethod::Get, "/c", 3)])
            .await
            .unwrap();
        let routes = registry.get_routes("svc").await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/c");
    }

    #[tokio::test]
    async fn malformed_route_rejected_rest_accepted() {
        let registry = InMemoryRouteRegistry::new();
        let report = registry
            .add_routes(
                "svc",
                vec![
                    route("svc", HttpMethod::Get, "", 1),
                    route("svc", HttpMethod::Get, "/ok", 2),
                ],
            )
            .await
            .unwrap();
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected.len(), 1);
    }

    #[tokio::test]
    async fn unknown_service_returns_empty() {
        let registry = InMemoryRouteRegistry::new();
        assert!(registry.get_routes("ghost").await.unwrap().is_empty());
    }
}
