//! Parity test suite: the in-memory and sqlite-backed registries must pass
//! identical behavioral contracts (§9, "Registry persistence").

use conduit_common::{HttpMethod, RouteDefinition};
use conduit_registry::{InMemoryRouteRegistry, RouteRegistry, SqliteRouteRegistry};
use sqlx::SqlitePool;

fn route(path: &str, line: u32) -> RouteDefinition {
    RouteDefinition {
        service: "svc".to_string(),
        method: HttpMethod::Get,
        path: path.to_string(),
        handler_file: "svc/routes.py".to_string(),
        handler_function: "handler".to_string(),
        line_number: line,
    }
}

async fn sqlite_registry() -> SqliteRouteRegistry {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    let registry = SqliteRouteRegistry::from_pool(pool);
    registry.migrate().await.unwrap();
    registry
}

macro_rules! parity_test {
    ($name:ident, |$registry:ident: &dyn RouteRegistry| $body:block) => {
        #[tokio::test]
        async fn $name() {
            {
                let boxed: Box<dyn RouteRegistry> = Box::new(InMemoryRouteRegistry::new());
                let $registry = boxed.as_ref();
                $body
            }
            {
                let boxed: Box<dyn RouteRegistry> = Box::new(sqlite_registry().await);
                let $registry = boxed.as_ref();
                $body
            }
        }
    };
}

parity_test!(replace_all_round_trips, |registry: &dyn RouteRegistry| {
    registry.clear(None).await.unwrap();
    registry
        .add_routes("svc", vec![route("/a", 1), route("/b", 2)])
        .await
        .unwrap();
    registry
        .add_routes("svc", vec![route("/c", 3)])
        .await
        .unwrap();
    let routes = registry.get_routes("svc").await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].path, "/c");
});

parity_test!(unknown_service_is_empty, |registry: &dyn RouteRegistry| {
    let routes = registry.get_routes("ghost-service").await.unwrap();
    assert!(routes.is_empty());
});

parity_test!(parameterized_path_matches_concrete_request, |registry: &dyn RouteRegistry| {
    registry.clear(None).await.unwrap();
    registry
        .add_routes("svc", vec![route("/api/users/{id}", 10)])
        .await
        .unwrap();
    let found = registry
        .find_route_by_request("svc", HttpMethod::Get, "/api/users/42")
        .await
        .unwrap();
    assert!(found.is_some());
});

parity_test!(malformed_path_rejected_rest_accepted, |registry: &dyn RouteRegistry| {
    registry.clear(None).await.unwrap();
    let report = registry
        .add_routes("svc", vec![route("", 1), route("/ok", 2)])
        .await
        .unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejected.len(), 1);
});
