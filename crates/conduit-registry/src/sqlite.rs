use async_trait::async_trait;
use conduit_common::{ConduitError, HttpMethod, Result, RouteDefinition};
use sqlx::SqlitePool;

use crate::{best_match, AddRoutesReport, RouteRegistry};

/// Persistent variant backed by an embedded SQLite database, keyed on
/// `(service, method, path)` with a secondary index on `service` (§6,
/// "Persisted state layout").
pub struct SqliteRouteRegistry {
    pool: SqlitePool,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS routes (
        service TEXT NOT NULL,
        method TEXT NOT NULL,
        path TEXT NOT NULL,
        handler_file TEXT NOT NULL,
        handler_function TEXT NOT NULL,
        line_number INTEGER NOT NULL,
        PRIMARY KEY (service, method, path)
    )",
    "CREATE INDEX IF NOT EXISTS routes_service_idx ON routes (service)",
];

impl SqliteRouteRegistry {
    pub async fn connect(path: &str) -> Result<Self> {
        let url = format!("sqlite://{path}?mode=rwc");
        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| storage_error("connect", e, true))?;
        let registry = SqliteRouteRegistry { pool };
        registry.migrate().await?;
        Ok(registry)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        SqliteRouteRegistry { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| storage_error("migrate", e, false))?;
            tracing::info!(statement, "route registry schema statement applied");
        }
        Ok(())
    }
}

fn storage_error(operation: &str, e: sqlx::Error, retryable: bool) -> ConduitError {
    ConduitError::Storage {
        operation: operation.to_string(),
        message: e.to_string(),
        retryable,
        retry_after: retryable.then(|| std::time::Duration::from_millis(250)),
    }
}

#[async_trait]
impl RouteRegistry for SqliteRouteRegistry {
    async fn add_routes(&self, service: &str, routes: Vec<RouteDefinition>) -> Result<AddRoutesReport> {
        let mut report = AddRoutesReport::default();
        let mut accepted = Vec::with_capacity(routes.len());
        for route in routes {
            match route.validate() {
                Ok(()) => accepted.push(route),
                Err(e) => report.rejected.push((route, e)),
            }
        }

        // Delete-all-then-insert-all in one transaction: concurrent readers
        // see either the previous snapshot or the new one, never a mix
        // (§4.3's transactional guarantee).
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("add_routes.begin", e, true))?;

        sqlx::query("DELETE FROM routes WHERE service = ?1")
            .bind(service)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("add_routes.delete", e, true))?;

        for route in &accepted {
            sqlx::query(
                "INSERT INTO routes (service, method, path, handler_file, handler_function, line_number)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&route.service)
            .bind(route.method.as_str())
            .bind(&route.path)
            .bind(&route.handler_file)
            .bind(&route.handler_function)
            .bind(route.line_number)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("add_routes.insert", e, true))?;
        }

        tx.commit()
            .await
            .map_err(|e| storage_error("add_routes.commit", e, true))?;

        report.accepted = accepted.len();
        Ok(report)
    }

    async fn get_routes(&self, service: &str) -> Result<Vec<RouteDefinition>> {
        let rows: Vec<(String, String, String, String, String, i64)> = sqlx::query_as(
            "SELECT service, method, path, handler_file, handler_function, line_number
             FROM routes WHERE service = ?1",
        )
        .bind(service)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("get_routes", e, true))?;

        Ok(rows
            .into_iter()
            .map(|(service, method, path, handler_file, handler_function, line_number)| {
                RouteDefinition {
                    service,
                    method: HttpMethod::parse(&method),
                    path,
                    handler_file,
                    handler_function,
                    line_number: line_number as u32,
                }
            })
            .collect())
    }

    async fn find_route_by_request(
        &self,
        service: &str,
        method: HttpMethod,
        request_path: &str,
    ) -> Result<Option<RouteDefinition>> {
        let routes = self.get_routes(service).await?;
        Ok(best_match(&routes, method, request_path).cloned())
    }

    async fn all_services(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT service FROM routes")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("all_services", e, true))?;
        Ok(rows.into_iter().map(|(s,)| s).collect())
    }

    async fn clear(&self, service: Option<&str>) -> Result<()> {
        match service {
            Some(service) => {
                sqlx::query("DELETE FROM routes WHERE service = ?1")
                    .bind(service)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| storage_error("clear", e, true))?;
            }
            None => {
                sqlx::query("DELETE FROM routes")
                    .execute(&self.pool)
                    .await
                    .map_err(|e| storage_error("clear_all", e, true))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_common::HttpMethod;

    async fn test_registry() -> SqliteRouteRegistry {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let registry = SqliteRouteRegistry::from_pool(pool);
        registry.migrate().await.unwrap();
        registry
    }

    fn route(service: &str, path: &str, line: u32) -> RouteDefinition {
        RouteDefinition {
            service: service.to_string(),
            method: HttpMethod::Get,
            path: path.to_string(),
            handler_file: format!("{service}/routes.py"),
            handler_function: "handler".to_string(),
            line_number: line,
        }
    }

    #[tokio::test]
    async fn replace_all_is_transactional() {
        let registry = test_registry().await;
        registry
            .add_routes("svc", vec![route("svc", "/a", 1), route("svc", "/b", 2)])
            .await
            .unwrap();
        registry
            .add_routes("svc", vec![route("svc", "/c", 3)])
            .await
            .unwrap();
        let routes = registry.get_routes("svc").await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/c");
    }

    #[tokio::test]
    async fn find_route_by_request_matches_parameterized_path() {
        let registry = test_registry().await;
        registry
            .add_routes(
                "user-service",
                vec![RouteDefinition {
                    service: "user-service".to_string(),
                    method: HttpMethod::Get,
                    path: "/api/users/{id}".to_string(),
                    handler_file: "user-service/routes.py".to_string(),
                    handler_function: "get_user".to_string(),
                    line_number: 10,
                }],
            )
            .await
            .unwrap();
        let found = registry
            .find_route_by_request("user-service", HttpMethod::Get, "/api/users/42")
            .await
            .unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().handler_function, "get_user");
    }
}
