//! Cross-service, persistent store of route definitions with pattern-matched
//! lookup (§4.3). Two variants — in-memory and sqlite-backed — implement the
//! same trait and must pass the same parity test suite (`tests/parity.rs`).

pub mod matching;
mod memory;
mod sqlite;

pub use matching::{path_matches, MatchSpecificity};
pub use memory::InMemoryRouteRegistry;
pub use sqlite::SqliteRouteRegistry;

use async_trait::async_trait;
use conduit_common::{ConduitError, HttpMethod, RouteDefinition, Result};

/// Per-route outcome of a bulk `add_routes` call: malformed routes are
/// rejected individually while the rest of the batch proceeds (§4.3's error
/// semantics).
#[derive(Debug, Default)]
pub struct AddRoutesReport {
    pub accepted: usize,
    pub rejected: Vec<(RouteDefinition, ConduitError)>,
}

#[async_trait]
pub trait RouteRegistry: Send + Sync {
    /// Replaces the complete set of routes for `service` atomically. An
    /// empty `routes` clears the service's entries. Concurrent readers never
    /// observe a partially-replaced set.
    async fn add_routes(&self, service: &str, routes: Vec<RouteDefinition>) -> Result<AddRoutesReport>;

    /// Empty vec if `service` is unknown.
    async fn get_routes(&self, service: &str) -> Result<Vec<RouteDefinition>>;

    /// Looks up a concrete request against `service`'s routes using the
    /// matching rules in §4.3. Method comparison is case-insensitive.
    async fn find_route_by_request(
        &self,
        service: &str,
        method: HttpMethod,
        request_path: &str,
    ) -> Result<Option<RouteDefinition>>;

    async fn all_services(&self) -> Result<Vec<String>>;

    /// Clears one service's routes, or every service's routes when `service`
    /// is `None`.
    async fn clear(&self, service: Option<&str>) -> Result<()>;
}

/// Selects the best-matching route among `routes` for `(method, request_path)`,
/// implementing the tie-break rules in §4.3.5 / §4.4.3: exact beats
/// parameterized beats trailing-extension; ties broken by shortest pattern,
/// then lowest line number. Shared by every `RouteRegistry` impl and by the
/// Call Linker so both apply identical selection logic.
pub fn best_match<'a>(
    routes: &'a [RouteDefinition],
    method: HttpMethod,
    request_path: &str,
) -> Option<&'a RouteDefinition> {
    let method_matched: Vec<&RouteDefinition> = routes.iter().filter(|r| r.method.matches(&method)).collect();
    best_path_match(&method_matched, request_path)
}

/// The same tie-break logic as [`best_match`], applied to a caller-supplied
/// (already method-filtered) candidate set. Exposed separately so the Call
/// Linker can apply its own method-compatibility rule (an `unknown` call
/// method matches any route method, §4.4.3) before reusing this selection.
pub fn best_path_match<'a>(
    routes: &[&'a RouteDefinition],
    request_path: &str,
) -> Option<&'a RouteDefinition> {
    let mut candidates: Vec<(MatchSpecificity, &RouteDefinition)> = routes
        .iter()
        .filter_map(|r| path_matches(&r.path, request_path).map(|spec| (spec, *r)))
        .collect();

    candidates.sort_by(|(spec_a, route_a), (spec_b, route_b)| {
        spec_b
            .cmp(spec_a)
            .then_with(|| route_a.path.len().cmp(&route_b.path.len()))
            .then_with(|| route_a.line_number.cmp(&route_b.line_number))
    });

    candidates.into_iter().next().map(|(_, r)| r)
}
