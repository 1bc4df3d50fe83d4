//! Pure path-matching rules (§4.3), shared by every registry variant and by
//! the Call Linker. Kept pure and allocation-light so both the in-memory and
//! sqlite-backed registries get identical behavior for free.

/// How specifically a request matched a pattern. Ordering reflects
/// §4.3.5's priority: exact beats parameterized beats trailing-extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchSpecificity {
    TrailingExtension,
    Parameterized,
    Exact,
}

/// Strips the query string and normalizes a trailing slash. Used both by
/// matching and directly by callers who need §8's path-match monotonicity
/// property (stripping a query string never unmatches a previously-matching
/// path).
pub fn normalize_path(path: &str) -> String {
    let without_query = path.split('?').next().unwrap_or(path);
    if without_query.len() > 1 && without_query.ends_with('/') {
        without_query.trim_end_matches('/').to_string()
    } else {
        without_query.to_string()
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect()
}

/// Matches a request path against a route pattern whose `{name}` segments
/// are already normalized (see `conduit_patterns::util::normalize_path_pattern`).
/// `/` matches `/` only; a request may carry trailing segments beyond the
/// pattern's own segments (nested-resource permission, §4.3.5).
pub fn path_matches(pattern: &str, request_path: &str) -> Option<MatchSpecificity> {
    let pattern = normalize_path(pattern);
    let request = normalize_path(request_path);

    let p_segs = segments(&pattern);
    let r_segs = segments(&request);

    if p_segs.is_empty() {
        return if r_segs.is_empty() {
            Some(MatchSpecificity::Exact)
        } else {
            None
        };
    }
    if r_segs.len() < p_segs.len() {
        return None;
    }

    let mut exact = true;
    for (p, r) in p_segs.iter().zip(r_segs.iter()) {
        if p.starts_with('{') && p.ends_with('}') {
            exact = false;
        } else if p != r {
            return None;
        }
    }

    if r_segs.len() == p_segs.len() {
        Some(if exact {
            MatchSpecificity::Exact
        } else {
            MatchSpecificity::Parameterized
        })
    } else {
        Some(MatchSpecificity::TrailingExtension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_matches_root_only() {
        assert_eq!(path_matches("/", "/"), Some(MatchSpecificity::Exact));
        assert_eq!(path_matches("/", "/api"), None);
    }

    #[test]
    fn exact_beats_parameterized() {
        assert_eq!(
            path_matches("/api/users/me", "/api/users/me"),
            Some(MatchSpecificity::Exact)
        );
        assert_eq!(
            path_matches("/api/users/{id}", "/api/users/me"),
            Some(MatchSpecificity::Parameterized)
        );
    }

    #[test]
    fn trailing_segments_permit_nested_resources() {
        assert_eq!(
            path_matches("/api/users/{id}", "/api/users/123/orders"),
            Some(MatchSpecificity::TrailingExtension)
        );
    }

    #[test]
    fn pure_parameter_pattern_matches_concrete_form() {
        assert_eq!(path_matches("/{x}", "/abc"), Some(MatchSpecificity::Parameterized));
    }

    #[test]
    fn query_string_is_stripped_before_matching() {
        assert_eq!(
            path_matches("/api/users/{id}", "/api/users/42?verbose=true"),
            Some(MatchSpecificity::Parameterized)
        );
    }

    #[test]
    fn monotonicity_stripping_query_preserves_match() {
        let pattern = "/api/users/{id}";
        let request = "/api/users/42?x=1";
        let with_query = path_matches(pattern, request).is_some();
        let stripped = normalize_path(request);
        let without_query = path_matches(pattern, &stripped).is_some();
        assert_eq!(with_query, without_query);
    }
}
