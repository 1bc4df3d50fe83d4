//! Shared AST-reading helpers used by every matcher. Matchers never walk
//! children themselves (that is the extractor's job, §4.1); these helpers
//! only read fields and literal text off the single node they were handed.

use conduit_common::HttpMethod;
use tree_sitter::Node;

pub fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// The callee of a call-like node: `field("function")` for Python/Go/TS
/// `call`/`call_expression`, `field("expression")` for C# `invocation_expression`.
pub fn callee_text<'a>(call_node: Node, source: &'a [u8]) -> Option<&'a str> {
    call_node
        .child_by_field_name("function")
        .or_else(|| call_node.child_by_field_name("expression"))
        .map(|n| node_text(n, source))
}

/// The dotted tail of a callee, e.g. `requests.get` -> `get`,
/// `client.Do` -> `Do`.
pub fn callee_tail(callee: &str) -> &str {
    callee.rsplit(['.', ':']).next().unwrap_or(callee)
}

pub fn call_arguments(call_node: Node) -> Option<Node> {
    call_node
        .child_by_field_name("arguments")
        .or_else(|| call_node.child_by_field_name("argument_list"))
}

/// A single literal or templated string argument.
pub struct StringArg {
    /// The literal text with quotes stripped. For templated strings this is
    /// the template body, interpolation markers intact (e.g. `{user_id}`
    /// for Python f-strings, `${userId}` for JS template literals).
    pub text: String,
    pub is_template: bool,
}

/// Extracts the first positional string-like argument from an argument list,
/// handling plain strings, f-strings / template literals, and leaving
/// variable references undetected (callers treat `None` as "from a
/// variable").
pub fn first_string_arg(args_node: Node, source: &[u8]) -> Option<StringArg> {
    let mut cursor = args_node.walk();
    for child in args_node.named_children(&mut cursor) {
        match child.kind() {
            "string" | "string_literal" | "interpreted_string_literal"
            | "raw_string_literal" => {
                return Some(StringArg {
                    text: strip_quotes(node_text(child, source)),
                    is_template: false,
                });
            }
            "concatenated_string" | "template_string" | "interpolated_string_expression" => {
                return Some(StringArg {
                    text: strip_quotes(node_text(child, source)),
                    is_template: true,
                });
            }
            "keyword_argument" | "named_argument" => continue,
            _ => continue,
        }
    }
    None
}

/// Looks up a keyword/named argument's string value by name, e.g.
/// `routing_key="orders.created"` or `topic: "orders"`.
pub fn keyword_arg_string(args_node: Node, source: &[u8], keyword: &str) -> Option<String> {
    let mut cursor = args_node.walk();
    for child in args_node.named_children(&mut cursor) {
        if matches!(child.kind(), "keyword_argument" | "named_argument") {
            let name = child
                .child_by_field_name("name")
                .map(|n| node_text(n, source));
            if name == Some(keyword) {
                let value = child.child_by_field_name("value")?;
                return Some(strip_quotes(node_text(value, source)));
            }
        }
    }
    None
}

fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("f\"")
        .or_else(|| trimmed.strip_prefix("f'"))
        .unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_prefix('`')
        .or_else(|| trimmed.strip_prefix('"'))
        .or_else(|| trimmed.strip_prefix('\''))
        .unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_suffix('`')
        .or_else(|| trimmed.strip_suffix('"'))
        .or_else(|| trimmed.strip_suffix('\''))
        .unwrap_or(trimmed);
    trimmed.to_string()
}

/// Infers an HTTP method from a callee's tail segment
/// (`get`, `Get`, `post`, `Post`, ...). Returns `None` when the tail is not
/// a recognized method name (e.g. `client.Do`, which carries its method
/// elsewhere and is left to the caller to resolve within scope).
pub fn http_method_from_tail(tail: &str) -> Option<HttpMethod> {
    match tail.to_ascii_lowercase().as_str() {
        "get" => Some(HttpMethod::Get),
        "post" => Some(HttpMethod::Post),
        "put" => Some(HttpMethod::Put),
        "delete" => Some(HttpMethod::Delete),
        "patch" => Some(HttpMethod::Patch),
        _ => None,
    }
}

/// Normalizes a route pattern's parameter syntax to `{name}`, preserving the
/// parameter name (unlike a generic placeholder substitution): Flask/Express
/// `<name>`/`:name` forms and FastAPI/ASP.NET `{name}` forms all converge.
pub fn normalize_path_pattern(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let mut name = String::new();
                for c2 in chars.by_ref() {
                    if c2 == '>' {
                        break;
                    }
                    name.push(c2);
                }
                let name = name.split(':').next_back().unwrap_or(&name);
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
            ':' => {
                let mut name = String::new();
                while let Some(&c2) = chars.peek() {
                    if c2 == '/' {
                        break;
                    }
                    name.push(c2);
                    chars.next();
                }
                if name.is_empty() {
                    out.push(':');
                } else {
                    out.push('{');
                    out.push_str(&name);
                    out.push('}');
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Extracts the first `{name}`-or-`$ {name}`/`${name}` interpolation inside
/// a templated URL, used to recover a path pattern from an f-string/template
/// literal service call.
pub fn template_url_to_pattern(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == '$' && bytes.get(i + 1) == Some(&'{') {
            i += 2;
            let mut name = String::new();
            while i < bytes.len() && bytes[i] != '}' {
                name.push(bytes[i]);
                i += 1;
            }
            i += 1; // skip '}'
            out.push('{');
            out.push_str(name.trim());
            out.push('}');
        } else if bytes[i] == '{' {
            i += 1;
            let mut name = String::new();
            while i < bytes.len() && bytes[i] != '}' {
                name.push(bytes[i]);
                i += 1;
            }
            i += 1;
            out.push('{');
            out.push_str(name.trim());
            out.push('}');
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

/// The first positional argument node, skipping keyword/named arguments,
/// without requiring it to already be string-like. Used to detect a bare
/// variable reference where `first_string_arg` returned `None`.
pub fn first_positional_arg(args_node: Node) -> Option<Node> {
    let mut cursor = args_node.walk();
    args_node
        .named_children(&mut cursor)
        .find(|child| !matches!(child.kind(), "keyword_argument" | "named_argument"))
}

/// Walks up from `node` to the nearest ancestor whose kind is one of
/// `scope_kinds` — the enclosing function/method body a same-scope
/// variable lookup is allowed to search (§4.1 edge case: same-function-
/// scope only).
pub fn enclosing_scope<'a>(node: Node<'a>, scope_kinds: &[&str]) -> Option<Node<'a>> {
    let mut scope = node.parent()?;
    while !scope_kinds.contains(&scope.kind()) {
        scope = scope.parent()?;
    }
    Some(scope)
}

/// Searches `scope` for a `name = "literal"` (or `let`/`var`/`const`
/// declarator) assignment and returns the assigned string, handling plain
/// and templated string values. Used to resolve a call argument that is a
/// bare identifier back to the value assigned to it earlier in the same
/// function scope — the §3 LOW-confidence tier: "call with URL from a
/// variable whose value is known to the module".
pub fn find_identifier_string_value(scope: Node, source: &[u8], name: &str) -> Option<StringArg> {
    fn string_value(node: Node, source: &[u8]) -> Option<StringArg> {
        match node.kind() {
            "string" | "string_literal" | "interpreted_string_literal" | "raw_string_literal" => {
                Some(StringArg {
                    text: strip_quotes(node_text(node, source)),
                    is_template: false,
                })
            }
            "concatenated_string" | "template_string" | "interpolated_string_expression" => {
                Some(StringArg {
                    text: strip_quotes(node_text(node, source)),
                    is_template: true,
                })
            }
            _ => None,
        }
    }

    fn assigned_value<'a>(node: Node<'a>, source: &[u8]) -> Option<(String, Node<'a>)> {
        match node.kind() {
            "assignment" | "assignment_expression" => {
                let lhs = node.child_by_field_name("left")?;
                let rhs = node.child_by_field_name("right")?;
                Some((node_text(lhs, source).trim().to_string(), rhs))
            }
            "variable_declarator" => {
                let lhs = node.child_by_field_name("name")?;
                let rhs = node.child_by_field_name("value").or_else(|| {
                    let mut cursor = node.walk();
                    node.children(&mut cursor)
                        .find(|c| c.kind() == "equals_value_clause")
                        .and_then(|c| c.named_child(0))
                })?;
                Some((node_text(lhs, source).trim().to_string(), rhs))
            }
            _ => None,
        }
    }

    fn visit(node: Node, source: &[u8], name: &str, found: &mut Option<StringArg>) {
        if found.is_some() {
            return;
        }
        if let Some((lhs_name, rhs)) = assigned_value(node, source) {
            if lhs_name == name {
                if let Some(value) = string_value(rhs, source) {
                    *found = Some(value);
                    return;
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            visit(child, source, name, found);
            if found.is_some() {
                return;
            }
        }
    }

    let mut found = None;
    visit(scope, source, name, &mut found);
    found
}

/// Recovers a bare service-name host from a URL like `http://user-service/api/...`.
pub fn service_from_url(url: &str) -> Option<String> {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = without_scheme.split('/').next()?;
    let host = host.split(':').next()?; // drop a port if present
    if host.is_empty() || host.contains('{') || host.contains('$') {
        return None;
    }
    Some(host.to_string())
}

/// The path component of a URL (after the host), query string included.
pub fn path_from_url(url: &str) -> Option<String> {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let slash = without_scheme.find('/')?;
    Some(without_scheme[slash..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_flask_and_colon_forms() {
        assert_eq!(
            normalize_path_pattern("/api/users/<id>"),
            "/api/users/{id}"
        );
        assert_eq!(
            normalize_path_pattern("/api/users/<int:id>"),
            "/api/users/{id}"
        );
        assert_eq!(
            normalize_path_pattern("/api/users/:id"),
            "/api/users/{id}"
        );
        assert_eq!(
            normalize_path_pattern("/api/users/{id}"),
            "/api/users/{id}"
        );
    }

    #[test]
    fn recovers_service_and_path_from_url() {
        assert_eq!(
            service_from_url("http://user-service/api/users/1"),
            Some("user-service".to_string())
        );
        assert_eq!(
            path_from_url("http://user-service/api/users/1"),
            Some("/api/users/1".to_string())
        );
    }

    #[test]
    fn template_interpolation_becomes_braced_param() {
        assert_eq!(
            template_url_to_pattern("http://user-service/api/users/{user_id}"),
            "http://user-service/api/users/{user_id}"
        );
        assert_eq!(
            template_url_to_pattern("http://user-service/api/users/${userId}"),
            "http://user-service/api/users/{userId}"
        );
    }
}
