use conduit_common::{CallType, HttpMethod, RouteDefinition, ServiceCall};
use tree_sitter::Node;

use crate::util::{
    call_arguments, callee_tail, callee_text, enclosing_scope, find_identifier_string_value,
    first_positional_arg, first_string_arg, http_method_from_tail, keyword_arg_string, node_text,
    normalize_path_pattern, path_from_url, service_from_url, template_url_to_pattern,
};
use crate::{ClientMatcher, ServerMatcher};

pub fn client_matchers() -> Vec<Box<dyn ClientMatcher>> {
    vec![
        Box::new(HttpClientMatcher),
        Box::new(GrpcClientMatcher),
        Box::new(QueuePublishMatcher),
        Box::new(QueueSubscribeMatcher),
    ]
}

pub fn server_matchers() -> Vec<Box<dyn ServerMatcher>> {
    vec![Box::new(FlaskFastApiRouteMatcher)]
}

/// `requests.get/post/...`, `httpx.get/post/...` and their `async`
/// equivalents (`await client.get(...)`), and `aiohttp.ClientSession().get`.
/// All share the same shape: a call whose callee tail is an HTTP verb and
/// whose first argument is a URL.
struct HttpClientMatcher;

impl ClientMatcher for HttpClientMatcher {
    fn name(&self) -> &'static str {
        "python.http_client"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        let tail = callee_tail(callee);
        let Some(method) = http_method_from_tail(tail) else {
            return Vec::new();
        };
        // Reject known non-HTTP-client callees that happen to share a verb
        // name, e.g. `urlparse(...)` has no matching tail, so nothing to
        // exclude here beyond requiring an args list with a string.
        let Some(args) = call_arguments(node) else {
            return Vec::new();
        };
        let line = node.start_position().row as u32 + 1;

        let (target_service, url_path, confidence) = match first_string_arg(args, source) {
            Some(arg) if arg.is_template => {
                let Some(service) = service_from_url(&arg.text) else {
                    return Vec::new();
                };
                let pattern =
                    template_url_to_pattern(&path_from_url(&arg.text).unwrap_or_default());
                (service, Some(pattern), conduit_common::confidence::MEDIUM)
            }
            Some(arg) => {
                let Some(service) = service_from_url(&arg.text) else {
                    return Vec::new();
                };
                let path = path_from_url(&arg.text).unwrap_or_default();
                (service, Some(path), conduit_common::confidence::HIGH)
            }
            None => {
                let Some(url) = resolve_url_from_variable(node, args, source) else {
                    return Vec::new();
                };
                let Some(service) = service_from_url(&url) else {
                    return Vec::new();
                };
                let path = path_from_url(&url).unwrap_or_default();
                (service, Some(path), conduit_common::confidence::LOW)
            }
        };

        match ServiceCall::new(
            source_file,
            line,
            target_service,
            CallType::Http,
            confidence,
            Some(method),
            url_path,
        ) {
            Ok(call) => vec![call],
            Err(_) => Vec::new(),
        }
    }
}

/// `url = "http://service/path"` assigned earlier in the enclosing
/// function (or at module scope), then passed to the client call by name.
fn resolve_url_from_variable(call: Node, args: Node, source: &[u8]) -> Option<String> {
    let ident = first_positional_arg(args).filter(|n| n.kind() == "identifier")?;
    let name = node_text(ident, source);
    let scope = enclosing_scope(call, &["function_definition", "module"])?;
    find_identifier_string_value(scope, source, name).map(|arg| arg.text)
}

/// `grpc.insecure_channel("target:port")` / `grpc.secure_channel(...)`
/// followed elsewhere by a stub method invocation; this matcher recognizes
/// the channel-construction call itself, which is where the target is
/// known.
struct GrpcClientMatcher;

impl ClientMatcher for GrpcClientMatcher {
    fn name(&self) -> &'static str {
        "python.grpc_client"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        if !matches!(
            callee_tail(callee),
            "insecure_channel" | "secure_channel" | "aio_channel"
        ) {
            return Vec::new();
        }
        let Some(args) = call_arguments(node) else {
            return Vec::new();
        };
        let Some(target) = first_string_arg(args, source) else {
            return Vec::new();
        };
        let service = target.text.split(':').next().unwrap_or(&target.text);
        let line = node.start_position().row as u32 + 1;
        match ServiceCall::new(
            source_file,
            line,
            service,
            CallType::Grpc,
            conduit_common::confidence::HIGH,
            None,
            None,
        ) {
            Ok(call) => vec![call],
            Err(_) => Vec::new(),
        }
    }
}

/// RabbitMQ `channel.basic_publish(exchange=..., routing_key="...")` and
/// Kafka `producer.send("topic", ...)`.
struct QueuePublishMatcher;

impl ClientMatcher for QueuePublishMatcher {
    fn name(&self) -> &'static str {
        "python.queue_publish"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        let tail = callee_tail(callee);
        let Some(args) = call_arguments(node) else {
            return Vec::new();
        };
        let topic = match tail {
            "basic_publish" => keyword_arg_string(args, source, "routing_key"),
            "send" => first_string_arg(args, source).map(|a| a.text),
            _ => None,
        };
        let Some(topic) = topic else {
            return Vec::new();
        };
        let line = node.start_position().row as u32 + 1;
        match ServiceCall::new(
            source_file,
            line,
            topic,
            CallType::QueuePublish,
            conduit_common::confidence::HIGH,
            None,
            None,
        ) {
            Ok(call) => vec![call],
            Err(_) => Vec::new(),
        }
    }
}

/// RabbitMQ `channel.basic_consume(queue="...")` and Kafka
/// `consumer.subscribe(["topic-a", "topic-b"])`, the latter yielding one
/// record per topic.
struct QueueSubscribeMatcher;

impl ClientMatcher for QueueSubscribeMatcher {
    fn name(&self) -> &'static str {
        "python.queue_subscribe"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        let tail = callee_tail(callee);
        let Some(args) = call_arguments(node) else {
            return Vec::new();
        };
        let line = node.start_position().row as u32 + 1;

        match tail {
            "basic_consume" => keyword_arg_string(args, source, "queue")
                .into_iter()
                .filter_map(|topic| {
                    ServiceCall::new(
                        source_file,
                        line,
                        topic,
                        CallType::QueueSubscribe,
                        conduit_common::confidence::HIGH,
                        None,
                        None,
                    )
                    .ok()
                })
                .collect(),
            "subscribe" => {
                let mut topics = Vec::new();
                let mut cursor = args.walk();
                for child in args.named_children(&mut cursor) {
                    if child.kind() == "list" {
                        let mut list_cursor = child.walk();
                        for item in child.named_children(&mut list_cursor) {
                            if item.kind() == "string" {
                                topics.push(
                                    node_text(item, source)
                                        .trim_matches(|c| c == '"' || c == '\'')
                                        .to_string(),
                                );
                            }
                        }
                    }
                }
                topics
                    .into_iter()
                    .filter_map(|topic| {
                        ServiceCall::new(
                            source_file,
                            line,
                            topic,
                            CallType::QueueSubscribe,
                            conduit_common::confidence::HIGH,
                            None,
                            None,
                        )
                        .ok()
                    })
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Flask `@app.route("/path", methods=["GET"])` and FastAPI
/// `@router.get("/path")` / `@app.get("/path")` decorators.
struct FlaskFastApiRouteMatcher;

impl ServerMatcher for FlaskFastApiRouteMatcher {
    fn name(&self) -> &'static str {
        "python.flask_fastapi_route"
    }

    fn match_node(
        &self,
        node: Node,
        source: &[u8],
        service: &str,
        handler_file: &str,
    ) -> Vec<RouteDefinition> {
        if node.kind() != "decorator" {
            return Vec::new();
        }
        let Some(call) = node.named_child(0).filter(|n| n.kind() == "call") else {
            return Vec::new();
        };
        let Some(callee) = callee_text(call, source) else {
            return Vec::new();
        };
        let tail = callee_tail(callee);

        let method = match tail {
            "route" => None, // method comes from a `methods=` kwarg, defaults to GET
            other => http_method_from_tail(other),
        };
        if tail != "route" && method.is_none() {
            return Vec::new();
        }

        let Some(args) = call_arguments(call) else {
            return Vec::new();
        };
        let Some(path_arg) = first_string_arg(args, source) else {
            return Vec::new();
        };

        let method = method.unwrap_or_else(|| {
            keyword_arg_string(args, source, "methods")
                .as_deref()
                .and_then(|m| m.split(|c: char| !c.is_alphabetic()).find(|s| !s.is_empty()))
                .map(HttpMethod::parse)
                .unwrap_or(HttpMethod::Get)
        });

        let Some(parent) = node.parent() else {
            return Vec::new();
        };
        let Some(def) = parent.child_by_field_name("definition") else {
            return Vec::new();
        };
        if def.kind() != "function_definition" {
            return Vec::new();
        }
        let Some(name_node) = def.child_by_field_name("name") else {
            return Vec::new();
        };
        let handler_function = node_text(name_node, source).to_string();
        let line_number = def.start_position().row as u32 + 1;

        let route = RouteDefinition {
            service: service.to_string(),
            method,
            path: normalize_path_pattern(&path_arg.text),
            handler_file: handler_file.to_string(),
            handler_function,
            line_number,
        };
        vec![route]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_lang::Language;
    use tree_sitter::Parser;

    fn parse(src: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser.set_language(&Language::Python.grammar()).unwrap();
        parser.parse(src, None).unwrap()
    }

    fn find_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if let Some(found) = find_kind(child, kind) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn httpx_templated_get_yields_medium_confidence() {
        let src = "httpx.get(f\"http://user-service/api/users/{user_id}\")";
        let tree = parse(src);
        let call = find_kind(tree.root_node(), "call").unwrap();
        let calls = HttpClientMatcher.match_node(call, src.as_bytes(), "auth/login.py");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_service, "user-service");
        assert_eq!(calls[0].confidence, conduit_common::confidence::MEDIUM);
        assert_eq!(calls[0].method, Some(HttpMethod::Get));
    }

    #[test]
    fn variable_url_yields_low_confidence() {
        let src = "def call():\n    url = \"http://user-service/api/users\"\n    requests.get(url)\n";
        let tree = parse(src);
        let call = find_kind(tree.root_node(), "call").unwrap();
        let calls = HttpClientMatcher.match_node(call, src.as_bytes(), "x.py");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_service, "user-service");
        assert_eq!(calls[0].confidence, conduit_common::confidence::LOW);
    }

    #[test]
    fn urlparse_is_not_matched() {
        let src = "urllib.parse.urlparse(\"http://example.com\")";
        let tree = parse(src);
        let call = find_kind(tree.root_node(), "call").unwrap();
        let calls = HttpClientMatcher.match_node(call, src.as_bytes(), "x.py");
        assert!(calls.is_empty());
    }

    #[test]
    fn docstring_url_yields_no_calls() {
        let src = "\"\"\"Example: http://user-service/api\"\"\"\n";
        let tree = parse(src);
        // No `call` node exists at all in a bare string-expression statement.
        assert!(find_kind(tree.root_node(), "call").is_none());
    }

    #[test]
    fn fastapi_get_decorator_yields_route() {
        let src = "@router.get(\"/api/users/{user_id}\")\nasync def get_user(user_id):\n    pass\n";
        let tree = parse(src);
        let decorator = find_kind(tree.root_node(), "decorator").unwrap();
        let routes = FlaskFastApiRouteMatcher.match_node(
            decorator,
            src.as_bytes(),
            "user-service",
            "user-service/routes.py",
        );
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/api/users/{user_id}");
        assert_eq!(routes[0].handler_function, "get_user");
        assert_eq!(routes[0].method, HttpMethod::Get);
    }

    #[test]
    fn flask_route_defaults_to_get_without_methods_kwarg() {
        let src = "@app.route(\"/health\")\ndef health():\n    pass\n";
        let tree = parse(src);
        let decorator = find_kind(tree.root_node(), "decorator").unwrap();
        let routes =
            FlaskFastApiRouteMatcher.match_node(decorator, src.as_bytes(), "svc", "svc/app.py");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, HttpMethod::Get);
    }
}
