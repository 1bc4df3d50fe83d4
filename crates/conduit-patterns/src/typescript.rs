use conduit_common::{CallType, HttpMethod, RouteDefinition, ServiceCall};
use tree_sitter::Node;

use crate::util::{
    call_arguments, callee_tail, callee_text, enclosing_scope, find_identifier_string_value,
    first_positional_arg, first_string_arg, http_method_from_tail, node_text,
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
    vec![Box::new(ExpressRouteMatcher)]
}

/// `fetch(url, { method: "POST" })` and `axios.get(url)` / `axios.post(url, body)`.
struct HttpClientMatcher;

impl ClientMatcher for HttpClientMatcher {
    fn name(&self) -> &'static str {
        "typescript.http_client"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call_expression" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        let tail = callee_tail(callee);
        let Some(args) = call_arguments(node) else {
            return Vec::new();
        };

        let method = if tail == "fetch" {
            fetch_method_option(args, source).unwrap_or(HttpMethod::Get)
        } else if let Some(m) = http_method_from_tail(tail) {
            m
        } else {
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

/// `const url = "http://service/path"` (or plain assignment) earlier in the
/// enclosing function or module, then passed to the client call by name.
fn resolve_url_from_variable(call: Node, args: Node, source: &[u8]) -> Option<String> {
    let ident = first_positional_arg(args).filter(|n| n.kind() == "identifier")?;
    let name = node_text(ident, source);
    let scope = enclosing_scope(
        call,
        &[
            "function_declaration",
            "method_definition",
            "arrow_function",
            "function_expression",
            "program",
        ],
    )?;
    find_identifier_string_value(scope, source, name).map(|arg| arg.text)
}

fn fetch_method_option(args_node: Node, source: &[u8]) -> Option<HttpMethod> {
    let mut cursor = args_node.walk();
    for child in args_node.named_children(&mut cursor) {
        if child.kind() == "object" {
            let mut pair_cursor = child.walk();
            for pair in child.named_children(&mut pair_cursor) {
                if pair.kind() == "pair" {
                    let key = pair.child_by_field_name("key").map(|n| node_text(n, source));
                    if key == Some("method") {
                        let value = pair.child_by_field_name("value")?;
                        let text = node_text(value, source).trim_matches(|c| c == '"' || c == '\'');
                        return Some(HttpMethod::parse(text));
                    }
                }
            }
        }
    }
    None
}

/// `grpc.credentials.createInsecure()` paired with a generated client
/// constructor call `new UserServiceClient("target:port", creds)`.
struct GrpcClientMatcher;

impl ClientMatcher for GrpcClientMatcher {
    fn name(&self) -> &'static str {
        "typescript.grpc_client"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "new_expression" {
            return Vec::new();
        }
        let Some(constructor) = node.child_by_field_name("constructor") else {
            return Vec::new();
        };
        let name = node_text(constructor, source);
        if !name.ends_with("Client") {
            return Vec::new();
        }
        let Some(args) = node.child_by_field_name("arguments") else {
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

/// KafkaJS `producer.send({ topic: "...", messages: [...] })` and amqplib
/// `channel.publish(exchange, routingKey, content)`.
struct QueuePublishMatcher;

impl ClientMatcher for QueuePublishMatcher {
    fn name(&self) -> &'static str {
        "typescript.queue_publish"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call_expression" {
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
            "send" => object_field_string(args, source, "topic"),
            "publish" => {
                let mut cursor = args.walk();
                let positional: Vec<Node> = args.named_children(&mut cursor).collect();
                positional
                    .get(1)
                    .filter(|n| matches!(n.kind(), "string"))
                    .map(|n| node_text(*n, source).trim_matches('\'').trim_matches('"').to_string())
            }
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

fn object_field_string(args_node: Node, source: &[u8], field: &str) -> Option<String> {
    let mut cursor = args_node.walk();
    for child in args_node.named_children(&mut cursor) {
        if child.kind() == "object" {
            let mut pair_cursor = child.walk();
            for pair in child.named_children(&mut pair_cursor) {
                if pair.kind() == "pair" {
                    let key = pair.child_by_field_name("key").map(|n| node_text(n, source));
                    if key == Some(field) {
                        let value = pair.child_by_field_name("value")?;
                        return Some(
                            node_text(value, source)
                                .trim_matches(|c| c == '"' || c == '\'')
                                .to_string(),
                        );
                    }
                }
            }
        }
    }
    None
}

/// KafkaJS `consumer.subscribe({ topics: ["a", "b"] })` and amqplib
/// `channel.consume(queue, onMessage)`, one record per topic.
struct QueueSubscribeMatcher;

impl ClientMatcher for QueueSubscribeMatcher {
    fn name(&self) -> &'static str {
        "typescript.queue_subscribe"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call_expression" {
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
            "subscribe" => {
                let mut topics = Vec::new();
                let mut cursor = args.walk();
                for child in args.named_children(&mut cursor) {
                    if child.kind() == "object" {
                        let mut pair_cursor = child.walk();
                        for pair in child.named_children(&mut pair_cursor) {
                            if pair.kind() != "pair" {
                                continue;
                            }
                            let key = pair.child_by_field_name("key").map(|n| node_text(n, source));
                            if key == Some("topics") {
                                if let Some(value) = pair.child_by_field_name("value") {
                                    if value.kind() == "array" {
                                        let mut arr_cursor = value.walk();
                                        for item in value.named_children(&mut arr_cursor) {
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
                            } else if key == Some("topic") {
                                if let Some(value) = pair.child_by_field_name("value") {
                                    topics.push(
                                        node_text(value, source)
                                            .trim_matches(|c| c == '"' || c == '\'')
                                            .to_string(),
                                    );
                                }
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
            "consume" => first_string_arg(args, source)
                .into_iter()
                .filter_map(|queue| {
                    ServiceCall::new(
                        source_file,
                        line,
                        queue.text,
                        CallType::QueueSubscribe,
                        conduit_common::confidence::HIGH,
                        None,
                        None,
                    )
                    .ok()
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Express `app.get/post/put/delete/patch("/path", handler)`.
struct ExpressRouteMatcher;

impl ServerMatcher for ExpressRouteMatcher {
    fn name(&self) -> &'static str {
        "typescript.express_route"
    }

    fn match_node(
        &self,
        node: Node,
        source: &[u8],
        service: &str,
        handler_file: &str,
    ) -> Vec<RouteDefinition> {
        if node.kind() != "call_expression" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        let Some(method) = http_method_from_tail(callee_tail(callee)) else {
            return Vec::new();
        };
        let Some(args) = call_arguments(node) else {
            return Vec::new();
        };
        let Some(path_arg) = first_string_arg(args, source) else {
            return Vec::new();
        };
        let mut cursor = args.walk();
        let positional: Vec<Node> = args.named_children(&mut cursor).collect();
        let Some(handler_arg) = positional.get(1) else {
            return Vec::new();
        };
        let handler_function = node_text(*handler_arg, source)
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_string();
        if handler_function.is_empty() {
            return Vec::new();
        }
        let line_number = node.start_position().row as u32 + 1;
        vec![RouteDefinition {
            service: service.to_string(),
            method,
            path: normalize_path_pattern(&path_arg.text),
            handler_file: handler_file.to_string(),
            handler_function,
            line_number,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_lang::Language;
    use tree_sitter::Parser;

    fn parse(src: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&Language::TypeScript.grammar())
            .unwrap();
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
    fn express_get_route_extracted() {
        let src = "app.get(\"/api/users/:id\", getUser)";
        let tree = parse(src);
        let call = find_kind(tree.root_node(), "call_expression").unwrap();
        let routes =
            ExpressRouteMatcher.match_node(call, src.as_bytes(), "user-service", "routes.ts");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/api/users/{id}");
        assert_eq!(routes[0].handler_function, "getUser");
    }

    #[test]
    fn variable_url_yields_low_confidence() {
        let src = "function call() {\n  const url = \"http://user-service/api/users\";\n  axios.get(url);\n}";
        let tree = parse(src);
        let call = find_kind(tree.root_node(), "call_expression").unwrap();
        let calls = HttpClientMatcher.match_node(call, src.as_bytes(), "x.ts");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_service, "user-service");
        assert_eq!(calls[0].confidence, conduit_common::confidence::LOW);
    }

    #[test]
    fn fetch_with_post_method_option_extracted() {
        let src = "fetch(`http://order-service/api/orders/${orderId}`, { method: \"POST\" })";
        let tree = parse(src);
        let call = find_kind(tree.root_node(), "call_expression").unwrap();
        let calls = HttpClientMatcher.match_node(call, src.as_bytes(), "checkout.ts");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Some(HttpMethod::Post));
        assert_eq!(calls[0].target_service, "order-service");
    }
}
