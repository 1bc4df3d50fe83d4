use conduit_common::{CallType, HttpMethod, RouteDefinition, ServiceCall};
use tree_sitter::Node;

use crate::util::{
    call_arguments, callee_tail, callee_text, first_string_arg, http_method_from_tail, node_text,
    normalize_path_pattern, path_from_url, service_from_url,
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
    vec![Box::new(GinChiRouteMatcher)]
}

/// `http.Get(url)` / `http.Post(url, ...)` and `client.Do(req)` where `req`
/// was built from `http.NewRequest(method, url, ...)` a few lines earlier
/// in the same scope (§4.1 edge case: same-function-scope only).
struct HttpClientMatcher;

impl ClientMatcher for HttpClientMatcher {
    fn name(&self) -> &'static str {
        "go.http_client"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call_expression" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        let tail = callee_tail(callee);
        let line = node.start_position().row as u32 + 1;

        if let Some(method) = http_method_from_tail(tail) {
            let Some(args) = call_arguments(node) else {
                return Vec::new();
            };
            let Some(arg) = first_string_arg(args, source) else {
                return Vec::new();
            };
            let Some(service) = service_from_url(&arg.text) else {
                return Vec::new();
            };
            let path = path_from_url(&arg.text).unwrap_or_default();
            return match ServiceCall::new(
                source_file,
                line,
                service,
                CallType::Http,
                conduit_common::confidence::HIGH,
                Some(method),
                Some(path),
            ) {
                Ok(call) => vec![call],
                Err(_) => Vec::new(),
            };
        }

        if tail == "Do" {
            // `client.Do(req)`: the method lives on `req`, built earlier via
            // `http.NewRequest(method, url, body)`. Without a same-scope
            // def-use search over `req` we cannot resolve it here, so the
            // extractor's same-function-scope pass handles this by finding
            // the preceding `http.NewRequest` call in the enclosing block;
            // this matcher only recognizes the call site itself when no
            // such resolution is available, at LOW confidence with an
            // unknown method (§4.1 edge case).
            let Some(args) = call_arguments(node) else {
                return Vec::new();
            };
            let Some(req_ident) = args.named_child(0) else {
                return Vec::new();
            };
            if let Some(new_request) = find_new_request_in_scope(node, source, req_ident, source_file) {
                return new_request;
            }
        }
        Vec::new()
    }
}

/// Walks backward through the enclosing block looking for
/// `http.NewRequest(method, url, body)` assigned to the identifier `req`
/// used in `client.Do(req)`, per the same-AST-function-scope rule.
fn find_new_request_in_scope(
    do_call: Node,
    source: &[u8],
    req_ident: Node,
    source_file: &str,
) -> Option<Vec<ServiceCall>> {
    let req_name = node_text(req_ident, source);
    let mut scope = do_call.parent()?;
    while !matches!(scope.kind(), "function_declaration" | "func_literal" | "source_file") {
        scope = scope.parent()?;
    }
    let mut cursor = scope.walk();
    let mut found = None;
    visit_preorder(scope, &mut cursor, &mut |n| {
        if n.kind() == "call_expression" {
            if let Some(callee) = callee_text(n, source) {
                if callee_tail(callee) == "NewRequest" {
                    if let Some(assign) = n.parent().and_then(|p| p.parent()) {
                        if assign.kind() == "short_var_declaration" || assign.kind() == "assignment_statement" {
                            if let Some(lhs) = assign.child_by_field_name("left") {
                                if node_text(lhs, source).trim() == req_name {
                                    found = Some(n);
                                }
                            }
                        }
                    }
                }
            }
        }
    });
    let new_request = found?;
    let args = call_arguments(new_request)?;
    let mut cursor = args.walk();
    let positional: Vec<Node> = args.named_children(&mut cursor).collect();
    let method_text = positional.first().map(|n| node_text(*n, source))?;
    let method = HttpMethod::parse(method_text.trim_matches('"'));
    let url_arg = positional.get(1)?;
    let url_text = node_text(*url_arg, source).trim_matches('"');
    let service = service_from_url(url_text)?;
    let path = path_from_url(url_text).unwrap_or_default();
    let line = do_call.start_position().row as u32 + 1;
    ServiceCall::new(
        source_file,
        line,
        service,
        CallType::Http,
        conduit_common::confidence::LOW,
        Some(method),
        Some(path),
    )
    .ok()
    .map(|c| vec![c])
}

fn visit_preorder<'a>(node: Node<'a>, cursor: &mut tree_sitter::TreeCursor<'a>, f: &mut impl FnMut(Node<'a>)) {
    f(node);
    if cursor.goto_first_child() {
        loop {
            visit_preorder(cursor.node(), cursor, f);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}

/// `grpc.Dial("target:port", opts...)`.
struct GrpcClientMatcher;

impl ClientMatcher for GrpcClientMatcher {
    fn name(&self) -> &'static str {
        "go.grpc_client"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call_expression" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        if callee_tail(callee) != "Dial" {
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

/// Kafka `producer.SendMessage(msg)` is too indirect to resolve a topic
/// without data-flow; the supported idiom here is the common
/// `writer.WriteMessages(ctx, kafka.Message{Topic: "..."})` style, detected
/// via the first string literal argument carrying a topic-shaped value, and
/// `ch.Publish(exchange, routingKey, ...)` (amqp091-go).
struct QueuePublishMatcher;

impl ClientMatcher for QueuePublishMatcher {
    fn name(&self) -> &'static str {
        "go.queue_publish"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call_expression" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        if !matches!(callee_tail(callee), "Publish" | "PublishWithContext") {
            return Vec::new();
        }
        let Some(args) = call_arguments(node) else {
            return Vec::new();
        };
        let mut cursor = args.walk();
        let positional: Vec<Node> = args.named_children(&mut cursor).collect();
        // amqp091-go: Publish(exchange, routingKey, mandatory, immediate, msg)
        let routing_key_index = if callee_tail(callee) == "PublishWithContext" { 2 } else { 1 };
        let Some(routing_key_node) = positional.get(routing_key_index) else {
            return Vec::new();
        };
        if routing_key_node.kind() != "interpreted_string_literal" {
            return Vec::new();
        }
        let topic = node_text(*routing_key_node, source).trim_matches('"').to_string();
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

/// `ch.Consume(queueName, consumer, ...)`.
struct QueueSubscribeMatcher;

impl ClientMatcher for QueueSubscribeMatcher {
    fn name(&self) -> &'static str {
        "go.queue_subscribe"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "call_expression" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        if callee_tail(callee) != "Consume" {
            return Vec::new();
        }
        let Some(args) = call_arguments(node) else {
            return Vec::new();
        };
        let Some(queue) = first_string_arg(args, source) else {
            return Vec::new();
        };
        let line = node.start_position().row as u32 + 1;
        match ServiceCall::new(
            source_file,
            line,
            queue.text,
            CallType::QueueSubscribe,
            conduit_common::confidence::HIGH,
            None,
            None,
        ) {
            Ok(call) => vec![call],
            Err(_) => Vec::new(),
        }
    }
}

/// Gin `router.GET("/path", handler)` and Chi `r.Get("/path", handler)` —
/// same shape, case-differing method name.
struct GinChiRouteMatcher;

impl ServerMatcher for GinChiRouteMatcher {
    fn name(&self) -> &'static str {
        "go.gin_chi_route"
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
        parser.set_language(&Language::Go.grammar()).unwrap();
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
    fn gin_get_route_extracted() {
        let src = "router.GET(\"/api/users/:id\", handlers.GetUser)";
        let tree = parse(src);
        let call = find_kind(tree.root_node(), "call_expression").unwrap();
        let routes = GinChiRouteMatcher.match_node(call, src.as_bytes(), "user-service", "user-service/routes.go");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/api/users/{id}");
        assert_eq!(routes[0].handler_function, "GetUser");
        assert_eq!(routes[0].method, HttpMethod::Get);
    }

    #[test]
    fn http_get_call_extracted() {
        let src = "http.Get(\"http://user-service/api/users\")";
        let tree = parse(src);
        let call = find_kind(tree.root_node(), "call_expression").unwrap();
        let calls = HttpClientMatcher.match_node(call, src.as_bytes(), "client.go");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_service, "user-service");
    }
}
