use conduit_common::{CallType, HttpMethod, RouteDefinition, ServiceCall};
use tree_sitter::Node;

use crate::util::{
    call_arguments, callee_tail, callee_text, enclosing_scope, find_identifier_string_value,
    first_positional_arg, first_string_arg, node_text, normalize_path_pattern, path_from_url,
    service_from_url,
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
    vec![Box::new(AspNetAttributeRouteMatcher)]
}

fn method_from_async_tail(tail: &str) -> Option<HttpMethod> {
    let base = tail.strip_suffix("Async").unwrap_or(tail);
    match base {
        "Get" => Some(HttpMethod::Get),
        "Post" => Some(HttpMethod::Post),
        "Put" => Some(HttpMethod::Put),
        "Delete" => Some(HttpMethod::Delete),
        "Patch" => Some(HttpMethod::Patch),
        _ => None,
    }
}

/// `httpClient.GetAsync(url)` / `PostAsync(url, content)` / etc (`HttpClient`).
struct HttpClientMatcher;

impl ClientMatcher for HttpClientMatcher {
    fn name(&self) -> &'static str {
        "csharp.http_client"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "invocation_expression" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        let Some(method) = method_from_async_tail(callee_tail(callee)) else {
            return Vec::new();
        };
        let Some(args) = call_arguments(node) else {
            return Vec::new();
        };
        let line = node.start_position().row as u32 + 1;

        let (service, path, confidence) = match first_string_arg(args, source) {
            Some(arg) => {
                let Some(service) = service_from_url(&arg.text) else {
                    return Vec::new();
                };
                let path = path_from_url(&arg.text).unwrap_or_default();
                (service, path, conduit_common::confidence::HIGH)
            }
            None => {
                let Some(url) = resolve_url_from_variable(node, args, source) else {
                    return Vec::new();
                };
                let Some(service) = service_from_url(&url) else {
                    return Vec::new();
                };
                let path = path_from_url(&url).unwrap_or_default();
                (service, path, conduit_common::confidence::LOW)
            }
        };

        match ServiceCall::new(
            source_file,
            line,
            service,
            CallType::Http,
            confidence,
            Some(method),
            Some(path),
        ) {
            Ok(call) => vec![call],
            Err(_) => Vec::new(),
        }
    }
}

/// `var url = "http://service/path"` assigned earlier in the enclosing
/// method, then passed to the client call by name.
fn resolve_url_from_variable(call: Node, args: Node, source: &[u8]) -> Option<String> {
    let ident = first_positional_arg(args).filter(|n| n.kind() == "identifier")?;
    let name = node_text(ident, source);
    let scope = enclosing_scope(
        call,
        &[
            "method_declaration",
            "local_function_statement",
            "compilation_unit",
        ],
    )?;
    find_identifier_string_value(scope, source, name).map(|arg| arg.text)
}

/// `GrpcChannel.ForAddress("https://target-service")` / `new Channel("target:port", creds)`.
struct GrpcClientMatcher;

impl ClientMatcher for GrpcClientMatcher {
    fn name(&self) -> &'static str {
        "csharp.grpc_client"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        let (callee_tail_str, args) = if node.kind() == "invocation_expression" {
            let Some(callee) = callee_text(node, source) else {
                return Vec::new();
            };
            let Some(args) = call_arguments(node) else {
                return Vec::new();
            };
            (callee_tail(callee).to_string(), args)
        } else if node.kind() == "object_creation_expression" {
            let Some(ty) = node.child_by_field_name("type") else {
                return Vec::new();
            };
            let Some(args) = node.child_by_field_name("arguments") else {
                return Vec::new();
            };
            (node_text(ty, source).to_string(), args)
        } else {
            return Vec::new();
        };

        if !matches!(callee_tail_str.as_str(), "ForAddress" | "Channel") {
            return Vec::new();
        }
        let Some(target) = first_string_arg(args, source) else {
            return Vec::new();
        };
        let service = service_from_url(&target.text)
            .unwrap_or_else(|| target.text.split(':').next().unwrap_or(&target.text).to_string());
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

/// `channel.BasicPublish(exchange, routingKey, ...)`.
struct QueuePublishMatcher;

impl ClientMatcher for QueuePublishMatcher {
    fn name(&self) -> &'static str {
        "csharp.queue_publish"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "invocation_expression" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        if callee_tail(callee) != "BasicPublish" {
            return Vec::new();
        }
        let Some(args) = call_arguments(node) else {
            return Vec::new();
        };
        let mut cursor = args.walk();
        let positional: Vec<Node> = args.named_children(&mut cursor).collect();
        let Some(routing_key_node) = positional.get(1) else {
            return Vec::new();
        };
        if routing_key_node.kind() != "string_literal" {
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

/// `channel.BasicConsume(queue, autoAck, consumer)`.
struct QueueSubscribeMatcher;

impl ClientMatcher for QueueSubscribeMatcher {
    fn name(&self) -> &'static str {
        "csharp.queue_subscribe"
    }

    fn match_node(&self, node: Node, source: &[u8], source_file: &str) -> Vec<ServiceCall> {
        if node.kind() != "invocation_expression" {
            return Vec::new();
        }
        let Some(callee) = callee_text(node, source) else {
            return Vec::new();
        };
        if callee_tail(callee) != "BasicConsume" {
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

/// `[HttpGet("/api/users/{id}")]` attribute routing on a method declaration.
struct AspNetAttributeRouteMatcher;

impl ServerMatcher for AspNetAttributeRouteMatcher {
    fn name(&self) -> &'static str {
        "csharp.aspnet_attribute_route"
    }

    fn match_node(
        &self,
        node: Node,
        source: &[u8],
        service: &str,
        handler_file: &str,
    ) -> Vec<RouteDefinition> {
        if node.kind() != "attribute" {
            return Vec::new();
        }
        let Some(name_node) = node.child_by_field_name("name") else {
            return Vec::new();
        };
        let name = node_text(name_node, source);
        let method = match name {
            "HttpGet" => HttpMethod::Get,
            "HttpPost" => HttpMethod::Post,
            "HttpPut" => HttpMethod::Put,
            "HttpDelete" => HttpMethod::Delete,
            "HttpPatch" => HttpMethod::Patch,
            _ => return Vec::new(),
        };
        let Some(args) = node.child_by_field_name("arguments") else {
            return Vec::new();
        };
        let Some(path_arg) = first_string_arg(args, source) else {
            return Vec::new();
        };

        // attribute -> attribute_list -> method_declaration (sibling)
        let Some(attribute_list) = node.parent() else {
            return Vec::new();
        };
        let Some(method_decl) = attribute_list.next_sibling().filter(|n| n.kind() == "method_declaration") else {
            return Vec::new();
        };
        let Some(name_field) = method_decl.child_by_field_name("name") else {
            return Vec::new();
        };
        let handler_function = node_text(name_field, source).to_string();
        let line_number = method_decl.start_position().row as u32 + 1;

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
        parser.set_language(&Language::CSharp.grammar()).unwrap();
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
    fn http_get_async_extracted() {
        let src = "var r = await httpClient.GetAsync(\"http://user-service/api/users\");";
        let tree = parse(src);
        let call = find_kind(tree.root_node(), "invocation_expression").unwrap();
        let calls = HttpClientMatcher.match_node(call, src.as_bytes(), "Client.cs");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Some(HttpMethod::Get));
        assert_eq!(calls[0].target_service, "user-service");
    }

    #[test]
    fn variable_url_yields_low_confidence() {
        let src = "class C { async Task Call() {\n  var url = \"http://user-service/api/users\";\n  await httpClient.GetAsync(url);\n} }";
        let tree = parse(src);
        let call = find_kind(tree.root_node(), "invocation_expression").unwrap();
        let calls = HttpClientMatcher.match_node(call, src.as_bytes(), "Client.cs");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target_service, "user-service");
        assert_eq!(calls[0].confidence, conduit_common::confidence::LOW);
    }

    #[test]
    fn http_get_attribute_extracted() {
        let src = "class C { [HttpGet(\"/api/users/{id}\")]\npublic User GetUser(int id) { return null; } }";
        let tree = parse(src);
        let attribute = find_kind(tree.root_node(), "attribute").unwrap();
        let routes = AspNetAttributeRouteMatcher.match_node(
            attribute,
            src.as_bytes(),
            "user-service",
            "UserController.cs",
        );
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/api/users/{id}");
        assert_eq!(routes[0].handler_function, "GetUser");
    }
}
