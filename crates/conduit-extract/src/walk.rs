use tree_sitter::Node;

/// Lazy depth-first walk collecting every node whose kind is in `kinds`, in
/// stable traversal order (§4.2).
pub fn collect_nodes<'a>(root: Node<'a>, kinds: &[&str]) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    let mut cursor = root.walk();
    visit(root, &mut cursor, kinds, &mut out);
    out
}

fn visit<'a>(
    node: Node<'a>,
    cursor: &mut tree_sitter::TreeCursor<'a>,
    kinds: &[&str],
    out: &mut Vec<Node<'a>>,
) {
    if kinds.contains(&node.kind()) {
        out.push(node);
    }
    if cursor.goto_first_child() {
        loop {
            visit(cursor.node(), cursor, kinds, out);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}
