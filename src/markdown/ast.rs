//! AST operations shared by the parser plugins
//!
//! comrak has no extension hooks for custom node kinds, so plugins express
//! their output as raw HTML nodes spliced into the tree: a container is
//! "unwrapped" into `open` + children + `close`, and text nodes are split
//! into alternating text and inline-HTML pieces.

use comrak::arena_tree::Node;
use comrak::nodes::{Ast, AstNode, LineColumn, NodeHtmlBlock, NodeValue};
use comrak::Arena;
use std::cell::RefCell;

/// A piece of a split text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// Plain text, escaped by the renderer
    Text(String),
    /// Raw inline HTML, emitted verbatim
    Html(String),
}

/// Allocate a detached node in the arena.
pub fn new_node<'a>(arena: &'a Arena<AstNode<'a>>, value: NodeValue) -> &'a AstNode<'a> {
    let start = LineColumn { line: 0, column: 0 };
    arena.alloc(Node::new(RefCell::new(Ast::new(value, start))))
}

/// Allocate a raw inline HTML node.
pub fn html_inline<'a>(arena: &'a Arena<AstNode<'a>>, html: impl Into<String>) -> &'a AstNode<'a> {
    new_node(arena, NodeValue::HtmlInline(html.into()))
}

/// Allocate a raw block HTML node. A trailing newline is added when missing.
pub fn html_block<'a>(arena: &'a Arena<AstNode<'a>>, html: impl Into<String>) -> &'a AstNode<'a> {
    let mut literal = html.into();
    if !literal.ends_with('\n') {
        literal.push('\n');
    }
    new_node(
        arena,
        NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal,
        }),
    )
}

/// Allocate a text node.
pub fn text<'a>(arena: &'a Arena<AstNode<'a>>, content: impl Into<String>) -> &'a AstNode<'a> {
    new_node(arena, NodeValue::Text(content.into()))
}

/// All nodes below `root` (inclusive) matching `pred`, in document order.
///
/// Collected up front so callers can restructure the tree while iterating.
pub fn collect_nodes<'a, F>(root: &'a AstNode<'a>, pred: F) -> Vec<&'a AstNode<'a>>
where
    F: Fn(&NodeValue) -> bool,
{
    root.descendants()
        .filter(|node| pred(&node.data.borrow().value))
        .collect()
}

/// Get all text content from a node and its descendants.
pub fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut output = String::new();
    for descendant in node.descendants() {
        match &descendant.data.borrow().value {
            NodeValue::Text(t) => output.push_str(t),
            NodeValue::Code(code) => output.push_str(&code.literal),
            NodeValue::SoftBreak => output.push(' '),
            NodeValue::LineBreak => output.push('\n'),
            _ => {}
        }
    }
    output
}

/// Replace `node` by raw `open`, its former children, then raw `close`.
///
/// Works for block containers (blockquotes, footnote definitions) whose
/// rendered tag needs attributes comrak cannot express.
pub fn unwrap_into_raw<'a>(
    arena: &'a Arena<AstNode<'a>>,
    node: &'a AstNode<'a>,
    open: &str,
    close: &str,
) {
    let open_node = html_block(arena, open);
    node.insert_before(open_node);

    let mut cursor = open_node;
    let children: Vec<_> = node.children().collect();
    for child in children {
        cursor.insert_after(child);
        cursor = child;
    }

    cursor.insert_after(html_block(arena, close));
    node.detach();
}

/// Replace `node` with `replacement` at the same position.
pub fn replace_node<'a>(node: &'a AstNode<'a>, replacement: &'a AstNode<'a>) {
    node.insert_before(replacement);
    node.detach();
}

/// Replace a text node with a sequence of text and inline HTML pieces.
///
/// Returns the inserted nodes in order.
pub fn split_text_node<'a>(
    arena: &'a Arena<AstNode<'a>>,
    node: &'a AstNode<'a>,
    pieces: Vec<Piece>,
) -> Vec<&'a AstNode<'a>> {
    let mut inserted = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let new = match piece {
            Piece::Text(s) if s.is_empty() => continue,
            Piece::Text(s) => text(arena, s),
            Piece::Html(s) => html_inline(arena, s),
        };
        node.insert_before(new);
        inserted.push(new);
    }
    node.detach();
    inserted
}

/// Text of a node if it is a `Text` node.
pub fn text_of<'a>(node: &'a AstNode<'a>) -> Option<String> {
    match &node.data.borrow().value {
        NodeValue::Text(t) => Some(t.clone()),
        _ => None,
    }
}

/// Whether any ancestor (exclusive) satisfies `pred`.
pub fn has_ancestor<'a, F>(node: &'a AstNode<'a>, pred: F) -> bool
where
    F: Fn(&NodeValue) -> bool,
{
    let mut current = node.parent();
    while let Some(parent) = current {
        if pred(&parent.data.borrow().value) {
            return true;
        }
        current = parent.parent();
    }
    false
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use comrak::{format_html, parse_document, Options};

    fn render<'a>(root: &'a AstNode<'a>) -> String {
        let mut out = Vec::new();
        let mut options = Options::default();
        options.render.unsafe_ = true;
        format_html(root, &options, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_collect_text() {
        let arena = Arena::new();
        let root = parse_document(&arena, "Hello *big* `code`", &Options::default());
        assert_eq!(collect_text(root), "Hello big code");
    }

    #[test]
    fn test_unwrap_into_raw_keeps_children() {
        let arena = Arena::new();
        let root = parse_document(&arena, "> quoted", &Options::default());
        let quote = collect_nodes(root, |v| matches!(v, NodeValue::BlockQuote))[0];
        unwrap_into_raw(&arena, quote, "<blockquote class=\"x\">", "</blockquote>");

        let html = render(root);
        assert!(html.contains("<blockquote class=\"x\">"));
        assert!(html.contains("<p>quoted</p>"));
        assert!(html.trim_end().ends_with("</blockquote>"));
    }

    #[test]
    fn test_split_text_node() {
        let arena = Arena::new();
        let root = parse_document(&arena, "a-b", &Options::default());
        let node = collect_nodes(root, |v| matches!(v, NodeValue::Text(_)))[0];
        let inserted = split_text_node(
            &arena,
            node,
            vec![
                Piece::Text("a".into()),
                Piece::Html("<br>".into()),
                Piece::Text(String::new()),
                Piece::Text("b".into()),
            ],
        );
        assert_eq!(inserted.len(), 3);
        assert_eq!(render(root), "<p>a<br>b</p>\n");
    }

    #[test]
    fn test_has_ancestor() {
        let arena = Arena::new();
        let root = parse_document(&arena, "> *x*", &Options::default());
        let node = collect_nodes(root, |v| matches!(v, NodeValue::Text(_)))[0];
        assert!(has_ancestor(node, |v| matches!(v, NodeValue::BlockQuote)));
        assert!(!has_ancestor(node, |v| matches!(v, NodeValue::Table(_))));
    }
}
