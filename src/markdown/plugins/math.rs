use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;

use super::{AstPlugin, RenderContext};
use crate::error::Result;
use crate::markdown::ast::{self, Piece};
use crate::markdown::math::{render_formula, MathExtraction};

/// Entity emitted for dollar signs left over after math extraction.
const LITERAL_DOLLAR: &str = "&#36;";

/// Swaps math placeholders for rendered formulas.
///
/// Placeholders that ended up in code, raw HTML, URLs or image alt text get
/// their original source back. Remaining literal `$` characters in text are
/// emitted as an entity so later stages never re-read them as delimiters.
pub struct MathExpansion;

impl AstPlugin for MathExpansion {
    fn name(&self) -> &'static str {
        "math"
    }

    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        ctx: &RenderContext<'_>,
    ) -> Result<()> {
        let math = &ctx.math;
        let strict = ctx.options.math_strict;

        restore_raw_contexts(root, math);

        // Display paragraphs first so block formulas become block elements
        for paragraph in ast::collect_nodes(root, |v| matches!(v, NodeValue::Paragraph)) {
            if let Some(index) = lone_block_placeholder(paragraph, math) {
                let span = &math.spans[index];
                let html = render_formula(&span.latex, true, strict)?;
                ast::replace_node(paragraph, ast::html_block(arena, html));
            }
        }

        for node in ast::collect_nodes(root, |v| matches!(v, NodeValue::Text(_))) {
            let Some(text) = ast::text_of(node) else {
                continue;
            };
            if ast::has_ancestor(node, |v| matches!(v, NodeValue::Image(_))) {
                let restored = math.restore(&text);
                if restored != text {
                    node.data.borrow_mut().value = NodeValue::Text(restored);
                }
                continue;
            }

            let matches = math.find_placeholders(&text);
            if matches.is_empty() && !text.contains('$') {
                continue;
            }

            let mut pieces = Vec::new();
            let mut last = 0;
            for m in matches {
                push_with_dollars(&mut pieces, &text[last..m.start]);
                let span = &math.spans[m.index];
                pieces.push(Piece::Html(render_formula(&span.latex, span.display, strict)?));
                last = m.end;
            }
            push_with_dollars(&mut pieces, &text[last..]);
            ast::split_text_node(arena, node, pieces);
        }

        Ok(())
    }
}

fn push_with_dollars(pieces: &mut Vec<Piece>, text: &str) {
    let mut parts = text.split('$');
    if let Some(first) = parts.next() {
        pieces.push(Piece::Text(first.to_string()));
    }
    for part in parts {
        pieces.push(Piece::Html(LITERAL_DOLLAR.to_string()));
        pieces.push(Piece::Text(part.to_string()));
    }
}

fn lone_block_placeholder<'a>(paragraph: &'a AstNode<'a>, math: &MathExtraction) -> Option<usize> {
    let mut children = paragraph.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }
    let text = ast::text_of(only)?;
    let trimmed = text.trim();
    let found = math.find_placeholders(trimmed);
    match found.as_slice() {
        [m] if m.display && m.start == 0 && m.end == trimmed.len() => Some(m.index),
        _ => None,
    }
}

fn restore_raw_contexts<'a>(root: &'a AstNode<'a>, math: &MathExtraction) {
    if math.spans.is_empty() {
        return;
    }
    for node in root.descendants() {
        let mut data = node.data.borrow_mut();
        match &mut data.value {
            NodeValue::CodeBlock(block) => block.literal = math.restore(&block.literal),
            NodeValue::Code(code) => code.literal = math.restore(&code.literal),
            NodeValue::HtmlBlock(html) => html.literal = math.restore(&html.literal),
            NodeValue::HtmlInline(html) => *html = math.restore(html),
            NodeValue::Link(link) | NodeValue::Image(link) => {
                link.url = math.restore(&link.url);
                link.title = math.restore(&link.title);
            }
            _ => {}
        }
    }
}
