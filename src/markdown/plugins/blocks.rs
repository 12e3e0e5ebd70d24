use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;

use super::{AstPlugin, RenderContext};
use crate::error::Result;
use crate::markdown::ast;
use crate::string_utils::escape_html;

// ─────────────────────────────────────────────────────────────────────────────
// Table Container
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps every table in `<div class="table-container">` so themes can make
/// wide tables scroll horizontally.
pub struct TableContainer;

impl AstPlugin for TableContainer {
    fn name(&self) -> &'static str {
        "table-container"
    }

    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        _ctx: &RenderContext<'_>,
    ) -> Result<()> {
        for table in ast::collect_nodes(root, |v| matches!(v, NodeValue::Table(_))) {
            table.insert_before(ast::html_block(arena, "<div class=\"table-container\">"));
            table.insert_after(ast::html_block(arena, "</div>"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Multiquote
// ─────────────────────────────────────────────────────────────────────────────

/// Tags each outermost blockquote with `multiquote-N`, N being the deepest
/// blockquote nesting inside it (1 for a flat quote).
/// Depth is the maximum reached anywhere in the quote, not the count of `>`
/// markers on its first line.
pub struct Multiquote;

fn quote_depth<'a>(quote: &'a AstNode<'a>) -> usize {
    1 + quote.children().map(nested_quote_depth).max().unwrap_or(0)
}

// Quotes nested inside lists still count
fn nested_quote_depth<'a>(node: &'a AstNode<'a>) -> usize {
    if matches!(node.data.borrow().value, NodeValue::BlockQuote) {
        quote_depth(node)
    } else {
        node.children().map(nested_quote_depth).max().unwrap_or(0)
    }
}

impl AstPlugin for Multiquote {
    fn name(&self) -> &'static str {
        "multiquote"
    }

    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        _ctx: &RenderContext<'_>,
    ) -> Result<()> {
        let outermost: Vec<_> = ast::collect_nodes(root, |v| matches!(v, NodeValue::BlockQuote))
            .into_iter()
            .filter(|node| !ast::has_ancestor(node, |v| matches!(v, NodeValue::BlockQuote)))
            .collect();

        for quote in outermost {
            let depth = quote_depth(quote);
            let open = format!("<blockquote class=\"multiquote-{}\">", depth);
            ast::unwrap_into_raw(arena, quote, &open, "</blockquote>");
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Implicit Figures
// ─────────────────────────────────────────────────────────────────────────────

/// Turns a paragraph holding nothing but one image into a `<figure>` with
/// the alt text as caption.
pub struct ImplicitFigures;

fn lone_image<'a>(paragraph: &'a AstNode<'a>) -> Option<&'a AstNode<'a>> {
    let mut image = None;
    for child in paragraph.children() {
        match &child.data.borrow().value {
            NodeValue::Image(_) if image.is_none() => image = Some(child),
            NodeValue::Text(t) if t.trim().is_empty() => {}
            NodeValue::SoftBreak => {}
            _ => return None,
        }
    }
    image
}

impl AstPlugin for ImplicitFigures {
    fn name(&self) -> &'static str {
        "implicit-figures"
    }

    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        _ctx: &RenderContext<'_>,
    ) -> Result<()> {
        for paragraph in ast::collect_nodes(root, |v| matches!(v, NodeValue::Paragraph)) {
            let Some(image) = lone_image(paragraph) else {
                continue;
            };
            let (url, title) = match &image.data.borrow().value {
                NodeValue::Image(link) => (link.url.clone(), link.title.clone()),
                _ => continue,
            };
            let alt = escape_html(&ast::collect_text(image));

            let mut html = format!("<figure><img src=\"{}\" alt=\"{}\"", escape_html(&url), alt);
            if !title.is_empty() {
                html.push_str(&format!(" title=\"{}\"", escape_html(&title)));
            }
            html.push('>');
            if !alt.is_empty() {
                html.push_str(&format!("<figcaption>{}</figcaption>", alt));
            }
            html.push_str("</figure>");

            ast::replace_node(paragraph, ast::html_block(arena, html));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Heading Wrapper
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps heading content as
/// `<span class="prefix"></span><span class="content">…</span><span class="suffix"></span>`
/// so themes can decorate either side of a heading.
pub struct HeadingWrapper;

impl AstPlugin for HeadingWrapper {
    fn name(&self) -> &'static str {
        "heading-wrapper"
    }

    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        _ctx: &RenderContext<'_>,
    ) -> Result<()> {
        for heading in ast::collect_nodes(root, |v| matches!(v, NodeValue::Heading(_))) {
            heading.prepend(ast::html_inline(
                arena,
                "<span class=\"prefix\"></span><span class=\"content\">",
            ));
            heading.append(ast::html_inline(arena, "</span><span class=\"suffix\"></span>"));
        }
        Ok(())
    }
}
