use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;

use super::{AstPlugin, RenderContext};
use crate::error::Result;
use crate::markdown::ast;
use crate::string_utils::escape_html;

/// Heading levels listed in a table of contents.
const TOC_LEVELS: std::ops::RangeInclusive<u8> = 2..=3;

/// Replaces a `[toc]` paragraph with a nested list of the document's
/// level 2 and 3 headings.
///
/// Links carry an empty `href`: headings have no ids in the output and the
/// publishing platform drops in-page anchors anyway.
pub struct TableOfContents;

fn is_marker<'a>(paragraph: &'a AstNode<'a>) -> bool {
    let text: String = ast::collect_text(paragraph)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    text.eq_ignore_ascii_case("[toc]")
}

/// Render `(level, title)` entries as nested `<ul>` lists.
fn render_toc(entries: &[(u8, String)]) -> String {
    let mut html = String::from("<div class=\"table-of-contents\">");
    let Some(base) = entries.iter().map(|(level, _)| *level).min() else {
        html.push_str("</div>");
        return html;
    };

    let mut depth = 0usize;
    for (i, (level, title)) in entries.iter().enumerate() {
        let target = (level - base) as usize + 1;
        if i > 0 && target <= depth {
            html.push_str("</li>");
        }
        while depth < target {
            html.push_str("<ul>");
            depth += 1;
            if depth < target {
                html.push_str("<li>");
            }
        }
        while depth > target {
            html.push_str("</ul></li>");
            depth -= 1;
        }
        html.push_str(&format!("<li><a href=\"\">{}</a>", escape_html(title)));
    }
    html.push_str("</li>");
    while depth > 0 {
        html.push_str("</ul>");
        depth -= 1;
        if depth > 0 {
            html.push_str("</li>");
        }
    }
    html.push_str("</div>");
    html
}

impl AstPlugin for TableOfContents {
    fn name(&self) -> &'static str {
        "table-of-contents"
    }

    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        _ctx: &RenderContext<'_>,
    ) -> Result<()> {
        let markers: Vec<_> = ast::collect_nodes(root, |v| matches!(v, NodeValue::Paragraph))
            .into_iter()
            .filter(|p| is_marker(p))
            .collect();
        if markers.is_empty() {
            return Ok(());
        }

        let entries: Vec<(u8, String)> = ast::collect_nodes(root, |v| {
            matches!(v, NodeValue::Heading(h) if TOC_LEVELS.contains(&h.level))
        })
        .into_iter()
        .filter_map(|heading| match &heading.data.borrow().value {
            NodeValue::Heading(h) => Some((h.level, ast::collect_text(heading).trim().to_string())),
            _ => None,
        })
        .collect();

        let html = render_toc(&entries);
        for marker in markers {
            ast::replace_node(marker, ast::html_block(arena, html.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_toc_nested() {
        let entries = vec![
            (2, "One".to_string()),
            (3, "One.A".to_string()),
            (2, "Two".to_string()),
        ];
        assert_eq!(
            render_toc(&entries),
            "<div class=\"table-of-contents\"><ul><li><a href=\"\">One</a><ul><li><a href=\"\">One.A</a></li></ul></li><li><a href=\"\">Two</a></li></ul></div>"
        );
    }

    #[test]
    fn test_render_toc_empty() {
        assert_eq!(render_toc(&[]), "<div class=\"table-of-contents\"></div>");
    }
}
