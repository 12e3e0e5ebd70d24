use std::sync::OnceLock;

use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;
use regex::Regex;

use super::{AstPlugin, RenderContext};
use crate::error::Result;
use crate::markdown::ast::{self, Piece};
use crate::string_utils::escape_html;

/// Split every text node matched by `re`, mapping each match to raw HTML.
fn rewrite_text_nodes<'a, F>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>, re: &Regex, render: F)
where
    F: Fn(&regex::Captures) -> String,
{
    for node in ast::collect_nodes(root, |v| matches!(v, NodeValue::Text(_))) {
        let Some(text) = ast::text_of(node) else {
            continue;
        };
        if !re.is_match(&text) {
            continue;
        }

        let mut pieces = Vec::new();
        let mut last = 0;
        for caps in re.captures_iter(&text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            pieces.push(Piece::Text(text[last..whole.start()].to_string()));
            pieces.push(Piece::Html(render(&caps)));
            last = whole.end();
        }
        pieces.push(Piece::Text(text[last..].to_string()));
        ast::split_text_node(arena, node, pieces);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ruby
// ─────────────────────────────────────────────────────────────────────────────

/// Ruby annotations: `{漢字|かん.じ}`.
///
/// A dot-separated annotation is paired with the base one character at a
/// time when the counts match; otherwise the whole annotation sits over the
/// whole base.
pub struct Ruby;

fn ruby_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}|\n]+)\|([^{}\n]+)\}").expect("valid regex"))
}

fn render_ruby(base: &str, annotation: &str) -> String {
    let chars: Vec<char> = base.chars().collect();
    let parts: Vec<&str> = annotation.split('.').collect();

    let mut html = String::from("<ruby>");
    if parts.len() > 1 && parts.len() == chars.len() {
        for (ch, rt) in chars.iter().zip(parts) {
            html.push_str(&escape_html(&ch.to_string()));
            html.push_str(&format!("<rt>{}</rt>", escape_html(rt)));
        }
    } else {
        html.push_str(&escape_html(base));
        html.push_str(&format!("<rt>{}</rt>", escape_html(annotation)));
    }
    html.push_str("</ruby>");
    html
}

impl AstPlugin for Ruby {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        _ctx: &RenderContext<'_>,
    ) -> Result<()> {
        rewrite_text_nodes(arena, root, ruby_regex(), |caps| {
            render_ruby(&caps[1], &caps[2])
        });
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mark / Strike / Sub / Sup
// ─────────────────────────────────────────────────────────────────────────────

/// Inline marks comrak does not provide in this configuration:
/// `==mark==`, `~~strike~~`, `~sub~` and `^sup^`.
///
/// Paired delimiters may enclose other inline nodes (`==a *b* c==`), so they
/// are matched across the text children of one parent. A delimiter left
/// without a partner stays literal. Sub and sup take a single word.
pub struct InlineMarks;

const PAIRED_MARKS: [(&str, &str); 2] = [("==", "mark"), ("~~", "s")];

fn sub_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"~([^~\s]+)~").expect("valid regex"))
}

fn sup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\^([^\^\s]+)\^").expect("valid regex"))
}

/// A delimiter occurrence turned into its own node.
struct Marker<'a> {
    node: &'a AstNode<'a>,
    can_open: bool,
    can_close: bool,
}

/// Split a text node at every `delimiter`, returning the delimiter nodes.
///
/// A delimiter can open when not followed by whitespace and close when not
/// preceded by whitespace. Node edges count as non-whitespace.
fn split_at_delimiter<'a>(
    arena: &'a Arena<AstNode<'a>>,
    node: &'a AstNode<'a>,
    text: &str,
    delimiter: &str,
) -> Vec<Marker<'a>> {
    let parts: Vec<&str> = text.split(delimiter).collect();
    let mut flanks = Vec::new();
    let mut pieces = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            let before = parts[i - 1].chars().last();
            let after = part.chars().next();
            flanks.push((
                after.map_or(true, |c| !c.is_whitespace()),
                before.map_or(true, |c| !c.is_whitespace()),
            ));
            pieces.push(Piece::Html(delimiter.to_string()));
        }
        pieces.push(Piece::Text(part.to_string()));
    }

    ast::split_text_node(arena, node, pieces)
        .into_iter()
        .filter(|n| matches!(&n.data.borrow().value, NodeValue::HtmlInline(h) if h == delimiter))
        .zip(flanks)
        .map(|(node, (can_open, can_close))| Marker {
            node,
            can_open,
            can_close,
        })
        .collect()
}

fn pair_delimiters<'a>(
    arena: &'a Arena<AstNode<'a>>,
    root: &'a AstNode<'a>,
    delimiter: &str,
    tag: &str,
) {
    // Group text nodes by parent, in document order
    let mut groups: Vec<(&'a AstNode<'a>, Vec<&'a AstNode<'a>>)> = Vec::new();
    for node in ast::collect_nodes(root, |v| matches!(v, NodeValue::Text(t) if t.contains(delimiter))) {
        let Some(parent) = node.parent() else {
            continue;
        };
        match groups.iter_mut().find(|(p, _)| std::ptr::eq(*p, parent)) {
            Some((_, nodes)) => nodes.push(node),
            None => groups.push((parent, vec![node])),
        }
    }

    let literal = |node: &'a AstNode<'a>| ast::replace_node(node, ast::text(arena, delimiter));

    for (_, nodes) in groups {
        let mut markers = Vec::new();
        for node in nodes {
            if let Some(text) = ast::text_of(node) {
                markers.extend(split_at_delimiter(arena, node, &text, delimiter));
            }
        }

        let mut opener: Option<&'a AstNode<'a>> = None;
        for marker in markers {
            if let Some(open) = opener.filter(|_| marker.can_close) {
                open.data.borrow_mut().value = NodeValue::HtmlInline(format!("<{}>", tag));
                marker.node.data.borrow_mut().value = NodeValue::HtmlInline(format!("</{}>", tag));
                opener = None;
            } else if marker.can_open {
                if let Some(previous) = opener.replace(marker.node) {
                    literal(previous);
                }
            } else {
                literal(marker.node);
            }
        }
        if let Some(open) = opener {
            literal(open);
        }
    }
}

impl AstPlugin for InlineMarks {
    fn name(&self) -> &'static str {
        "inline-marks"
    }

    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        _ctx: &RenderContext<'_>,
    ) -> Result<()> {
        for (delimiter, tag) in PAIRED_MARKS {
            pair_delimiters(arena, root, delimiter, tag);
        }
        rewrite_text_nodes(arena, root, sub_regex(), |caps| {
            format!("<sub>{}</sub>", escape_html(&caps[1]))
        });
        rewrite_text_nodes(arena, root, sup_regex(), |caps| {
            format!("<sup>{}</sup>", escape_html(&caps[1]))
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_ruby_whole() {
        assert_eq!(render_ruby("漢字", "kanji"), "<ruby>漢字<rt>kanji</rt></ruby>");
    }

    #[test]
    fn test_render_ruby_per_character() {
        assert_eq!(
            render_ruby("漢字", "かん.じ"),
            "<ruby>漢<rt>かん</rt>字<rt>じ</rt></ruby>"
        );
    }

    #[test]
    fn test_sub_sup_patterns() {
        assert!(sub_regex().is_match("H~2~O"));
        assert!(!sub_regex().is_match("a ~ b ~ c"));
        assert!(sup_regex().is_match("29^th^"));
    }
}
