use std::collections::BTreeMap;

use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;

use super::{AstPlugin, RenderContext};
use crate::error::Result;
use crate::markdown::ast;

/// Renders footnote references and the footnote list.
///
/// Footnotes are numbered by the order of their first reference. Each
/// reference becomes a `footnote-word` anchor inside `<sup>`; definitions
/// are collected into `<section class="footnotes">` in number order, each
/// item ending with a back-reference to its first use.
pub struct Footnotes;

impl AstPlugin for Footnotes {
    fn name(&self) -> &'static str {
        "footnotes"
    }

    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        _ctx: &RenderContext<'_>,
    ) -> Result<()> {
        let mut numbers: BTreeMap<String, usize> = BTreeMap::new();
        let mut uses: BTreeMap<String, usize> = BTreeMap::new();

        for node in ast::collect_nodes(root, |v| matches!(v, NodeValue::FootnoteReference(_))) {
            let name = match &node.data.borrow().value {
                NodeValue::FootnoteReference(reference) => reference.name.clone(),
                _ => continue,
            };
            let next = numbers.len() + 1;
            let number = *numbers.entry(name.clone()).or_insert(next);
            let count = uses.entry(name).or_insert(0);
            *count += 1;

            let anchor_id = if *count == 1 {
                format!("fnref-{}", number)
            } else {
                format!("fnref-{}-{}", number, count)
            };
            let html = format!(
                "<sup class=\"footnote-ref\"><a href=\"#fn-{n}\" id=\"{id}\" class=\"footnote-word\">[{n}]</a></sup>",
                n = number,
                id = anchor_id
            );
            ast::replace_node(node, ast::html_inline(arena, html));
        }

        let mut definitions: Vec<(usize, &'a AstNode<'a>)> = Vec::new();
        for node in ast::collect_nodes(root, |v| matches!(v, NodeValue::FootnoteDefinition(_))) {
            let name = match &node.data.borrow().value {
                NodeValue::FootnoteDefinition(definition) => definition.name.clone(),
                _ => continue,
            };
            // Unreferenced definitions are not rendered
            match numbers.get(&name) {
                Some(&number) => definitions.push((number, node)),
                None => node.detach(),
            }
        }

        let Some(&(_, first)) = definitions.first() else {
            return Ok(());
        };
        definitions.sort_by_key(|(number, _)| *number);

        let open = ast::html_block(arena, "<section class=\"footnotes\">\n<ol>");
        first.insert_before(open);
        let mut cursor = open;

        for (number, definition) in definitions {
            let item_open = ast::html_block(
                arena,
                format!("<li id=\"fn-{}\" class=\"footnote-item\">", number),
            );
            cursor.insert_after(item_open);
            cursor = item_open;

            let children: Vec<_> = definition.children().collect();
            for child in children {
                cursor.insert_after(child);
                cursor = child;
            }

            let backref = format!(
                " <a href=\"#fnref-{}\" class=\"footnote-backref\">\u{21a9}</a>",
                number
            );
            if matches!(cursor.data.borrow().value, NodeValue::Paragraph) {
                cursor.append(ast::html_inline(arena, backref));
            } else {
                let block = ast::html_block(arena, backref.trim_start().to_string());
                cursor.insert_after(block);
                cursor = block;
            }

            let item_close = ast::html_block(arena, "</li>");
            cursor.insert_after(item_close);
            cursor = item_close;

            definition.detach();
        }

        cursor.insert_after(ast::html_block(arena, "</ol>\n</section>"));
        Ok(())
    }
}
