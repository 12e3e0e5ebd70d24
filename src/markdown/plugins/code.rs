use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;
use log::debug;

use super::{AstPlugin, RenderContext};
use crate::error::Result;
use crate::markdown::ast;
use crate::markdown::syntax::get_highlighter;
use crate::string_utils::escape_html;

/// Renders fenced code blocks.
///
/// The first word of the info string picks the language, with the
/// configured fallback when it is empty. Diagram fences are emitted as
/// `<pre class="mermaid">` for a client-side renderer; everything else is
/// highlighted into `<pre class="custom"><code class="hljs">`. Unknown
/// languages keep the same container with escaped text. Indented code blocks
/// are left to comrak.
pub struct CodeFence;

impl AstPlugin for CodeFence {
    fn name(&self) -> &'static str {
        "code-fence"
    }

    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        ctx: &RenderContext<'_>,
    ) -> Result<()> {
        let options = ctx.options;

        for node in ast::collect_nodes(root, |v| matches!(v, NodeValue::CodeBlock(b) if b.fenced)) {
            let (info, literal) = match &node.data.borrow().value {
                NodeValue::CodeBlock(block) => (block.info.clone(), block.literal.clone()),
                _ => continue,
            };

            let language = info
                .split_whitespace()
                .next()
                .unwrap_or(options.code_fallback_language.as_str())
                .to_string();

            let html = if language == options.diagram_language {
                format!("<pre class=\"{}\">\n{}\n</pre>", language, escape_html(&literal))
            } else {
                let body = get_highlighter()
                    .highlight_to_html(&literal, &language, &options.syntax_theme)
                    .unwrap_or_else(|| {
                        debug!("No syntax for '{}', emitting plain code", language);
                        escape_html(&literal)
                    });
                format!("<pre class=\"custom\"><code class=\"hljs\">{}</code></pre>", body)
            };

            ast::replace_node(node, ast::html_block(arena, html));
        }

        Ok(())
    }
}
