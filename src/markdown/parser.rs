//! Markdown parser implementation using comrak
//!
//! This module wraps comrak's parsing functions with the plugin chain that
//! produces WeChat-oriented HTML. Every render builds its own arena, math
//! extraction and plugin chain, so identical input always yields identical
//! output.

use comrak::{format_html, nodes::AstNode, parse_document, Arena, Options};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::markdown::math::{self, MathExtraction};
use crate::markdown::plugins::{default_chain, AstPlugin, RenderContext};
use crate::markdown::syntax::DEFAULT_THEME;
use crate::string_utils::escape_html;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration options for markdown parsing and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    /// Enable GitHub Flavored Markdown tables
    pub tables: bool,
    /// Enable autolink URLs and emails
    pub autolink: bool,
    /// Enable task lists (- [ ] and - [x])
    pub tasklist: bool,
    /// Enable footnotes
    pub footnotes: bool,
    /// Enable description lists
    pub description_lists: bool,
    /// Enable emoji shortcodes (:smile:)
    pub emoji: bool,
    /// Typographic quotes and dashes
    pub smart_punctuation: bool,
    /// Pass raw HTML through
    pub allow_html: bool,
    /// Enable `$…$` and `$$…$$` math
    pub math: bool,
    /// Fail the render when a formula cannot be converted
    pub math_strict: bool,
    /// Language used for fences without an info string
    pub code_fallback_language: String,
    /// Fence language reserved for client-side diagrams
    pub diagram_language: String,
    /// syntect theme used for code highlighting
    pub syntax_theme: String,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            autolink: true,
            tasklist: true,
            footnotes: true,
            description_lists: true,
            emoji: true,
            smart_punctuation: true,
            allow_html: true,
            math: true,
            math_strict: false,
            code_fallback_language: "bash".to_string(),
            diagram_language: "mermaid".to_string(),
            syntax_theme: DEFAULT_THEME.to_string(),
        }
    }
}

impl MarkdownOptions {
    /// Convert to comrak Options.
    ///
    /// Strikethrough and superscript stay off: `~~`, `~` and `^` are handled
    /// by the inline marks plugin so single-tilde subscript works.
    fn to_comrak_options(&self) -> Options {
        let mut options = Options::default();

        // Extension options
        options.extension.table = self.tables;
        options.extension.autolink = self.autolink;
        options.extension.tasklist = self.tasklist;
        options.extension.footnotes = self.footnotes;
        options.extension.description_lists = self.description_lists;
        options.extension.shortcodes = self.emoji;

        // Parse options
        options.parse.smart = self.smart_punctuation;

        // Render options
        options.render.unsafe_ = self.allow_html;

        options
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────────────────────────────────────

/// Markdown to HTML renderer.
///
/// Holds only options; all per-document state lives inside [`render`](Self::render).
#[derive(Debug, Clone, Default)]
pub struct MarkdownParser {
    options: MarkdownOptions,
}

impl MarkdownParser {
    /// Create a parser with the given options.
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    /// The options this parser renders with.
    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Render markdown to an HTML fragment.
    ///
    /// Only fails when `math_strict` is set and a formula cannot be rendered.
    pub fn render(&self, markdown: &str) -> Result<String> {
        let extraction = if self.options.math {
            math::extract(markdown)
        } else {
            MathExtraction::passthrough(markdown)
        };
        debug!(
            "Rendering {} bytes of markdown ({} math spans)",
            markdown.len(),
            extraction.spans.len()
        );

        let arena = Arena::new();
        let comrak_options = self.options.to_comrak_options();
        let root = parse_document(&arena, &extraction.source, &comrak_options);

        let ctx = RenderContext {
            options: &self.options,
            math: extraction,
        };
        self.run_plugins(&arena, root, &ctx)?;

        let mut output = Vec::new();
        format_html(root, &comrak_options, &mut output)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    fn run_plugins<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        ctx: &RenderContext<'_>,
    ) -> Result<()> {
        for plugin in default_chain(&self.options) {
            debug!("Running plugin '{}'", plugin.name());
            plugin.run(arena, root, ctx)?;
        }
        Ok(())
    }
}

/// Create a fresh parser with default options.
pub fn create_parser() -> MarkdownParser {
    MarkdownParser::default()
}

/// Render markdown to HTML with default options.
///
/// Never fails: if rendering errors out, the escaped source is returned
/// inside a `<pre>` block.
pub fn render_markdown(markdown: &str) -> String {
    create_parser().render(markdown).unwrap_or_else(|e| {
        warn!("Markdown render failed: {}", e);
        format!("<pre>{}</pre>", escape_html(markdown))
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
