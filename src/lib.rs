//! wemd - Markdown to WeChat-ready HTML
//!
//! Renders markdown into semantic HTML with a plugin chain, applies a CSS
//! theme either as a light preview wrapper or as fully inlined export HTML
//! that survives the publishing platform's paste sanitizer, and writes the
//! result to the system clipboard.
//!
//! # Example
//! ```ignore
//! use wemd::{RenderMode, SourceDocument};
//!
//! let doc = SourceDocument::new("# Hello\n\nWorld", theme_css);
//! let output = doc.render(RenderMode::Export)?;
//! let payload = output.clipboard_payload(&doc);
//! wemd::write_to_clipboard(&payload.html, &payload.plain_text)?;
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod markdown;
pub mod string_utils;
pub mod theme;
pub mod watch;

pub use error::{Error, Result};
pub use export::{apply_theme, write_to_clipboard, RenderMode, ThemeApplicator, ThemedOutput};
pub use markdown::{render_markdown, sync_footnotes, MarkdownParser};

// ─────────────────────────────────────────────────────────────────────────────
// Document Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Markdown source plus the theme stylesheet it is rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub markdown: String,
    pub theme_css: String,
}

/// Semantic HTML produced by the parser, before any theming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment {
    pub html: String,
}

/// What goes onto the clipboard: export HTML plus the markdown source as
/// the plain-text flavor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: String,
    pub plain_text: String,
}

impl SourceDocument {
    pub fn new(markdown: impl Into<String>, theme_css: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            theme_css: theme_css.into(),
        }
    }

    /// Drop dangling footnote references and definitions from the markdown.
    /// Returns whether anything was removed.
    pub fn sync_footnotes(&mut self) -> bool {
        let synced = sync_footnotes(&self.markdown);
        if synced.changed {
            self.markdown = synced.text;
        }
        synced.changed
    }

    /// Parse with `parser`, producing a fresh fragment.
    ///
    /// Footnotes are synchronized first, so a reference without a
    /// definition never reaches the output as literal `[^n]` text.
    pub fn fragment_with(&self, parser: &MarkdownParser) -> Result<RenderedFragment> {
        let synced = sync_footnotes(&self.markdown);
        Ok(RenderedFragment {
            html: parser.render(&synced.text)?,
        })
    }

    /// Parse and theme with explicit components.
    pub fn render_with(
        &self,
        parser: &MarkdownParser,
        applicator: &ThemeApplicator,
        mode: RenderMode,
    ) -> Result<ThemedOutput> {
        let fragment = self.fragment_with(parser)?;
        Ok(applicator.apply(&fragment.html, mode, Some(&self.theme_css)))
    }

    /// Parse and theme with default options.
    pub fn render(&self, mode: RenderMode) -> Result<ThemedOutput> {
        self.render_with(&markdown::create_parser(), &ThemeApplicator::default(), mode)
    }
}

impl ThemedOutput {
    /// Pair this output with the document's markdown for the clipboard.
    pub fn clipboard_payload(&self, source: &SourceDocument) -> ClipboardPayload {
        ClipboardPayload {
            html: self.html.clone(),
            plain_text: source.markdown.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSS: &str = "#wemd h2 { color: var(--c); } #wemd { --c: #123456; }";

    #[test]
    fn test_preview_render() {
        let doc = SourceDocument::new("## Title", CSS);
        let output = doc.render(RenderMode::Preview).unwrap();
        assert_eq!(output.mode, RenderMode::Preview);
        assert!(output.html.starts_with("<div id=\"wemd\">"));
        assert!(output.html.contains("<span class=\"content\">Title</span>"));
        assert!(!output.html.contains("style="));
    }

    #[test]
    fn test_export_render_and_payload() {
        let doc = SourceDocument::new("## Title", CSS);
        let output = doc.render(RenderMode::Export).unwrap();
        assert!(output.html.contains("color:#123456;"));
        assert!(!output.html.contains("var("));

        let payload = output.clipboard_payload(&doc);
        assert_eq!(payload.plain_text, "## Title");
        assert_eq!(payload.html, output.html);
    }

    #[test]
    fn test_render_is_deterministic() {
        let doc = SourceDocument::new("Text[^1] with $x^2$\n\n[^1]: note\n", CSS);
        let first = doc.render(RenderMode::Export).unwrap();
        let second = doc.render(RenderMode::Export).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_drops_undefined_footnote_reference() {
        let doc = SourceDocument::new("a[^2]", CSS);
        let output = doc.render(RenderMode::Preview).unwrap();
        assert!(!output.html.contains("[^2]"));
        assert!(output.html.contains(">a</p>"));
    }

    #[test]
    fn test_sync_footnotes_updates_markdown() {
        let mut doc = SourceDocument::new("a[^2] b[^1]

[^1]: one
[^3]: three
", CSS);
        assert!(doc.sync_footnotes());
        assert_eq!(doc.markdown, "a b[^1]

[^1]: one
");
        assert!(!doc.sync_footnotes());
    }

    #[test]
    fn test_strict_math_error_propagates() {
        let parser = MarkdownParser::new(markdown::MarkdownOptions {
            math_strict: true,
            ..Default::default()
        });
        let doc = SourceDocument::new("$\\frac{$", "");
        let result = doc.render_with(&parser, &ThemeApplicator::default(), RenderMode::Preview);
        assert!(matches!(result, Err(Error::Math { .. })));
    }
}
