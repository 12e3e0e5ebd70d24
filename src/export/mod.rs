//! Theme application and export
//!
//! Wraps rendered HTML in the themed root container. In export mode the
//! theme stylesheet is inlined into every element and the fragment goes
//! through the ordered rewrite steps that let it survive the publishing
//! platform's paste sanitizer.
//!
//! # Architecture
//!
//! - `options.rs` - Render modes and export options
//! - `css.rs` - Stylesheet and declaration parsing
//! - `dom.rs` - Helpers over the parsed DOM
//! - `inline.rs` - CSS inliner
//! - `rewrite.rs` - The export rewrite steps
//! - `html.rs` - Standalone HTML documents
//! - `clipboard.rs` - System clipboard strategies

pub mod clipboard;
pub mod css;
pub mod dom;
pub mod html;
pub mod inline;
pub mod options;
pub mod rewrite;

use log::{debug, warn};

pub use clipboard::{write_to_clipboard, ClipboardPolicy, ClipboardWriter, CopyOutcome};
pub use html::{export_to_html_file, generate_html_document, HtmlExportError};
pub use options::{ExportOptions, RenderMode};

use inline::Inliner;
use rewrite::{run_export_steps, RewriteContext};

// ─────────────────────────────────────────────────────────────────────────────
// Themed Output
// ─────────────────────────────────────────────────────────────────────────────

/// A rendered fragment wrapped in the root container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemedOutput {
    pub html: String,
    pub mode: RenderMode,
}

// ─────────────────────────────────────────────────────────────────────────────
// Theme Applicator
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps fragments and, for export, inlines and rewrites them.
#[derive(Debug, Clone, Default)]
pub struct ThemeApplicator {
    options: ExportOptions,
}

impl ThemeApplicator {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Wrap `html` for `mode`. `theme_css` is only consulted for export.
    pub fn apply(&self, html: &str, mode: RenderMode, theme_css: Option<&str>) -> ThemedOutput {
        let html = match mode {
            RenderMode::Preview => self.wrap_preview(html),
            RenderMode::Export => self.export(html, theme_css.unwrap_or("")),
        };
        ThemedOutput { html, mode }
    }

    fn wrap_preview(&self, html: &str) -> String {
        format!("<div id=\"{}\">{}</div>", self.options.root_id, html)
    }

    fn export(&self, html: &str, theme_css: &str) -> String {
        let document = dom::parse_fragment(html);
        let Ok(body) = document.select_first("body") else {
            warn!("Parsed fragment has no body; falling back to preview wrap");
            return self.wrap_preview(html);
        };

        // Built as a node so stray closing tags in raw HTML cannot end it early
        let root = dom::new_element("section", &[("id", &self.options.root_id)]);
        dom::wrap_children(body.as_node(), root.clone());

        let inliner = Inliner::new(theme_css);
        inliner.inline(&root);

        let ctx = RewriteContext {
            options: &self.options,
            custom_properties: inliner.custom_properties(),
        };
        run_export_steps(&root, &ctx);

        let out = dom::serialize(&root);
        debug!("Exported {} bytes of HTML", out.len());
        out
    }
}

/// Wrap `html` for preview, or run the full export pipeline when
/// `export_mode` is set.
pub fn apply_theme(html: &str, export_mode: bool, theme_css: Option<&str>) -> String {
    let mode = if export_mode {
        RenderMode::Export
    } else {
        RenderMode::Preview
    };
    ThemeApplicator::default().apply(html, mode, theme_css).html
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
