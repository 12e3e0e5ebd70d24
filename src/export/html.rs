//! Standalone HTML Document Generation
//!
//! Wraps a themed fragment in a complete HTML page for viewing in a browser.
//! Preview fragments carry the theme stylesheet in a `<style>` block; export
//! fragments already have every style inlined and need none.

use std::path::Path;

use log::info;

use super::options::RenderMode;
use super::{ThemeApplicator, ThemedOutput};
use crate::markdown::MarkdownParser;
use crate::string_utils::escape_html;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during HTML export.
#[derive(Debug)]
pub enum HtmlExportError {
    /// Failed to read source file or write output
    IoError(std::io::Error),
    /// Failed to convert markdown
    ConversionError(String),
}

impl std::fmt::Display for HtmlExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HtmlExportError::IoError(e) => write!(f, "IO error: {}", e),
            HtmlExportError::ConversionError(msg) => write!(f, "Conversion error: {}", msg),
        }
    }
}

impl std::error::Error for HtmlExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HtmlExportError::IoError(e) => Some(e),
            HtmlExportError::ConversionError(_) => None,
        }
    }
}

impl From<std::io::Error> for HtmlExportError {
    fn from(err: std::io::Error) -> Self {
        HtmlExportError::IoError(err)
    }
}

impl From<crate::error::Error> for HtmlExportError {
    fn from(err: crate::error::Error) -> Self {
        HtmlExportError::ConversionError(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Generation
// ─────────────────────────────────────────────────────────────────────────────

/// Page layout around the root container; never part of copied output.
const PAGE_CSS: &str = r#"body {
    margin: 0;
    padding: 0;
    background: #f5f5f5;
}

.wemd-page {
    max-width: 677px;
    margin: 0 auto;
    padding: 24px 16px;
    background: #fff;
}"#;

/// Generate a complete HTML document around a themed fragment.
///
/// # Arguments
///
/// * `output` - Themed fragment from the theme applicator
/// * `title` - Optional document title
/// * `theme_css` - Stylesheet for preview fragments; ignored for export
pub fn generate_html_document(
    output: &ThemedOutput,
    title: Option<&str>,
    theme_css: Option<&str>,
) -> String {
    let theme_css = match output.mode {
        RenderMode::Preview => theme_css.unwrap_or(""),
        RenderMode::Export => "",
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="wemd">
    <title>{title}</title>
    <style>
{page_css}

{theme_css}
    </style>
</head>
<body>
    <div class="wemd-page">
{body}
    </div>
</body>
</html>"#,
        title = escape_html(title.unwrap_or("Exported Document")),
        page_css = PAGE_CSS,
        theme_css = theme_css,
        body = output.html,
    )
}

/// Render a markdown file to a standalone HTML file.
///
/// The document title is the file stem of `source_path`.
pub fn export_to_html_file(
    source_path: &Path,
    output_path: &Path,
    parser: &MarkdownParser,
    applicator: &ThemeApplicator,
    mode: RenderMode,
    theme_css: &str,
) -> Result<(), HtmlExportError> {
    let markdown = std::fs::read_to_string(source_path)?;

    let title = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Document");

    let fragment = parser.render(&markdown)?;
    let output = applicator.apply(&fragment, mode, Some(theme_css));
    let html = generate_html_document(&output, Some(title), Some(theme_css));

    std::fs::write(output_path, html)?;
    info!("Exported {} to {}", source_path.display(), output_path.display());

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
