//! Syntax Highlighting Module
//!
//! This module integrates syntect for fenced code block highlighting.
//! Highlighted code is emitted as `<span style="color:…">` runs so the colors
//! survive CSS inlining and the destination editor without any class-based
//! stylesheet.
//!
//! # Example
//! ```ignore
//! use crate::markdown::syntax::get_highlighter;
//!
//! let html = get_highlighter().highlight_to_html("fn main() {}", "rust", "InspiredGitHub");
//! ```

use log::{debug, warn};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::string_utils::escape_html;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Default theme name from syntect's built-in themes (GitHub-like, light)
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Fallback theme if the specified theme is not found
pub const FALLBACK_THEME: &str = "base16-ocean.light";

// ─────────────────────────────────────────────────────────────────────────────
// Syntax Highlighter
// ─────────────────────────────────────────────────────────────────────────────

/// Syntax highlighter that caches syntect sets for performance.
///
/// The sets are immutable after loading, so sharing one instance across
/// renders does not leak state between them.
pub struct SyntaxHighlighter {
    /// Loaded syntax definitions
    syntax_set: SyntaxSet,
    /// Loaded color themes
    theme_set: ThemeSet,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxHighlighter {
    /// Create a new syntax highlighter with default syntax and theme sets.
    ///
    /// This loads the default syntaxes and themes bundled with syntect.
    /// The operation is relatively expensive, so the highlighter should be
    /// cached and reused.
    pub fn new() -> Self {
        debug!("Loading syntect syntax and theme sets");
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        debug!(
            "Loaded {} syntaxes and {} themes",
            syntax_set.syntaxes().len(),
            theme_set.themes.len()
        );
        Self {
            syntax_set,
            theme_set,
        }
    }

    /// Get a theme by name, falling back to the default if not found.
    pub fn get_theme(&self, name: &str) -> Option<&Theme> {
        self.theme_set
            .themes
            .get(name)
            .or_else(|| self.theme_set.themes.get(DEFAULT_THEME))
            .or_else(|| self.theme_set.themes.get(FALLBACK_THEME))
    }

    /// Highlight code into HTML spans with inline colors.
    ///
    /// Returns `None` when the language is not recognized, so the caller can
    /// fall back to escaped plain text. Lines that fail to highlight are
    /// emitted escaped.
    pub fn highlight_to_html(&self, code: &str, language: &str, theme_name: &str) -> Option<String> {
        let syntax = self.find_syntax_for_language(language)?;
        let theme = self.get_theme(theme_name)?;

        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut html = String::with_capacity(code.len() * 2);

        for line in LinesWithEndings::from(code) {
            let rendered = highlighter
                .highlight_line(line, &self.syntax_set)
                .and_then(|ranges| styled_line_to_highlighted_html(&ranges, IncludeBackground::No));
            match rendered {
                Ok(spans) => html.push_str(&spans),
                Err(e) => {
                    warn!("Failed to highlight line: {}", e);
                    html.push_str(&escape_html(line));
                }
            }
        }

        Some(html)
    }

    /// Find syntax definition for a language identifier.
    ///
    /// Tries multiple strategies:
    /// 1. By extension (e.g., "rs" -> Rust)
    /// 2. By token (e.g., "bash")
    /// 3. By name, case-insensitively
    fn find_syntax_for_language(&self, language: &str) -> Option<&SyntaxReference> {
        if language.is_empty() {
            return None;
        }

        let lang_lower = language.to_lowercase();

        // Map common language aliases to extensions
        let extension = match lang_lower.as_str() {
            "rust" | "rs" => "rs",
            "python" | "py" => "py",
            "javascript" | "js" => "js",
            "typescript" | "ts" => "ts",
            "c" => "c",
            "cpp" | "c++" | "cxx" => "cpp",
            "csharp" | "c#" | "cs" => "cs",
            "java" => "java",
            "go" | "golang" => "go",
            "ruby" | "rb" => "rb",
            "php" => "php",
            "scala" => "scala",
            "html" | "htm" => "html",
            "css" => "css",
            "json" => "json",
            "yaml" | "yml" => "yaml",
            "xml" => "xml",
            "markdown" | "md" => "md",
            "sql" => "sql",
            "shell" | "sh" | "bash" | "zsh" => "sh",
            "makefile" | "make" => "Makefile",
            "lua" => "lua",
            "perl" | "pl" => "pl",
            "r" => "r",
            "haskell" | "hs" => "hs",
            "erlang" | "erl" => "erl",
            "clojure" | "clj" => "clj",
            "diff" | "patch" => "diff",
            other => other,
        };

        if let Some(syntax) = self.syntax_set.find_syntax_by_extension(extension) {
            return Some(syntax);
        }

        if let Some(syntax) = self.syntax_set.find_syntax_by_token(&lang_lower) {
            return Some(syntax);
        }

        self.syntax_set
            .syntaxes()
            .iter()
            .find(|&syntax| syntax.name.to_lowercase() == lang_lower)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Highlighter Instance
// ─────────────────────────────────────────────────────────────────────────────

use std::sync::OnceLock;

/// Global syntax highlighter instance.
///
/// Lazily initialized on first access and reused for all highlighting
/// operations, avoiding the cost of loading syntax and theme sets per render.
static HIGHLIGHTER: OnceLock<SyntaxHighlighter> = OnceLock::new();

/// Get or create the global syntax highlighter.
pub fn get_highlighter() -> &'static SyntaxHighlighter {
    HIGHLIGHTER.get_or_init(SyntaxHighlighter::new)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_theme_falls_back() {
        assert!(get_highlighter().get_theme("no-such-theme").is_some());
    }

    #[test]
    fn test_highlight_rust_code() {
        let html = get_highlighter()
            .highlight_to_html("fn main() {}\n", "rust", DEFAULT_THEME)
            .unwrap();
        assert!(html.contains("<span style=\""));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_highlight_escapes_markup() {
        let html = get_highlighter()
            .highlight_to_html("echo \"<b>\"\n", "bash", DEFAULT_THEME)
            .unwrap();
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_unknown_language_returns_none() {
        assert!(get_highlighter()
            .highlight_to_html("x", "unknownlang123", DEFAULT_THEME)
            .is_none());
        assert!(get_highlighter().find_syntax_for_language("").is_none());
    }

    #[test]
    fn test_language_aliases() {
        let highlighter = get_highlighter();
        for (alias, canonical) in [("rs", "rust"), ("py", "python"), ("sh", "bash")] {
            let a = highlighter.find_syntax_for_language(alias).map(|s| &s.name);
            let b = highlighter.find_syntax_for_language(canonical).map(|s| &s.name);
            assert_eq!(a, b, "alias {} should match {}", alias, canonical);
        }
    }

    #[test]
    fn test_global_highlighter_is_shared() {
        let h1 = get_highlighter();
        let h2 = get_highlighter();
        assert!(std::ptr::eq(h1, h2));
    }
}
