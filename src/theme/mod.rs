//! Theme records and built-in themes
//!
//! A theme is plain CSS text keyed by id. Built-in themes are composed the
//! same way custom manifests are: a shared base stylesheet, the theme's own
//! file, and the code block stylesheet, joined by a blank line.
//!
//! # Theme Files
//!
//! - `basic.css` - Layout and typography shared by every theme
//! - `code-github.css` - Code block container styling
//! - `default.css`, `academic-paper.css` - Built-in theme bodies
//!
//! # Usage
//!
//! ```ignore
//! use wemd::theme::ThemeRegistry;
//!
//! let mut registry = ThemeRegistry::new();
//! registry.load_dir(Path::new("themes"))?;
//! let css = registry.css("default")?;
//! ```

pub mod manager;

pub use manager::ThemeRegistry;

use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Theme Record
// ─────────────────────────────────────────────────────────────────────────────

/// A named stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRecord {
    /// Lookup key, e.g. `"default"`
    pub id: String,
    /// Display name
    pub name: String,
    /// Complete CSS text
    pub css: String,
    /// Whether the theme ships with the crate
    pub builtin: bool,
}

impl ThemeRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            css: css.into(),
            builtin: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in Themes
// ─────────────────────────────────────────────────────────────────────────────

/// Id of the theme used when none is configured.
pub const DEFAULT_THEME_ID: &str = "default";

const BASIC_CSS: &str = include_str!("../../themes/basic.css");
const CODE_CSS: &str = include_str!("../../themes/code-github.css");

/// Shared stylesheet parts, addressable by file name from manifests.
pub const BASE_PARTS: &[(&str, &str)] = &[("basic.css", BASIC_CSS), ("code-github.css", CODE_CSS)];

const BUILTIN_BODIES: &[(&str, &str, &str)] = &[
    ("default", "Default", include_str!("../../themes/default.css")),
    (
        "academic-paper",
        "Academic Paper",
        include_str!("../../themes/academic-paper.css"),
    ),
];

/// Look up a shared part by file name.
pub fn base_part(file_name: &str) -> Option<&'static str> {
    BASE_PARTS
        .iter()
        .find(|(name, _)| *name == file_name)
        .map(|(_, css)| *css)
}

/// Join stylesheet parts with a blank line.
pub fn compose_css<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| p.as_ref().trim_end())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The built-in themes, in display order.
pub fn builtin_themes() -> &'static [ThemeRecord] {
    static THEMES: OnceLock<Vec<ThemeRecord>> = OnceLock::new();
    THEMES.get_or_init(|| {
        BUILTIN_BODIES
            .iter()
            .map(|(id, name, body)| ThemeRecord {
                id: id.to_string(),
                name: name.to_string(),
                css: compose_css(&[BASIC_CSS, *body, CODE_CSS]),
                builtin: true,
            })
            .collect()
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::css::parse_stylesheet;

    #[test]
    fn test_builtin_themes() {
        let themes = builtin_themes();
        assert_eq!(themes[0].id, DEFAULT_THEME_ID);
        assert!(themes.iter().all(|t| t.builtin));
        assert!(themes.iter().any(|t| t.id == "academic-paper"));
    }

    #[test]
    fn test_builtin_css_is_composed() {
        let css = &builtin_themes()[0].css;
        let basic = css.find("Base layout").unwrap();
        let body = css.find("Default: green accent").unwrap();
        let code = css.find("GitHub light").unwrap();
        assert!(basic < body && body < code);
        assert!(css.contains("}\n\n/* Default"));
    }

    #[test]
    fn test_builtin_css_parses() {
        for theme in builtin_themes() {
            let rules = parse_stylesheet(&theme.css);
            assert!(rules.len() > 20, "theme '{}' has too few rules", theme.id);
        }
    }

    #[test]
    fn test_compose_css() {
        assert_eq!(compose_css(&["a {}\n", "b {}"]), "a {}\n\nb {}");
    }

    #[test]
    fn test_base_part() {
        assert!(base_part("basic.css").is_some());
        assert!(base_part("missing.css").is_none());
    }
}
