//! User settings for wemd
//!
//! This module defines the `Settings` struct that holds all user-configurable
//! options, with serde support for JSON persistence.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::export::{ClipboardPolicy, ExportOptions};
use crate::markdown::MarkdownOptions;
use crate::theme::DEFAULT_THEME_ID;

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted preferences.
///
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Theme id used when no theme is given on the command line
    pub default_theme: String,
    /// Directory with custom themes; `None` means `<config dir>/themes`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub themes_dir: Option<PathBuf>,
    /// Parser options
    pub markdown: MarkdownOptions,
    /// Export rewrite options
    pub export: ExportOptions,
    /// Whether the secondary clipboard strategy always runs
    pub clipboard_policy: ClipboardPolicy,
    /// Delay between the last change and a re-render in watch mode
    pub debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_theme: DEFAULT_THEME_ID.to_string(),
            themes_dir: None,
            markdown: MarkdownOptions::default(),
            export: ExportOptions::default(),
            clipboard_policy: ClipboardPolicy::default(),
            debounce_ms: Self::DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Default re-render delay.
    pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
    /// Minimum re-render delay.
    pub const MIN_DEBOUNCE_MS: u64 = 50;
    /// Maximum re-render delay.
    pub const MAX_DEBOUNCE_MS: u64 = 5000;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// This is useful after loading settings from a file that might have
    /// been manually edited with invalid values.
    pub fn sanitize(&mut self) {
        self.debounce_ms = self
            .debounce_ms
            .clamp(Self::MIN_DEBOUNCE_MS, Self::MAX_DEBOUNCE_MS);

        if self.default_theme.trim().is_empty() {
            self.default_theme = DEFAULT_THEME_ID.to_string();
        }

        if self.markdown.code_fallback_language.trim().is_empty() {
            self.markdown.code_fallback_language = MarkdownOptions::default().code_fallback_language;
        }

        self.export.sanitize();
    }

    /// Load settings and sanitize them to ensure validity.
    ///
    /// This is a convenience method that deserializes and then sanitizes.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.default_theme, "default");
        assert_eq!(settings.debounce_ms, 300);
        assert_eq!(settings.clipboard_policy, ClipboardPolicy::Supplement);
        assert_eq!(settings.export.root_id, "wemd");
        assert!(settings.themes_dir.is_none());
    }

    #[test]
    fn test_settings_serialization_roundtrip() {
        let mut settings = Settings::default();
        settings.themes_dir = Some(PathBuf::from("/tmp/themes"));
        settings.markdown.math_strict = true;
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, parsed);
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"default_theme": "academic-paper", "markdown": {"math": false}}"#)
                .unwrap();
        assert_eq!(settings.default_theme, "academic-paper");
        assert!(!settings.markdown.math);
        assert!(settings.markdown.tables);
        assert_eq!(settings.debounce_ms, Settings::DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn test_settings_deserialize_empty_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_clipboard_policy_serialization() {
        let settings: Settings = serde_json::from_str(r#"{"clipboard_policy": "fallback"}"#).unwrap();
        assert_eq!(settings.clipboard_policy, ClipboardPolicy::Fallback);
    }

    #[test]
    fn test_sanitize() {
        let mut settings = Settings {
            default_theme: " ".to_string(),
            debounce_ms: 1,
            ..Settings::default()
        };
        settings.markdown.code_fallback_language = String::new();
        settings.export.tab_width = 0;
        settings.sanitize();

        assert_eq!(settings.default_theme, DEFAULT_THEME_ID);
        assert_eq!(settings.debounce_ms, Settings::MIN_DEBOUNCE_MS);
        assert_eq!(settings.markdown.code_fallback_language, "bash");
        assert_eq!(settings.export.tab_width, 1);
    }

    #[test]
    fn test_from_json_sanitized() {
        let settings = Settings::from_json_sanitized(r#"{"debounce_ms": 999999}"#).unwrap();
        assert_eq!(settings.debounce_ms, Settings::MAX_DEBOUNCE_MS);
        assert!(Settings::from_json_sanitized("{ invalid").is_err());
    }
}
