//! Export Options and Configuration
//!
//! This module defines the render modes and the knobs of the export
//! rewrite pipeline.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Render Mode
// ─────────────────────────────────────────────────────────────────────────────

/// How a rendered fragment is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Lightweight wrapper for live preview; styles come from a page stylesheet
    #[default]
    Preview,
    /// Inlined, rewritten HTML ready for pasting into the publishing platform
    Export,
}

impl RenderMode {
    /// Get the display label for this mode.
    pub fn label(&self) -> &'static str {
        match self {
            RenderMode::Preview => "preview",
            RenderMode::Export => "export",
        }
    }

    /// Get all available modes.
    pub fn all() -> &'static [RenderMode] {
        &[RenderMode::Preview, RenderMode::Export]
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Export Options
// ─────────────────────────────────────────────────────────────────────────────

/// Default id of the root container; themes target `#wemd`.
pub const DEFAULT_ROOT_ID: &str = "wemd";

/// Provenance value the publishing platform expects on top-level blocks.
pub const DEFAULT_DATA_TOOL: &str = "mdnice编辑器";

/// Options for the theme applicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Id of the root container element
    pub root_id: String,
    /// Value of the `data-tool` attribute added to top-level blocks
    pub data_tool: String,
    /// Spaces per tab inside highlighted code
    pub tab_width: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            root_id: DEFAULT_ROOT_ID.to_string(),
            data_tool: DEFAULT_DATA_TOOL.to_string(),
            tab_width: 4,
        }
    }
}

impl ExportOptions {
    /// Create options with the default root id and provenance tag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the root container id.
    pub fn with_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = root_id.into();
        self
    }

    /// Builder method: set the `data-tool` value.
    pub fn with_data_tool(mut self, data_tool: impl Into<String>) -> Self {
        self.data_tool = data_tool.into();
        self
    }

    /// Builder method: set the tab width for code blocks.
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width;
        self
    }

    /// Clamp values to usable ranges.
    pub fn sanitize(&mut self) {
        self.tab_width = self.tab_width.clamp(1, 16);
        if self.root_id.trim().is_empty() {
            self.root_id = DEFAULT_ROOT_ID.to_string();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mode_default() {
        assert_eq!(RenderMode::default(), RenderMode::Preview);
        assert_eq!(RenderMode::all().len(), 2);
    }

    #[test]
    fn test_render_mode_serde() {
        let json = serde_json::to_string(&RenderMode::Export).unwrap();
        assert_eq!(json, "\"export\"");
        let mode: RenderMode = serde_json::from_str("\"preview\"").unwrap();
        assert_eq!(mode, RenderMode::Preview);
    }

    #[test]
    fn test_export_options_builder() {
        let options = ExportOptions::new()
            .with_root_id("nice")
            .with_data_tool("tool")
            .with_tab_width(2);
        assert_eq!(options.root_id, "nice");
        assert_eq!(options.data_tool, "tool");
        assert_eq!(options.tab_width, 2);
    }

    #[test]
    fn test_export_options_sanitize() {
        let mut options = ExportOptions::new().with_root_id("  ").with_tab_width(0);
        options.sanitize();
        assert_eq!(options.root_id, DEFAULT_ROOT_ID);
        assert_eq!(options.tab_width, 1);
    }

    #[test]
    fn test_export_options_partial_json() {
        let options: ExportOptions = serde_json::from_str(r#"{"tab_width": 8}"#).unwrap();
        assert_eq!(options.tab_width, 8);
        assert_eq!(options.data_tool, DEFAULT_DATA_TOOL);
    }
}
