//! Theme registry
//!
//! Holds the available themes keyed by id and the currently selected one.
//! Custom themes are loaded from a directory:
//!
//! ```text
//! themes/
//! ├── night.css          # id "night", CSS used as-is
//! └── magazine/
//!     ├── theme.toml     # name = "Magazine", files = ["basic.css", "magazine.css", "code-github.css"]
//!     └── magazine.css
//! ```
//!
//! Manifest file names are resolved inside the theme's directory first,
//! then against the shared built-in parts (`basic.css`, `code-github.css`).

use std::path::Path;

use log::{debug, info, warn};
use serde::Deserialize;
use walkdir::WalkDir;

use super::{base_part, builtin_themes, compose_css, ThemeRecord, DEFAULT_THEME_ID};
use crate::error::{Error, Result};

/// Manifest file name inside a theme directory.
pub const MANIFEST_FILE: &str = "theme.toml";

#[derive(Debug, Deserialize)]
struct ThemeManifest {
    #[serde(default)]
    id: Option<String>,
    name: String,
    files: Vec<String>,
}

/// Available themes and the current selection.
#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    themes: Vec<ThemeRecord>,
    current: String,
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeRegistry {
    /// Create a registry holding the built-in themes, with the default selected.
    pub fn new() -> Self {
        Self {
            themes: builtin_themes().to_vec(),
            current: DEFAULT_THEME_ID.to_string(),
        }
    }

    /// All themes, built-ins first, in insertion order.
    pub fn themes(&self) -> &[ThemeRecord] {
        &self.themes
    }

    /// Add a theme, replacing any theme with the same id.
    pub fn insert(&mut self, theme: ThemeRecord) {
        match self.themes.iter_mut().find(|t| t.id == theme.id) {
            Some(existing) => {
                info!("Theme '{}' overridden by custom theme", theme.id);
                *existing = theme;
            }
            None => self.themes.push(theme),
        }
    }

    /// Look up a theme by id.
    pub fn get(&self, id: &str) -> Result<&ThemeRecord> {
        self.themes
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::ThemeNotFound(id.to_string()))
    }

    /// CSS text of a theme.
    pub fn css(&self, id: &str) -> Result<&str> {
        self.get(id).map(|t| t.css.as_str())
    }

    /// Id of the selected theme.
    pub fn current_id(&self) -> &str {
        &self.current
    }

    /// The selected theme.
    pub fn current(&self) -> Result<&ThemeRecord> {
        self.get(&self.current)
    }

    /// Select a theme by id.
    pub fn set_current(&mut self, id: &str) -> Result<()> {
        self.get(id)?;
        if self.current != id {
            info!("Theme changed from '{}' to '{}'", self.current, id);
            self.current = id.to_string();
        }
        Ok(())
    }

    /// Load custom themes from `dir`. Returns how many were loaded.
    ///
    /// Broken manifests are skipped with a warning; a missing directory is
    /// not an error.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            debug!("Theme directory {} does not exist", dir.display());
            return Ok(0);
        }

        let mut loaded = 0;
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }

            let theme = if entry.depth() == 1
                && path.extension().and_then(|e| e.to_str()) == Some("css")
            {
                load_css_file(path)
            } else if entry.depth() == 2 && entry.file_name() == MANIFEST_FILE {
                load_manifest(path)
            } else {
                continue;
            };

            match theme {
                Ok(theme) => {
                    debug!("Loaded theme '{}' from {}", theme.id, path.display());
                    self.insert(theme);
                    loaded += 1;
                }
                Err(e) => warn!("Skipping theme at {}: {}", path.display(), e),
            }
        }

        info!("Loaded {} custom theme(s) from {}", loaded, dir.display());
        Ok(loaded)
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// A single `<id>.css` file.
fn load_css_file(path: &Path) -> Result<ThemeRecord> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::ThemeManifest {
            path: path.to_path_buf(),
            message: "file name is not valid UTF-8".to_string(),
        })?;
    let css = read_file(path)?;
    Ok(ThemeRecord::new(id, id, css))
}

/// A directory with a `theme.toml` manifest.
fn load_manifest(path: &Path) -> Result<ThemeRecord> {
    let manifest_error = |message: String| Error::ThemeManifest {
        path: path.to_path_buf(),
        message,
    };

    let content = read_file(path)?;
    let manifest: ThemeManifest =
        toml::from_str(&content).map_err(|e| manifest_error(e.to_string()))?;
    if manifest.files.is_empty() {
        return Err(manifest_error("no files listed".to_string()));
    }

    let dir = path
        .parent()
        .ok_or_else(|| manifest_error("manifest has no parent directory".to_string()))?;
    let id = match manifest.id {
        Some(id) => id,
        None => dir
            .file_name()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| manifest_error("directory name is not valid UTF-8".to_string()))?,
    };

    let mut parts = Vec::with_capacity(manifest.files.len());
    for file in &manifest.files {
        let local = dir.join(file);
        if local.is_file() {
            parts.push(read_file(&local)?);
        } else if let Some(css) = base_part(file) {
            parts.push(css.to_string());
        } else {
            return Err(manifest_error(format!("file '{}' not found", file)));
        }
    }

    Ok(ThemeRecord::new(id, manifest.name, compose_css(&parts)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
