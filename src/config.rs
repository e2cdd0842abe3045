//! Project configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; the project's `config.toml` is a sparse overlay on top.
//!
//! ## Config File Location
//!
//! Place `config.toml` in the project root, next to the content directory:
//!
//! ```text
//! blog/
//! ├── config.toml              # Project config (overrides stock defaults)
//! └── src/content/
//!     ├── pages/
//!     ├── groups/
//!     └── series/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_root = "src/content"   # Content directory, relative to the project root
//!
//! [collections]
//! pages = "pages"                # Collection directories inside content_root
//! groups = "groups"
//! series = "series"
//!
//! [drafts]
//! mode = "production"            # "development" shows drafts, "production" hides them
//! # show_drafts = true           # Force draft visibility regardless of mode
//!
//! [schema]
//! default_color = "#3B82F6"      # Color for groups that don't set one
//! deny_unknown_fields = false    # Reject front-matter keys the schema doesn't know
//!
//! [processing]
//! max_processes = 4              # Max parallel validation workers (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::{DEFAULT_GROUP_COLOR, EntityKind};
use crate::visibility::{BuildMode, Visibility};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Content directory, relative to the project root.
    pub content_root: String,
    /// Collection directory names inside the content root.
    pub collections: CollectionsConfig,
    /// Draft visibility.
    pub drafts: DraftsConfig,
    /// Schema validation settings.
    pub schema: SchemaConfig,
    /// Parallel validation settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_root: "src/content".to_string(),
            collections: CollectionsConfig::default(),
            drafts: DraftsConfig::default(),
            schema: SchemaConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "content_root must not be empty".into(),
            ));
        }

        let dirs: Vec<&str> = EntityKind::ALL
            .iter()
            .map(|&kind| self.collections.dir(kind))
            .collect();
        for (i, dir) in dirs.iter().enumerate() {
            if dir.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "collections.{} must not be empty",
                    EntityKind::ALL[i].collection()
                )));
            }
            if Path::new(dir).is_absolute() || dir.split(['/', '\\']).any(|c| c == "..") {
                return Err(ConfigError::Validation(format!(
                    "collections.{} must stay inside content_root",
                    EntityKind::ALL[i].collection()
                )));
            }
            if dirs[..i].contains(dir) {
                return Err(ConfigError::Validation(format!(
                    "collections.{} reuses directory '{dir}'",
                    EntityKind::ALL[i].collection()
                )));
            }
        }

        if !is_hex_color(&self.schema.default_color) {
            return Err(ConfigError::Validation(
                "schema.default_color must be a hex color like #3B82F6".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Collection directory names, relative to the content root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionsConfig {
    pub pages: String,
    pub groups: String,
    pub series: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            pages: EntityKind::Page.collection().to_string(),
            groups: EntityKind::Group.collection().to_string(),
            series: EntityKind::Series.collection().to_string(),
        }
    }
}

impl CollectionsConfig {
    pub fn dir(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Page => &self.pages,
            EntityKind::Group => &self.groups,
            EntityKind::Series => &self.series,
        }
    }
}

/// Draft visibility settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DraftsConfig {
    /// Build mode; development shows drafts, production hides them.
    pub mode: BuildMode,
    /// Explicit override of the mode-derived default.
    pub show_drafts: Option<bool>,
}

impl DraftsConfig {
    /// Resolve the visibility for a build, letting `mode` (e.g. from the CLI)
    /// replace the configured one.
    pub fn visibility(&self, mode: Option<BuildMode>) -> Visibility {
        match self.show_drafts {
            Some(show) => Visibility::new(show),
            None => Visibility::for_mode(mode.unwrap_or(self.mode)),
        }
    }
}

/// Schema validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// Color given to groups that don't declare one.
    pub default_color: String,
    /// Reject front-matter keys the schema doesn't know.
    pub deny_unknown_fields: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            default_color: DEFAULT_GROUP_COLOR.to_string(),
            deny_unknown_fields: false,
        }
    }
}

/// Parallel validation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel validation workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given project directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# content-graph Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# Content directory, relative to the directory holding this file.
content_root = "src/content"

# ---------------------------------------------------------------------------
# Collections
# ---------------------------------------------------------------------------
[collections]
# Directory of each collection inside content_root.
# Files may be .md/.mdx (YAML `---` or TOML `+++` front matter)
# or whole-file data (.json, .yaml, .yml, .toml).
pages = "pages"
groups = "groups"
series = "series"

# ---------------------------------------------------------------------------
# Drafts
# ---------------------------------------------------------------------------
[drafts]
# "development" shows entries marked `draft: true`, "production" hides them.
# The --mode flag overrides this per run.
mode = "production"

# Force draft visibility regardless of mode.
# show_drafts = true

# ---------------------------------------------------------------------------
# Schema
# ---------------------------------------------------------------------------
[schema]
# Color for groups that don't declare one.
default_color = "#3B82F6"

# Reject front-matter keys the schema doesn't know (default: ignore them).
deny_unknown_fields = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel validation workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
