//! Build configuration module.
//!
//! Handles loading, validating, and merging the `logux-site.toml` file. The
//! stock defaults describe the Logux documentation site; a user file only
//! needs to name the values it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! docs_dir = "docs"           # Markdown sources
//! output_dir = "dist"         # Generated site
//! assets_dir = "assets"       # Relative to docs_dir, copied to the output root
//! readme = "README.md"        # Raw <img> markup is stripped from this file
//! edit_url_base = "https://github.com/logux/docs/edit/main/"
//! ignore = ["node_modules"]   # Directory names skipped while globbing **/*.md
//! stylesheets = ["/style.css"]
//!
//! [highlight]
//! prefix = "code-block_"      # Class prefix for highlighted spans
//!
//! [worker]
//! cache_version = "1"         # Cache namespace; bump to orphan the old cache
//! from_header = "service-worker@logux.io"
//! script_name = "sw.js"
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default name of the config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "logux-site.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site build configuration loaded from `logux-site.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory holding the markdown sources.
    pub docs_dir: String,
    /// Directory the generated site is written to.
    pub output_dir: String,
    /// Static assets directory, relative to `docs_dir`.
    pub assets_dir: String,
    /// Path (relative to `docs_dir`) of the project readme.
    pub readme: String,
    /// Prefix of the "edit this page" link; the document path is appended.
    pub edit_url_base: String,
    /// Directory names skipped while discovering markdown files.
    pub ignore: Vec<String>,
    /// Stylesheets linked from every generated page.
    pub stylesheets: Vec<String>,
    /// Code highlighting settings.
    pub highlight: HighlightConfig,
    /// Offline cache worker settings.
    pub worker: WorkerSettings,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            docs_dir: "docs".to_string(),
            output_dir: "dist".to_string(),
            assets_dir: "assets".to_string(),
            readme: "README.md".to_string(),
            edit_url_base: "https://github.com/logux/docs/edit/main/".to_string(),
            ignore: vec!["node_modules".to_string()],
            stylesheets: vec!["/style.css".to_string()],
            highlight: HighlightConfig::default(),
            worker: WorkerSettings::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker.cache_version.trim().is_empty() {
            return Err(ConfigError::Validation(
                "worker.cache_version must not be empty".into(),
            ));
        }
        if self.worker.script_name.is_empty() || self.worker.script_name.contains('/') {
            return Err(ConfigError::Validation(
                "worker.script_name must be a plain file name".into(),
            ));
        }
        if self.edit_url_base.is_empty() {
            return Err(ConfigError::Validation(
                "edit_url_base must not be empty".into(),
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

/// Code highlighting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    /// Class prefix for every highlighted span (`code-block_keyword`, ...).
    pub prefix: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            prefix: "code-block_".to_string(),
        }
    }
}

/// Offline cache worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerSettings {
    /// Name of the cache namespace the worker opens.
    pub cache_version: String,
    /// Value of the `From` header attached to precache requests.
    pub from_header: String,
    /// File name of the generated worker script in the output root.
    pub script_name: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            cache_version: "1".to_string(),
            from_header: "service-worker@logux.io".to_string(),
            script_name: "sw.js".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel file workers.
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
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
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

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
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

/// Load config from the given file, falling back to stock defaults when the
/// file is absent.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `logux-site.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# logux-site configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory with the markdown sources.
docs_dir = "docs"

# Directory the generated site is written to.
output_dir = "dist"

# Static assets (stylesheets, fonts, images), relative to docs_dir.
# Copied to the root of output_dir before styles are repacked.
assets_dir = "assets"

# Raw <img> markup is removed from this file (badges, logos).
readme = "README.md"

# "Edit this page" link prefix; the document path is appended.
edit_url_base = "https://github.com/logux/docs/edit/main/"

# Directory names skipped while globbing **/*.md.
ignore = ["node_modules"]

# Stylesheets linked from every generated page.
stylesheets = ["/style.css"]

# ---------------------------------------------------------------------------
# Code highlighting
# ---------------------------------------------------------------------------
[highlight]
# Class prefix for highlighted spans: code-block_keyword, code-block_string...
prefix = "code-block_"

# ---------------------------------------------------------------------------
# Offline cache worker
# ---------------------------------------------------------------------------
[worker]
# Cache namespace. Bumping it orphans every entry of the previous cache.
cache_version = "1"

# Value of the From header sent with precache requests.
from_header = "service-worker@logux.io"

# File name of the generated worker script in the output root.
script_name = "sw.js"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_describes_logux_docs() {
        let config = SiteConfig::default();
        assert_eq!(config.docs_dir, "docs");
        assert_eq!(config.readme, "README.md");
        assert_eq!(
            config.edit_url_base,
            "https://github.com/logux/docs/edit/main/"
        );
        assert_eq!(config.ignore, vec!["node_modules"]);
    }

    #[test]
    fn default_worker_settings() {
        let config = SiteConfig::default();
        assert_eq!(config.worker.cache_version, "1");
        assert_eq!(config.worker.from_header, "service-worker@logux.io");
        assert_eq!(config.worker.script_name, "sw.js");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[worker]
cache_version = "2"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.worker.cache_version, "2");
        // Sibling keys keep their defaults
        assert_eq!(config.worker.from_header, "service-worker@logux.io");
        assert_eq!(config.highlight.prefix, "code-block_");
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config.output_dir, "dist");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"
docs_dir = "guides"
ignore = ["node_modules", "drafts"]

[highlight]
prefix = "hl-"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.docs_dir, "guides");
        assert_eq!(config.ignore, vec!["node_modules", "drafts"]);
        assert_eq!(config.highlight.prefix, "hl-");
        assert_eq!(config.output_dir, "dist");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("doc_dir = \"docs\"");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[worker]\nversion = \"2\"");
        assert!(result.is_err());
    }

    // =========================================================================
    // Processing config
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(cores + 64),
        };
        assert_eq!(effective_threads(&config), cores);
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value =
            toml::from_str("[worker]\ncache_version = \"1\"\nscript_name = \"sw.js\"").unwrap();
        let overlay: toml::Value = toml::from_str("[worker]\ncache_version = \"7\"").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["worker"]["cache_version"].as_str(), Some("7"));
        assert_eq!(merged["worker"]["script_name"].as_str(), Some("sw.js"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str("ignore = [\"node_modules\"]").unwrap();
        let overlay: toml::Value = toml::from_str("ignore = [\"vendor\"]").unwrap();
        let merged = merge_toml(base, overlay);
        let ignore = merged["ignore"].as_array().unwrap();
        assert_eq!(ignore.len(), 1);
        assert_eq!(ignore[0].as_str(), Some("vendor"));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_empty_cache_version() {
        let mut config = SiteConfig::default();
        config.worker.cache_version = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_script_name_with_slash() {
        let mut config = SiteConfig::default();
        config.worker.script_name = "js/sw.js".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_processes() {
        let mut config = SiteConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("edit_url_base = \"\"").unwrap();
        assert!(matches!(
            resolve_config(base, Some(overlay)),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let parsed: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(parsed.docs_dir, defaults.docs_dir);
        assert_eq!(parsed.edit_url_base, defaults.edit_url_base);
        assert_eq!(parsed.worker.cache_version, defaults.worker.cache_version);
        assert_eq!(parsed.highlight.prefix, defaults.highlight.prefix);
        assert_eq!(parsed.processing.max_processes, None);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value().unwrap();
        let table = value.as_table().unwrap();
        for key in ["highlight", "worker", "processing", "docs_dir", "ignore"] {
            assert!(table.contains_key(key), "missing {key}");
        }
    }
}
