//! Offline Cache Worker.
//!
//! The site ships a small cache-first service worker. At install it
//! precaches a fixed manifest of asset URLs into a cache named by the
//! configured version, evicting anything else from that cache. Afterwards
//! same-origin requests are answered from the cache (ignoring the query
//! string) and fall back to the network; cross-origin requests are never
//! intercepted.
//!
//! [`script`] renders the browser script from an embedded template.
//! [`cache`] models the same behaviour in Rust so it can be tested without a
//! browser.

pub mod cache;
pub mod script;

pub use cache::{Cache, CacheStorage, FetchOutcome, Network, NetworkError, OfflineWorker};
pub use script::render_script;

use crate::config::WorkerSettings;
use std::path::Path;
use thiserror::Error;
use url::Url;
use walkdir::WalkDir;

/// Base for turning output paths into request paths.
const MANIFEST_BASE: &str = "http://localhost/";

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid manifest URL {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Precache failed: {0}")]
    Network(#[from] NetworkError),
    #[error("Precache failed: {url} responded with {status}")]
    Status { url: String, status: u16 },
}

/// Everything the worker needs, passed explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Cache name. Bumping it leaves the previous cache behind.
    pub cache_version: String,
    /// Manifest of absolute paths to precache.
    pub files: Vec<String>,
    /// Value of the `From` header on precache requests.
    pub from_header: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let settings = WorkerSettings::default();
        Self {
            cache_version: settings.cache_version,
            files: Vec::new(),
            from_header: settings.from_header,
        }
    }
}

impl WorkerConfig {
    pub fn from_settings(settings: &WorkerSettings, files: Vec<String>) -> Self {
        Self {
            cache_version: settings.cache_version.clone(),
            files,
            from_header: settings.from_header.clone(),
        }
    }
}

/// URL paths of every file below `output_dir`, sorted.
///
/// `index.html` files are listed by their directory URL (`/guide/start/`),
/// which is how pages are linked. The worker script itself is left out.
/// Paths are percent-encoded the way the browser reports `URL.pathname`,
/// so the stale-entry check compares like with like.
pub fn collect_manifest(output_dir: &Path, script_name: &str) -> Result<Vec<String>, WorkerError> {
    let mut url = Url::parse(MANIFEST_BASE).map_err(|source| WorkerError::Url {
        url: MANIFEST_BASE.to_string(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in WalkDir::new(output_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = crate::docs::relative_path(output_dir, entry.path());
        if relative == script_name {
            continue;
        }
        let path = match relative.strip_suffix("index.html") {
            Some(dir) if dir.is_empty() || dir.ends_with('/') => dir,
            _ => relative.as_str(),
        };
        url.set_path(&format!("/{path}"));
        files.push(url.path().to_string());
    }
    files.sort();
    Ok(files)
}

/// Render the worker for everything in `output_dir` and write it there.
///
/// Returns the config the script was rendered with.
pub fn write_worker(output_dir: &Path, settings: &WorkerSettings) -> Result<WorkerConfig, WorkerError> {
    let files = collect_manifest(output_dir, &settings.script_name)?;
    let config = WorkerConfig::from_settings(settings, files);
    let script = render_script(&config)?;
    std::fs::write(output_dir.join(&settings.script_name), script)?;
    tracing::info!(
        "Wrote {} with {} precached files",
        settings.script_name,
        config.files.len()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn output_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("guide/start")).unwrap();
        fs::write(tmp.path().join("index.html"), "").unwrap();
        fs::write(tmp.path().join("style.css"), "").unwrap();
        fs::write(tmp.path().join("guide/start/index.html"), "").unwrap();
        fs::write(tmp.path().join("guide/logo.svg"), "").unwrap();
        fs::write(tmp.path().join("sw.js"), "old").unwrap();
        tmp
    }

    #[test]
    fn manifest_lists_pages_by_directory() {
        let tmp = output_tree();
        let files = collect_manifest(tmp.path(), "sw.js").unwrap();
        assert_eq!(
            files,
            vec!["/", "/guide/logo.svg", "/guide/start/", "/style.css"]
        );
    }

    #[test]
    fn non_index_html_keeps_file_name() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notindex.html"), "").unwrap();
        let files = collect_manifest(tmp.path(), "sw.js").unwrap();
        assert_eq!(files, vec!["/notindex.html"]);
    }

    #[test]
    fn manifest_paths_are_percent_encoded() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("my docs")).unwrap();
        fs::write(tmp.path().join("a b.css"), "").unwrap();
        fs::write(tmp.path().join("ёж.svg"), "").unwrap();
        fs::write(tmp.path().join("why?.txt"), "").unwrap();
        fs::write(tmp.path().join("my docs/index.html"), "").unwrap();
        let files = collect_manifest(tmp.path(), "sw.js").unwrap();
        assert_eq!(
            files,
            vec![
                "/%D1%91%D0%B6.svg",
                "/a%20b.css",
                "/my%20docs/",
                "/why%3F.txt"
            ]
        );

        // Matches what the cache model sees for a request to the same file.
        let request = Url::parse("https://logux.io/a b.css").unwrap();
        assert!(files.contains(&request.path().to_string()));
    }

    #[test]
    fn write_worker_injects_manifest() {
        let tmp = output_tree();
        let config = write_worker(tmp.path(), &WorkerSettings::default()).unwrap();
        assert_eq!(config.files.len(), 4);

        let script = fs::read_to_string(tmp.path().join("sw.js")).unwrap();
        assert!(script.contains(r#""/guide/start/""#));
        assert!(!script.contains(r#""/sw.js""#));
    }

    #[test]
    fn default_config_matches_settings() {
        let config = WorkerConfig::default();
        assert_eq!(config.cache_version, "1");
        assert_eq!(config.from_header, "service-worker@logux.io");
        assert!(config.files.is_empty());
    }
}
