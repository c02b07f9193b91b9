//! Browser service worker script.

use super::{WorkerConfig, WorkerError};
use regex::{Captures, Regex};
use std::sync::LazyLock;

const TEMPLATE: &str = include_str!("../../static/service-worker.js");

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(CACHE_VERSION|FILES|FROM)__").expect("valid regex"));

/// Render `sw.js` for `config`.
///
/// Values are injected as JSON literals, so any cache version, header value
/// or file name ends up as a valid JavaScript string. Placeholders are
/// replaced in one pass over the template, so injected values are never
/// scanned again.
pub fn render_script(config: &WorkerConfig) -> Result<String, WorkerError> {
    let version = serde_json::to_string(&config.cache_version)?;
    let files = serde_json::to_string(&config.files)?;
    let from = serde_json::to_string(&config.from_header)?;
    let script = PLACEHOLDER.replace_all(TEMPLATE, |caps: &Captures| match &caps[1] {
        "CACHE_VERSION" => version.clone(),
        "FILES" => files.clone(),
        _ => from.clone(),
    });
    Ok(script.into_owned())
}
