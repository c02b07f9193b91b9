//! CLI output formatting for all pipeline stages.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Each document leads
//! with its positional index and title; the markdown source is shown as an
//! indented `Source:` line. Untitled documents show their file stem in
//! parentheses, since the file name is then their only identity.
//!
//! # Output Format
//!
//! ## Docs
//!
//! ```text
//! Docs
//! 001 Logux → README/index.html
//!     Source: README.md
//! 002 (notes) → guide/notes/index.html
//!     Source: guide/notes.md
//!
//! Generated 2 pages
//! ```
//!
//! ## Styles
//!
//! ```text
//! Styles
//! 001 style.css
//!     /logo.svg
//!     /wide.png  @media (min-width: 40em)
//!
//! Repacked 1 stylesheet, 2 urls
//! ```
//!
//! ## Worker
//!
//! ```text
//! Worker → sw.js (cache 1)
//!     /
//!     /style.css
//!
//! Precached 2 files
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::docs::Document;
use crate::generate::page_path;
use crate::styles::CollectedUrl;
use crate::worker::WorkerConfig;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: titled entities show the title, untitled ones
/// their file stem in parens.
///
/// ```text
/// 001 Getting Started
/// 002 (notes)
/// ```
fn entity_header(index: usize, title: Option<&str>, stem: &str) -> String {
    match title {
        Some(t) if !t.is_empty() => format!("{} {}", format_index(index), t),
        _ => format!("{} ({})", format_index(index), stem),
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

/// `/`-separated display path of `path` relative to `root`.
fn display_path(path: &Path, root: &Path) -> String {
    crate::docs::relative_path(root, path)
}

// ============================================================================
// Docs
// ============================================================================

/// Format the transformed documents with their output pages.
pub fn format_docs_output(docs: &[Document]) -> Vec<String> {
    let mut lines = vec!["Docs".to_string()];
    for (i, doc) in docs.iter().enumerate() {
        let stem = Path::new(&doc.path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let page = display_path(&page_path(&doc.path), Path::new(""));
        lines.push(format!(
            "{} → {}",
            entity_header(i + 1, doc.title.as_deref(), &stem),
            page
        ));
        lines.push(format!("{}Source: {}", indent(1), doc.path));
    }
    lines.push(String::new());
    lines.push(format!("Generated {}", plural(docs.len(), "page", "pages")));
    lines
}

/// Print docs output to stdout.
pub fn print_docs_output(docs: &[Document]) {
    for line in format_docs_output(docs) {
        println!("{}", line);
    }
}

// ============================================================================
// Styles
// ============================================================================

/// Format repacked stylesheets and the URLs collected from them.
///
/// `urls` holds one list per file, in the order of `files`.
pub fn format_styles_output(
    files: &[PathBuf],
    urls: &[Vec<CollectedUrl>],
    output_root: &Path,
) -> Vec<String> {
    let mut lines = vec!["Styles".to_string()];
    let mut total = 0;
    for (i, file) in files.iter().enumerate() {
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            display_path(file, output_root)
        ));
        for entry in urls.get(i).map(Vec::as_slice).unwrap_or_default() {
            total += 1;
            match &entry.media {
                Some(media) => lines.push(format!("{}{}  @media {}", indent(1), entry.url, media)),
                None => lines.push(format!("{}{}", indent(1), entry.url)),
            }
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Repacked {}, {}",
        plural(files.len(), "stylesheet", "stylesheets"),
        plural(total, "url", "urls")
    ));
    lines
}

/// Print styles output to stdout.
pub fn print_styles_output(files: &[PathBuf], urls: &[Vec<CollectedUrl>], output_root: &Path) {
    for line in format_styles_output(files, urls, output_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Format the generated worker and its precache manifest.
pub fn format_worker_output(config: &WorkerConfig, script_name: &str) -> Vec<String> {
    let mut lines = vec![format!(
        "Worker → {} (cache {})",
        script_name, config.cache_version
    )];
    for file in &config.files {
        lines.push(format!("{}{}", indent(1), file));
    }
    lines.push(String::new());
    lines.push(format!(
        "Precached {}",
        plural(config.files.len(), "file", "files")
    ));
    lines
}

/// Print worker output to stdout.
pub fn print_worker_output(config: &WorkerConfig, script_name: &str) {
    for line in format_worker_output(config, script_name) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
