//! Doc Transformer: markdown files → titled `article` trees.
//!
//! Every document goes through the same fixed sequence of passes:
//!
//! ```text
//! parse      markdown → syntax tree               (syntax)
//! convert    readme images, npm variants,         (convert)
//!            title, relative links
//! highlight  sh/bash/ini/diff + JS family         (highlight)
//! lower      syntax tree → markup tree,           (markup)
//!            raw HTML re-parsed
//! wrap       single <article>, h1 edit links      (article)
//! videos     Youtube:<id> paragraphs              (video)
//! ```
//!
//! Documents share nothing, so [`read_docs`] transforms them on the rayon
//! pool. Malformed content never fails a document: a missing heading just
//! means no title, an unmatched `Youtube:` paragraph stays a paragraph.

use crate::article::wrap_in_article;
use crate::config::SiteConfig;
use crate::convert::{ConvertOptions, convert};
use crate::highlight::highlight;
use crate::markup::{self, Element};
use crate::syntax;
use crate::video::insert_videos;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DocsError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Docs directory not found: {}", .0.display())]
    MissingRoot(PathBuf),
}

/// A transformed markdown file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Path relative to the docs root, `/`-separated.
    pub path: String,
    /// Text of the first level-1 heading.
    pub title: Option<String>,
    /// The document's single `article` element.
    pub tree: Element,
}

/// Run every pass over one markdown source.
pub fn transform_document(path: &str, markdown: &str, config: &SiteConfig) -> Document {
    let tree = syntax::parse(markdown);
    let converted = convert(
        tree,
        ConvertOptions {
            is_readme: path == config.readme,
        },
    );
    let mut tree = converted.tree;
    highlight(&mut tree, &config.highlight.prefix);

    let nodes = markup::reparse_raw(markup::from_syntax(tree));
    let edit_url = format!("{}{}", config.edit_url_base, path);
    let mut article = wrap_in_article(nodes, &edit_url);
    insert_videos(&mut article);

    Document {
        path: path.to_string(),
        title: converted.title,
        tree: article,
    }
}

/// Find `**/*.md` below `root`, skipping ignored directory names.
///
/// Returned paths are sorted so output is stable across runs.
pub fn find_markdown_files(root: &Path, ignore: &[String]) -> Result<Vec<PathBuf>, DocsError> {
    if !root.is_dir() {
        return Err(DocsError::MissingRoot(root.to_path_buf()));
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        !(entry.file_type().is_dir()
            && entry.depth() > 0
            && ignore
                .iter()
                .any(|name| entry.file_name().to_str() == Some(name.as_str())))
    });
    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "md") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// `/`-separated path of `file` relative to `root`.
pub fn relative_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Read and transform every markdown document below `root`.
pub fn read_docs(root: &Path, config: &SiteConfig) -> Result<Vec<Document>, DocsError> {
    let files = find_markdown_files(root, &config.ignore)?;
    tracing::info!("Found {} markdown files in {}", files.len(), root.display());

    files
        .par_iter()
        .map(|file| {
            let markdown = std::fs::read_to_string(file).map_err(|source| DocsError::Read {
                path: file.clone(),
                source,
            })?;
            let path = relative_path(root, file);
            tracing::debug!("Transforming {}", path);
            Ok(transform_document(&path, &markdown, config))
        })
        .collect()
}
