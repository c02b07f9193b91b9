//! HTML page generation.
//!
//! Every [`Document`] becomes one page. Pages live one directory below their
//! markdown source, which is the extra level the link rewrite accounts for:
//!
//! ```text
//! docs/                       dist/
//! ├── README.md          →    ├── README/index.html
//! └── guide/                  └── guide/
//!     └── start.md       →        └── start/index.html
//! ```
//!
//! The article tree is serialized as-is, with two renderer-only touches
//! driven by [`ElementData`](crate::markup::ElementData): `h2`–`h6` headings
//! get slug `id`s for deep links (unless marked `no_slug`), and an `h1`
//! carrying an edit URL gets an "Edit" link appended.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for the page shell. The article
//! markup is already escaped by [`Element::to_html`] and is embedded with
//! `PreEscaped`.

use crate::config::SiteConfig;
use crate::docs::Document;
use crate::markup::{Element, MarkupNode, text_content};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A link in the site navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct NavItem {
    pub title: String,
    /// Absolute URL of the page (`/guide/start/`).
    pub href: String,
}

/// Output file of a document, relative to the output root.
pub fn page_path(doc_path: &str) -> PathBuf {
    let stem = doc_path.strip_suffix(".md").unwrap_or(doc_path);
    Path::new(stem).join("index.html")
}

/// Absolute URL of a document's page.
pub fn page_url(doc_path: &str) -> String {
    let stem = doc_path.strip_suffix(".md").unwrap_or(doc_path);
    format!("/{stem}/")
}

/// Page title: the document title, or the file stem when there is none.
pub fn page_title(doc: &Document) -> String {
    doc.title.clone().unwrap_or_else(|| {
        Path::new(&doc.path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| doc.path.clone())
    })
}

pub fn nav_items(docs: &[Document]) -> Vec<NavItem> {
    docs.iter()
        .map(|doc| NavItem {
            title: page_title(doc),
            href: page_url(&doc.path),
        })
        .collect()
}

/// Write one page per document. Returns the written files.
pub fn write_pages(
    docs: &[Document],
    output_dir: &Path,
    config: &SiteConfig,
) -> Result<Vec<PathBuf>, GenerateError> {
    let nav = nav_items(docs);
    let written = docs
        .par_iter()
        .map(|doc| {
            let path = output_dir.join(page_path(&doc.path));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let page = render_page(doc, &nav, config);
            fs::write(&path, page.into_string())?;
            tracing::debug!("Generated {}", path.display());
            Ok(path)
        })
        .collect::<Result<Vec<_>, GenerateError>>()?;
    tracing::info!("Generated {} pages in {}", written.len(), output_dir.display());
    Ok(written)
}

/// Copy the static assets directory into the output root.
///
/// A missing assets directory copies nothing. Returns the number of files.
pub fn copy_assets(assets_dir: &Path, output_dir: &Path) -> Result<usize, GenerateError> {
    if !assets_dir.is_dir() {
        tracing::debug!("No assets at {}", assets_dir.display());
        return Ok(0);
    }
    fs::create_dir_all(output_dir)?;
    let copied = copy_dir_recursive(assets_dir, output_dir)?;
    tracing::info!("Copied {} assets from {}", copied, assets_dir.display());
    Ok(copied)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<usize> {
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copied += copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
            copied += 1;
        }
    }
    Ok(copied)
}

// ============================================================================
// Article finishing
// ============================================================================

/// Heading slug in the style of GitHub anchors.
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

/// Copy of `article` with heading ids and the edit link added.
pub fn finish_article(article: &Element) -> Element {
    let mut article = article.clone();
    let mut seen = HashMap::new();
    finish_children(&mut article.children, &mut seen);
    article
}

fn finish_children(children: &mut [MarkupNode], seen: &mut HashMap<String, usize>) {
    for child in children {
        let MarkupNode::Element(element) = child else {
            continue;
        };
        if let Some(url) = element.data.edit_url.clone() {
            let link = Element::new("a", vec![MarkupNode::text("Edit")])
                .with_property("class", "edit-link")
                .with_property("href", url);
            element.children.push(MarkupNode::Element(link));
        }
        if is_sub_heading(&element.tag)
            && !element.data.no_slug
            && !element.properties.contains_key("id")
        {
            let id = unique_slug(&element.children, seen);
            element.properties.insert("id".to_string(), id);
        }
        finish_children(&mut element.children, seen);
    }
}

fn is_sub_heading(tag: &str) -> bool {
    matches!(tag, "h2" | "h3" | "h4" | "h5" | "h6")
}

fn unique_slug(children: &[MarkupNode], seen: &mut HashMap<String, usize>) -> String {
    let text: String = children.iter().map(text_content).collect();
    let base = slugify(&text);
    let count = seen.entry(base.clone()).or_insert(0);
    let slug = if *count == 0 {
        base
    } else {
        format!("{base}-{count}")
    };
    *count += 1;
    slug
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, stylesheets: &[String], script_name: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                @for href in stylesheets {
                    link rel="stylesheet" href=(href);
                }
            }
            body {
                (content)
                script {
                    (PreEscaped(format!(
                        "if ('serviceWorker' in navigator) navigator.serviceWorker.register('/{script_name}')"
                    )))
                }
            }
        }
    }
}

/// Renders the documentation navigation, marking the current page
pub fn render_nav(items: &[NavItem], current_href: &str) -> Markup {
    html! {
        nav.docs-nav {
            ul {
                @for item in items {
                    @let is_current = item.href == current_href;
                    li class=[is_current.then_some("current")] {
                        a href=(item.href) { (item.title) }
                    }
                }
            }
        }
    }
}

/// Renders one documentation page
pub fn render_page(doc: &Document, nav: &[NavItem], config: &SiteConfig) -> Markup {
    let article = finish_article(&doc.tree);
    let content = html! {
        (render_nav(nav, &page_url(&doc.path)))
        main {
            (PreEscaped(article.to_html()))
        }
    };
    base_document(
        &page_title(doc),
        &config.stylesheets,
        &config.worker.script_name,
        content,
    )
}

// ============================================================================
// Tests
// ============================================================================
