//! Shared test utilities for the logux-site test suite.
//!
//! Provides tree lookups that panic with a clear message on miss, bulk
//! extractors over syntax trees, fixture setup, and a scriptable
//! [`MockNetwork`] for the worker model.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let doc = transform_document("guide/start.md", "# Start\n", &SiteConfig::default());
//! let h1 = find_element(&doc.tree, "h1");
//! assert_eq!(element_text(h1), "Start");
//!
//! let network = MockNetwork::new().serve("/a.js", "a").fail("/b.css");
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::markup::{Element, MarkupNode, text_content};
use crate::syntax::SyntaxNode;
use crate::worker::cache::{Network, NetworkError, Request, Response};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/docs/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/docs");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Markup lookups (panic with a clear message on miss)
// =========================================================================

/// Every descendant element with `tag`, in document order.
pub fn find_all_elements<'a>(root: &'a Element, tag: &str) -> Vec<&'a Element> {
    let mut found = Vec::new();
    collect_elements(&root.children, tag, &mut found);
    found
}

fn collect_elements<'a>(nodes: &'a [MarkupNode], tag: &str, found: &mut Vec<&'a Element>) {
    for node in nodes {
        if let MarkupNode::Element(element) = node {
            if element.tag == tag {
                found.push(element);
            }
            collect_elements(&element.children, tag, found);
        }
    }
}

/// First descendant element with `tag`. Panics if not found.
pub fn find_element<'a>(root: &'a Element, tag: &str) -> &'a Element {
    find_all_elements(root, tag)
        .into_iter()
        .next()
        .unwrap_or_else(|| panic!("<{tag}> not found in:\n{}", root.to_html()))
}

/// Text content of an element.
pub fn element_text(element: &Element) -> String {
    element.children.iter().map(text_content).collect()
}

// =========================================================================
// Syntax tree extractors
// =========================================================================

/// Every `Element` syntax node with `tag`, in document order.
pub fn find_all_syntax<'a>(nodes: &'a [SyntaxNode], tag: &str) -> Vec<&'a SyntaxNode> {
    let mut found = Vec::new();
    for node in nodes {
        if matches!(node, SyntaxNode::Element { tag: t, .. } if t == tag) {
            found.push(node);
        }
        found.extend(find_all_syntax(node.children(), tag));
    }
    found
}

/// Every link URL, in document order.
pub fn find_all_links(nodes: &[SyntaxNode]) -> Vec<String> {
    let mut links = Vec::new();
    for node in nodes {
        if let SyntaxNode::Link { url, .. } = node {
            links.push(url.clone());
        }
        links.extend(find_all_links(node.children()));
    }
    links
}

// =========================================================================
// Worker network
// =========================================================================

/// Serves registered paths with 200, unknown paths with 404, and fails
/// requests to paths marked with [`MockNetwork::fail`]. Records every request.
#[derive(Default)]
pub struct MockNetwork {
    bodies: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    requests: Mutex<Vec<Request>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, path: &str, body: &str) -> Self {
        self.bodies.insert(path.to_string(), body.as_bytes().to_vec());
        self
    }

    pub fn fail(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

impl Network for MockNetwork {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.requests.lock().unwrap().push(request.clone());
        let path = request.url.path();
        if self.failing.contains(path) {
            return Err(NetworkError {
                url: request.url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(match self.bodies.get(path) {
            Some(body) => Response::new(request.url.clone(), 200, body.clone()),
            None => Response::new(request.url.clone(), 404, "Not Found"),
        })
    }
}
