//! Markup tree: the HTML-shaped form of a document.
//!
//! [`from_syntax`] lowers the syntax tree, keeping raw HTML from the markdown
//! as [`MarkupNode::Raw`]. [`reparse_raw`] then serializes the fragment and
//! runs it through html5ever (via `scraper`) so raw tags become real
//! elements. This is what lets an opening `<details>` in one HTML block and
//! its closing tag in another end up as a single element.

use crate::syntax::{Properties, SyntaxNode};
use scraper::{ElementRef, Html};
use std::fmt::Write as _;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text children are written verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Text(String),
    Element(Element),
    /// Unparsed HTML copied from the markdown source.
    Raw(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub properties: Properties,
    pub children: Vec<MarkupNode>,
    pub data: ElementData,
}

/// Annotations for the page renderer. Never serialized as attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementData {
    /// "Edit this page" link target.
    pub edit_url: Option<String>,
    /// The renderer must not generate an `id` slug for this element.
    pub no_slug: bool,
}

impl Element {
    pub fn new(tag: &str, children: Vec<MarkupNode>) -> Self {
        Self {
            tag: tag.to_string(),
            properties: Properties::new(),
            children,
            data: ElementData::default(),
        }
    }

    pub fn with_property(mut self, name: &str, value: impl Into<String>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn class(&self) -> Option<&str> {
        self.properties.get("class").map(String::as_str)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_element(&mut out, self);
        out
    }
}

impl MarkupNode {
    pub fn text(value: impl Into<String>) -> Self {
        MarkupNode::Text(value.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            MarkupNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Concatenated text of a node and its descendants.
pub fn text_content(node: &MarkupNode) -> String {
    match node {
        MarkupNode::Text(value) => value.clone(),
        MarkupNode::Element(element) => element.children.iter().map(text_content).collect(),
        MarkupNode::Raw(_) | MarkupNode::Comment(_) => String::new(),
    }
}

// ============================================================================
// Syntax tree → markup tree
// ============================================================================

/// Lower syntax nodes to markup nodes.
pub fn from_syntax(nodes: Vec<SyntaxNode>) -> Vec<MarkupNode> {
    nodes.into_iter().filter_map(lower).collect()
}

fn lower(node: SyntaxNode) -> Option<MarkupNode> {
    let element = match node {
        SyntaxNode::Text(value) => return Some(MarkupNode::Text(value)),
        SyntaxNode::Html(raw) => return Some(MarkupNode::Raw(raw)),
        SyntaxNode::Definition { .. } => return None,
        SyntaxNode::Heading { depth, children } => {
            Element::new(&format!("h{depth}"), from_syntax(children))
        }
        SyntaxNode::Link {
            url,
            title,
            children,
        } => {
            let link = Element::new("a", from_syntax(children)).with_property("href", url);
            if title.is_empty() {
                link
            } else {
                link.with_property("title", title)
            }
        }
        SyntaxNode::Code {
            lang,
            value,
            highlighted,
        } => {
            let children = match highlighted {
                Some(nodes) => from_syntax(nodes),
                None if value.is_empty() => Vec::new(),
                None => vec![MarkupNode::Text(format!("{value}\n"))],
            };
            let code = match lang {
                Some(lang) => Element::new("code", children).with_property("class", format!("language-{lang}")),
                None => Element::new("code", children),
            };
            Element::new("pre", vec![MarkupNode::Element(code)])
        }
        SyntaxNode::Element {
            tag,
            properties,
            children,
        } => Element {
            tag,
            properties,
            children: from_syntax(children),
            data: ElementData::default(),
        },
    };
    Some(MarkupNode::Element(element))
}

// ============================================================================
// Raw HTML
// ============================================================================

fn contains_raw(nodes: &[MarkupNode]) -> bool {
    nodes.iter().any(|node| match node {
        MarkupNode::Raw(_) => true,
        MarkupNode::Element(element) => contains_raw(&element.children),
        MarkupNode::Text(_) | MarkupNode::Comment(_) => false,
    })
}

/// Turn raw HTML into real markup nodes.
///
/// Fragments without raw nodes are returned as they are.
pub fn reparse_raw(nodes: Vec<MarkupNode>) -> Vec<MarkupNode> {
    if !contains_raw(&nodes) {
        return nodes;
    }
    parse_html(&to_html(&nodes))
}

/// Parse an HTML fragment in `<body>` context.
pub fn parse_html(html: &str) -> Vec<MarkupNode> {
    let fragment = Html::parse_fragment(html);
    convert_children(fragment.root_element())
}

fn convert_children(parent: ElementRef<'_>) -> Vec<MarkupNode> {
    let mut nodes = Vec::new();
    for child in parent.children() {
        if let Some(element) = ElementRef::wrap(child) {
            nodes.push(MarkupNode::Element(convert_element(element)));
        } else if let Some(text) = child.value().as_text() {
            nodes.push(MarkupNode::Text(String::from(&**text)));
        } else if let Some(comment) = child.value().as_comment() {
            nodes.push(MarkupNode::Comment(String::from(&**comment)));
        }
    }
    nodes
}

fn convert_element(element: ElementRef<'_>) -> Element {
    let value = element.value();
    Element {
        tag: value.name().to_string(),
        properties: value
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        children: convert_children(element),
        data: ElementData::default(),
    }
}

// ============================================================================
// Serialization
// ============================================================================

/// Serialize markup nodes to HTML.
pub fn to_html(nodes: &[MarkupNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, false);
    }
    out
}

fn write_node(out: &mut String, node: &MarkupNode, raw_text: bool) {
    match node {
        MarkupNode::Text(value) if raw_text => out.push_str(value),
        MarkupNode::Text(value) => out.push_str(&escape_text(value)),
        MarkupNode::Raw(raw) => out.push_str(raw),
        MarkupNode::Comment(comment) => {
            let _ = write!(out, "<!--{comment}-->");
        }
        MarkupNode::Element(element) => write_element(out, element),
    }
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.properties {
        let _ = write!(out, " {}=\"{}\"", name, escape_attribute(value));
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&element.tag.as_str()) {
        return;
    }
    let raw_text = RAW_TEXT_ELEMENTS.contains(&element.tag.as_str());
    for child in &element.children {
        write_node(out, child, raw_text);
    }
    let _ = write!(out, "</{}>", element.tag);
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
