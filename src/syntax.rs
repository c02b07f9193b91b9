//! Markdown syntax tree.
//!
//! `pulldown-cmark` produces a flat event stream; [`parse`] folds it into an
//! owned tree of [`SyntaxNode`]s so the rewrite passes can replace whole
//! subtrees. Only the node kinds a pass actually inspects get their own
//! variant. Everything else (paragraphs, emphasis, lists, tables, images,
//! inline code) is folded into [`SyntaxNode::Element`] with the HTML tag it
//! will eventually become.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::collections::BTreeMap;

/// Element attributes, ordered for deterministic serialization.
pub type Properties = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    Text(String),
    Heading {
        depth: u8,
        children: Vec<SyntaxNode>,
    },
    Link {
        url: String,
        title: String,
        children: Vec<SyntaxNode>,
    },
    /// Link reference definition (`[label]: url "title"`).
    Definition {
        label: String,
        url: String,
        title: String,
    },
    /// Fenced or indented code block.
    Code {
        lang: Option<String>,
        value: String,
        /// Replacement children produced by a highlighter.
        highlighted: Option<Vec<SyntaxNode>>,
    },
    /// Raw HTML, block or inline.
    Html(String),
    Element {
        tag: String,
        properties: Properties,
        children: Vec<SyntaxNode>,
    },
}

impl SyntaxNode {
    pub fn text(value: impl Into<String>) -> Self {
        SyntaxNode::Text(value.into())
    }

    pub fn element(tag: &str, children: Vec<SyntaxNode>) -> Self {
        SyntaxNode::Element {
            tag: tag.to_string(),
            properties: Properties::new(),
            children,
        }
    }

    /// A `<span class="...">` holding a single text node.
    pub fn span(class: &str, value: impl Into<String>) -> Self {
        let mut properties = Properties::new();
        properties.insert("class".to_string(), class.to_string());
        SyntaxNode::Element {
            tag: "span".to_string(),
            properties,
            children: vec![SyntaxNode::text(value)],
        }
    }

    pub fn code(lang: Option<&str>, value: impl Into<String>) -> Self {
        SyntaxNode::Code {
            lang: lang.map(str::to_string),
            value: value.into(),
            highlighted: None,
        }
    }

    pub fn children(&self) -> &[SyntaxNode] {
        match self {
            SyntaxNode::Heading { children, .. }
            | SyntaxNode::Link { children, .. }
            | SyntaxNode::Element { children, .. } => children,
            SyntaxNode::Code {
                highlighted: Some(children),
                ..
            } => children,
            _ => &[],
        }
    }
}

/// Concatenated text of a node and its descendants.
pub fn text_content(node: &SyntaxNode) -> String {
    match node {
        SyntaxNode::Text(value) => value.clone(),
        SyntaxNode::Code { value, .. } => value.clone(),
        other => other.children().iter().map(text_content).collect(),
    }
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// What an open `Start` event will become once its `End` arrives.
enum Frame {
    Root,
    Heading(u8),
    Link { url: String, title: String },
    Image { src: String, title: String },
    Code { lang: Option<String> },
    HtmlBlock,
    Element(&'static str, Properties),
    TableHead,
}

struct Open {
    frame: Frame,
    children: Vec<SyntaxNode>,
}

/// Parse markdown into a list of top-level syntax nodes.
///
/// Link reference definitions are appended after the blocks, in label order.
pub fn parse(markdown: &str) -> Vec<SyntaxNode> {
    let parser = Parser::new_ext(markdown, markdown_options());
    let definitions: Vec<SyntaxNode> = {
        let mut defs: Vec<_> = parser
            .reference_definitions()
            .iter()
            .map(|(label, def)| SyntaxNode::Definition {
                label: label.to_string(),
                url: def.dest.to_string(),
                title: def.title.as_deref().unwrap_or("").to_string(),
            })
            .collect();
        defs.sort_by(|a, b| match (a, b) {
            (
                SyntaxNode::Definition { label: a, .. },
                SyntaxNode::Definition { label: b, .. },
            ) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        });
        defs
    };

    let mut stack = vec![Open {
        frame: Frame::Root,
        children: Vec::new(),
    }];
    let mut in_table_head = false;

    for event in parser {
        match event {
            Event::Start(tag) => {
                let frame = match tag {
                    Tag::Heading { level, .. } => Frame::Heading(heading_depth(level)),
                    Tag::Link {
                        dest_url, title, ..
                    } => Frame::Link {
                        url: dest_url.to_string(),
                        title: title.to_string(),
                    },
                    Tag::Image {
                        dest_url, title, ..
                    } => Frame::Image {
                        src: dest_url.to_string(),
                        title: title.to_string(),
                    },
                    Tag::CodeBlock(kind) => Frame::Code {
                        lang: match kind {
                            CodeBlockKind::Fenced(info) => info
                                .split_whitespace()
                                .next()
                                .map(str::to_string),
                            CodeBlockKind::Indented => None,
                        },
                    },
                    Tag::HtmlBlock => Frame::HtmlBlock,
                    Tag::TableHead => {
                        in_table_head = true;
                        Frame::TableHead
                    }
                    Tag::List(Some(start)) if start != 1 => {
                        let mut properties = Properties::new();
                        properties.insert("start".to_string(), start.to_string());
                        Frame::Element("ol", properties)
                    }
                    other => Frame::Element(element_tag(&other, in_table_head), Properties::new()),
                };
                stack.push(Open {
                    frame,
                    children: Vec::new(),
                });
            }
            Event::End(end) => {
                if matches!(end, TagEnd::TableHead) {
                    in_table_head = false;
                }
                let Some(open) = stack.pop() else { break };
                let node = close(open);
                if let Some(parent) = stack.last_mut() {
                    push_child(&mut parent.children, node);
                }
            }
            Event::Text(text) => {
                if let Some(open) = stack.last_mut() {
                    push_child(&mut open.children, SyntaxNode::text(text.as_ref()));
                }
            }
            Event::Code(code) => {
                if let Some(open) = stack.last_mut() {
                    open.children.push(SyntaxNode::element(
                        "code",
                        vec![SyntaxNode::text(code.as_ref())],
                    ));
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                if let Some(open) = stack.last_mut() {
                    open.children.push(SyntaxNode::Html(html.to_string()));
                }
            }
            Event::SoftBreak => {
                if let Some(open) = stack.last_mut() {
                    push_child(&mut open.children, SyntaxNode::text("\n"));
                }
            }
            Event::HardBreak => {
                if let Some(open) = stack.last_mut() {
                    open.children.push(SyntaxNode::element("br", Vec::new()));
                }
            }
            Event::Rule => {
                if let Some(open) = stack.last_mut() {
                    open.children.push(SyntaxNode::element("hr", Vec::new()));
                }
            }
            Event::TaskListMarker(checked) => {
                if let Some(open) = stack.last_mut() {
                    let mut properties = Properties::new();
                    properties.insert("type".to_string(), "checkbox".to_string());
                    properties.insert("disabled".to_string(), String::new());
                    if checked {
                        properties.insert("checked".to_string(), String::new());
                    }
                    open.children.push(SyntaxNode::Element {
                        tag: "input".to_string(),
                        properties,
                        children: Vec::new(),
                    });
                }
            }
            _ => {}
        }
    }

    let mut nodes = stack
        .into_iter()
        .next()
        .map(|root| root.children)
        .unwrap_or_default();
    nodes.extend(definitions);
    nodes
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn element_tag(tag: &Tag<'_>, in_table_head: bool) -> &'static str {
    match tag {
        Tag::Paragraph => "p",
        Tag::BlockQuote(_) => "blockquote",
        Tag::List(None) => "ul",
        Tag::List(Some(_)) => "ol",
        Tag::Item => "li",
        Tag::Emphasis => "em",
        Tag::Strong => "strong",
        Tag::Strikethrough => "del",
        Tag::Table(_) => "table",
        Tag::TableRow => "tr",
        Tag::TableCell if in_table_head => "th",
        Tag::TableCell => "td",
        _ => "div",
    }
}

/// Merge adjacent text nodes so passes see whole words and lines.
fn push_child(children: &mut Vec<SyntaxNode>, node: SyntaxNode) {
    if let SyntaxNode::Text(value) = &node
        && let Some(SyntaxNode::Text(last)) = children.last_mut()
    {
        last.push_str(value);
        return;
    }
    children.push(node);
}

fn close(open: Open) -> SyntaxNode {
    let Open { frame, children } = open;
    match frame {
        Frame::Heading(depth) => SyntaxNode::Heading { depth, children },
        Frame::Link { url, title } => SyntaxNode::Link {
            url,
            title,
            children,
        },
        Frame::Image { src, title } => {
            let alt: String = children.iter().map(text_content).collect();
            let mut properties = Properties::new();
            properties.insert("src".to_string(), src);
            properties.insert("alt".to_string(), alt);
            if !title.is_empty() {
                properties.insert("title".to_string(), title);
            }
            SyntaxNode::Element {
                tag: "img".to_string(),
                properties,
                children: Vec::new(),
            }
        }
        Frame::Code { lang } => {
            let mut value: String = children.iter().map(text_content).collect();
            if value.ends_with('\n') {
                value.pop();
            }
            SyntaxNode::Code {
                lang,
                value,
                highlighted: None,
            }
        }
        Frame::HtmlBlock => {
            let raw: String = children
                .iter()
                .map(|child| match child {
                    SyntaxNode::Html(raw) => raw.clone(),
                    other => text_content(other),
                })
                .collect();
            SyntaxNode::Html(raw)
        }
        Frame::TableHead => SyntaxNode::element("thead", vec![SyntaxNode::element("tr", children)]),
        Frame::Element(tag, properties) => SyntaxNode::Element {
            tag: tag.to_string(),
            properties,
            children,
        },
        Frame::Root => SyntaxNode::element("div", children),
    }
}
