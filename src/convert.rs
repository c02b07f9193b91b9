//! Documentation conventions applied to the freshly parsed syntax tree.
//!
//! The pass runs before highlighting and does four things:
//!
//! - strips raw `<img>` markup from the project readme (badges and logos
//!   that only make sense on GitHub),
//! - expands `npm ...` shell snippets into npm / pnpm / Yarn variants,
//! - picks the document title from the first level-1 heading,
//! - rewrites relative links for the extra directory level of the output
//!   site (`guide.md` is published as `guide/index.html`).

use crate::syntax::{SyntaxNode, text_content};
use regex::Regex;
use std::sync::LazyLock;

static NPM_INSTALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^npm i(nstall)? ").expect("valid regex"));
static NPM_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^npm ").expect("valid regex"));
static MD_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.md(#.+)?$").expect("valid regex"));

/// Languages treated as shell snippets for package-manager expansion.
const SHELL_LANGS: &[&str] = &["sh", "bash", "shell"];

/// Per-document inputs of the convert pass.
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    /// The file is the project readme.
    pub is_readme: bool,
}

/// Result of the convert pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    /// Text of the first level-1 heading.
    pub title: Option<String>,
    pub tree: Vec<SyntaxNode>,
}

pub fn convert(tree: Vec<SyntaxNode>, options: ConvertOptions) -> Converted {
    let tree = if options.is_readme {
        flat_map(tree, &|node| match node {
            SyntaxNode::Html(ref raw) if raw.contains("<img") => Vec::new(),
            other => vec![other],
        })
    } else {
        tree
    };
    let mut tree = flat_map(tree, &expand_package_managers);
    let title = tree.iter().find_map(first_title);
    tree.iter_mut().for_each(rewrite_links);
    Converted { title, tree }
}

/// Rebuild a tree, replacing every node with zero or more nodes.
///
/// Children are rewritten before their parent sees them; replacement nodes
/// are not visited again.
pub fn flat_map(
    nodes: Vec<SyntaxNode>,
    f: &dyn Fn(SyntaxNode) -> Vec<SyntaxNode>,
) -> Vec<SyntaxNode> {
    nodes
        .into_iter()
        .flat_map(|node| {
            let node = match node {
                SyntaxNode::Heading { depth, children } => SyntaxNode::Heading {
                    depth,
                    children: flat_map(children, f),
                },
                SyntaxNode::Link {
                    url,
                    title,
                    children,
                } => SyntaxNode::Link {
                    url,
                    title,
                    children: flat_map(children, f),
                },
                SyntaxNode::Element {
                    tag,
                    properties,
                    children,
                } => SyntaxNode::Element {
                    tag,
                    properties,
                    children: flat_map(children, f),
                },
                leaf @ (SyntaxNode::Text(_)
                | SyntaxNode::Definition { .. }
                | SyntaxNode::Code { .. }
                | SyntaxNode::Html(_)) => leaf,
            };
            f(node)
        })
        .collect()
}

fn expand_package_managers(node: SyntaxNode) -> Vec<SyntaxNode> {
    match node {
        SyntaxNode::Code {
            lang: Some(ref lang),
            ref value,
            ..
        } if SHELL_LANGS.contains(&lang.as_str()) && value.starts_with("npm ") => {
            let pnpm = SyntaxNode::code(Some(lang), npm_to_pnpm(value));
            let yarn = SyntaxNode::code(Some(lang), npm_to_yarn(value));
            vec![
                collapsible("npm", node),
                collapsible("pnpm", pnpm),
                collapsible("Yarn", yarn),
            ]
        }
        other => vec![other],
    }
}

fn collapsible(summary: &str, body: SyntaxNode) -> SyntaxNode {
    SyntaxNode::element(
        "details",
        vec![
            SyntaxNode::element("summary", vec![SyntaxNode::text(summary)]),
            body,
        ],
    )
}

/// Rewrite an npm command for Yarn.
pub fn npm_to_yarn(command: &str) -> String {
    let command = NPM_INSTALL.replace(command, "yarn add ");
    let command = command.replacen("--save-dev", "--dev", 1);
    NPM_PREFIX.replace(&command, "yarn ").into_owned()
}

/// Rewrite an npm command for pnpm.
pub fn npm_to_pnpm(command: &str) -> String {
    let command = NPM_INSTALL.replace(command, "pnpm add ");
    NPM_PREFIX.replace(&command, "pnpm ").into_owned()
}

fn first_title(node: &SyntaxNode) -> Option<String> {
    match node {
        SyntaxNode::Heading { depth: 1, .. } => Some(text_content(node)),
        other => other.children().iter().find_map(first_title),
    }
}

fn rewrite_links(node: &mut SyntaxNode) {
    match node {
        SyntaxNode::Link { url, children, .. } => {
            *url = rewrite_url(url);
            children.iter_mut().for_each(rewrite_links);
        }
        SyntaxNode::Definition { url, .. } => *url = rewrite_url(url),
        SyntaxNode::Heading { children, .. } | SyntaxNode::Element { children, .. } => {
            children.iter_mut().for_each(rewrite_links);
        }
        SyntaxNode::Text(_) | SyntaxNode::Code { .. } | SyntaxNode::Html(_) => {}
    }
}

/// Adjust a link for the page's published location one directory deeper.
///
/// `../x` → `../../x`, `./x` → `../x`, and a trailing `.md` (optionally
/// followed by a fragment) becomes a trailing slash.
pub fn rewrite_url(url: &str) -> String {
    let url = if let Some(rest) = url.strip_prefix("../") {
        format!("../../{rest}")
    } else if let Some(rest) = url.strip_prefix("./") {
        format!("../{rest}")
    } else {
        url.to_string()
    };
    MD_EXTENSION.replace(&url, "/$1").into_owned()
}
