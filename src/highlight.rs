//! Code block highlighting.
//!
//! Shell, ini and diff snippets get hand-written line highlighters that know
//! the conventions of the Logux docs (`npx`, `pnpm add`, config keys, patch
//! hunks). Everything else goes through [`general`], which runs arborium's
//! tree-sitter grammars. Both produce `span` elements classed with the
//! configured prefix and store them in [`SyntaxNode::Code::highlighted`].

use crate::syntax::SyntaxNode;

/// Highlight every code block in the tree.
pub fn highlight(nodes: &mut [SyntaxNode], prefix: &str) {
    for node in nodes {
        match node {
            SyntaxNode::Code {
                lang: Some(lang),
                value,
                highlighted,
            } => {
                *highlighted = highlight_code(lang, value, prefix);
            }
            SyntaxNode::Heading { children, .. }
            | SyntaxNode::Link { children, .. }
            | SyntaxNode::Element { children, .. } => highlight(children, prefix),
            SyntaxNode::Code { lang: None, .. }
            | SyntaxNode::Text(_)
            | SyntaxNode::Definition { .. }
            | SyntaxNode::Html(_) => {}
        }
    }
}

/// Highlight a single snippet. `None` means the language is not supported.
pub fn highlight_code(lang: &str, value: &str, prefix: &str) -> Option<Vec<SyntaxNode>> {
    match lang {
        "sh" | "bash" | "shell" => Some(highlight_lines(value, |line| shell_line(line, prefix))),
        "ini" => Some(highlight_lines(value, |line| ini_line(line, prefix))),
        "diff" => Some(highlight_lines(value, |line| diff_line(line, prefix))),
        other => general::highlight(other, value, prefix),
    }
}

fn class(prefix: &str, name: &str) -> String {
    format!("{prefix}{name}")
}

/// Highlight each line and join them with `"\n"` text nodes.
fn highlight_lines(
    value: &str,
    highlight_line: impl Fn(&str) -> Vec<SyntaxNode>,
) -> Vec<SyntaxNode> {
    let mut nodes = Vec::new();
    for (i, line) in value.split('\n').enumerate() {
        if i > 0 {
            nodes.push(SyntaxNode::text("\n"));
        }
        nodes.extend(highlight_line(line));
    }
    nodes
}

fn shell_line(line: &str, prefix: &str) -> Vec<SyntaxNode> {
    let words: Vec<&str> = line.split(' ').collect();
    let mut nodes = Vec::with_capacity(words.len() * 2);
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            nodes.push(SyntaxNode::text(" "));
        }
        let literal = i == 0
            || (i == 1
                && matches!(
                    (words[0], *word),
                    ("npx", _) | ("npm", "i") | ("yarn", "add") | ("pnpm", "add")
                ));
        let node = if i == 0 && matches!(*word, "npx" | "sudo") {
            SyntaxNode::span(&class(prefix, "keyword"), *word)
        } else if literal {
            SyntaxNode::span(&class(prefix, "literal"), *word)
        } else {
            SyntaxNode::text(*word)
        };
        nodes.push(node);
    }
    nodes
}

fn ini_line(line: &str, prefix: &str) -> Vec<SyntaxNode> {
    match line.split_once('=') {
        Some((name, value)) => vec![
            SyntaxNode::span(&class(prefix, "params"), name),
            SyntaxNode::text("="),
            SyntaxNode::span(&class(prefix, "string"), value),
        ],
        None => vec![SyntaxNode::text(line)],
    }
}

fn diff_line(line: &str, prefix: &str) -> Vec<SyntaxNode> {
    let code: String = line.chars().skip(2).collect();
    let kind = match line.chars().next() {
        Some('+') => "addition",
        Some('-') => "deletion",
        _ => "untouched",
    };
    vec![SyntaxNode::span(&class(prefix, kind), code)]
}

/// Tree-sitter highlighting for every other language, through arborium.
///
/// Grammar captures are folded into the small set of classes the site
/// stylesheet knows. Captures outside that set stay plain text.
pub mod general {
    use crate::syntax::SyntaxNode;
    use arborium::Highlighter;
    use std::cell::RefCell;

    thread_local! {
        // Parse contexts are per thread; documents are highlighted on the rayon pool.
        static HIGHLIGHTER: RefCell<Highlighter> = RefCell::new(Highlighter::new());
    }

    /// Languages owned by the line highlighters, including arborium's
    /// aliases for them.
    const LINE_LANGUAGES: &[&str] = &[
        "sh", "shell", "bash", "zsh", "ini", "conf", "cfg", "diff", "patch",
    ];

    /// Class suffix for a tree-sitter capture name such as `keyword.function`.
    pub fn class_for_capture(capture: &str) -> Option<&'static str> {
        let mut parts = capture.split('.');
        let head = parts.next()?;
        match (head, parts.next()) {
            ("comment", _) => Some("comment"),
            ("string" | "character", _) => Some("string"),
            ("number" | "float", _) | ("constant", Some("numeric")) => Some("number"),
            ("boolean", _) | ("constant" | "variable", Some("builtin")) => Some("literal"),
            ("keyword" | "include" | "conditional" | "repeat", _) => Some("keyword"),
            ("tag", _) => Some("tag"),
            ("attribute" | "property", _) => Some("attr"),
            _ => None,
        }
    }

    /// `None` when arborium has no grammar for `lang` or it is a line language.
    pub fn highlight(lang: &str, value: &str, prefix: &str) -> Option<Vec<SyntaxNode>> {
        if LINE_LANGUAGES.contains(&lang) {
            return None;
        }
        let spans = HIGHLIGHTER
            .with(|highlighter| highlighter.borrow_mut().highlight_spans(lang, value))
            .ok()?;

        let mut marks: Vec<(usize, usize, &'static str)> = spans
            .iter()
            .filter_map(|span| {
                let class = class_for_capture(&span.capture)?;
                Some((span.start as usize, span.end as usize, class))
            })
            .collect();
        // Outermost first, so nested captures are skipped below.
        marks.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut nodes = Vec::new();
        let mut cursor = 0;
        for (start, end, class) in marks {
            if start < cursor || start >= end {
                continue;
            }
            let (Some(before), Some(token)) = (value.get(cursor..start), value.get(start..end))
            else {
                continue;
            };
            if !before.is_empty() {
                nodes.push(SyntaxNode::text(before));
            }
            nodes.push(SyntaxNode::span(&format!("{prefix}{class}"), token));
            cursor = end;
        }
        if let Some(rest) = value.get(cursor..).filter(|rest| !rest.is_empty()) {
            nodes.push(SyntaxNode::text(rest));
        }
        Some(nodes)
    }
}
