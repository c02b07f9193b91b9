//! Style Repacker: absolute `url()`s, collected asset URLs and merged media
//! queries for the generated stylesheets.
//!
//! Each file is parsed into a lossless tree. Every byte of the source lands
//! in some node (whitespace and comments ride along as `before`/`after`
//! text), so a file the repacker has nothing to do for is written back
//! byte-for-byte.
//!
//! ```text
//! @media (min-width: 40em) {      AtRule  name="media" params=" (min-width: 40em) "
//!   .logo {                         Rule    selector=".logo "
//!     background: url(logo.svg);      Declaration text="background: url(logo.svg)"
//!   }
//! }
//! ```
//!
//! `cssparser` supplies the tokens; the tree shape above is all the repacker
//! needs, so declarations stay raw text and are re-tokenized only to find
//! their `url()`s.

use cssparser::{ParseError, ParseErrorKind, Parser, ParserInput, SourceLocation, Token};
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

/// URLs the repacker must not touch: inline data, fragments,
/// protocol-relative and absolute URLs.
static EXTERNAL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:data:|#|//|[A-Za-z][A-Za-z0-9+.-]*://)").expect("valid regex")
});

/// Selector marker of dark-theme rules. Their assets are not precached.
const DARK_SELECTOR: &str = "html.is-dark";

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{}:{}:{}: {}", path.display(), error.line, error.column, error.message)]
    Parse { path: PathBuf, error: CssSyntaxError },
}

/// A fatal problem in a stylesheet. `line` and `column` are 1-based.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{line}:{column}: {message}")]
pub struct CssSyntaxError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// An asset URL found in a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedUrl {
    /// Trimmed condition of the nearest enclosing `@media`.
    pub media: Option<String>,
    /// The URL as written back (always starting with `/`).
    pub url: String,
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    Declaration(Declaration),
    Rule(Rule),
    AtRule(AtRule),
}

/// Anything that ends with `;` (or the end of its block) instead of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub before: String,
    pub text: String,
    pub semicolon: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub before: String,
    /// Raw selector, including whitespace before `{`.
    pub selector: String,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub before: String,
    /// Name without the `@`.
    pub name: String,
    /// Raw prelude between the name and `{` or `;`.
    pub params: String,
    pub block: Option<Block>,
    pub semicolon: bool,
}

/// Contents of `{ ... }`, or of a whole stylesheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub nodes: Vec<CssNode>,
    /// Whitespace and comments after the last node.
    pub after: String,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{node}")?;
        }
        f.write_str(&self.after)
    }
}

impl fmt::Display for CssNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CssNode::Declaration(decl) => {
                write!(f, "{}{}", decl.before, decl.text)?;
                if decl.semicolon {
                    f.write_str(";")?;
                }
                Ok(())
            }
            CssNode::Rule(rule) => {
                write!(f, "{}{}{{{}}}", rule.before, rule.selector, rule.block)
            }
            CssNode::AtRule(at) => {
                write!(f, "{}@{}{}", at.before, at.name, at.params)?;
                if let Some(block) = &at.block {
                    write!(f, "{{{block}}}")?;
                } else if at.semicolon {
                    f.write_str(";")?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum CssIssue {
    UnexpectedCloseBrace,
    UnclosedBlock,
    UnclosedBracket,
    BadString,
    BadUrl,
}

impl fmt::Display for CssIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CssIssue::UnexpectedCloseBrace => "Unexpected }",
            CssIssue::UnclosedBlock => "Unclosed block",
            CssIssue::UnclosedBracket => "Unclosed bracket",
            CssIssue::BadString => "Unclosed string",
            CssIssue::BadUrl => "Bad url()",
        })
    }
}

fn issue<'i>(location: SourceLocation, issue: CssIssue) -> ParseError<'i, CssIssue> {
    ParseError {
        kind: ParseErrorKind::Custom(issue),
        location,
    }
}

/// How a rule, at-rule or declaration ended.
enum ItemEnd {
    Semicolon,
    Block(Block),
    Eof,
}

/// Parse a whole stylesheet.
pub fn parse_stylesheet(source: &str) -> Result<Block, CssSyntaxError> {
    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);
    parse_block(&mut parser).map_err(|error| {
        let message = match &error.kind {
            ParseErrorKind::Custom(issue) => issue.to_string(),
            ParseErrorKind::Basic(basic) => format!("{basic:?}"),
        };
        CssSyntaxError {
            line: error.location.line + 1,
            column: error.location.column,
            message,
        }
    })
}

fn leading_trivia(parser: &mut Parser<'_, '_>) -> String {
    let start = parser.position();
    loop {
        let state = parser.state();
        let trivia = matches!(
            parser.next_including_whitespace_and_comments(),
            Ok(Token::WhiteSpace(_) | Token::Comment(_))
        );
        if !trivia {
            parser.reset(&state);
            break;
        }
    }
    parser.slice_from(start).to_string()
}

fn parse_block<'i>(parser: &mut Parser<'i, '_>) -> Result<Block, ParseError<'i, CssIssue>> {
    let mut nodes = Vec::new();
    loop {
        let before = leading_trivia(parser);
        let state = parser.state();
        let item_start = parser.position();
        let first = parser
            .next_including_whitespace_and_comments()
            .map(|token| matches!(token, Token::AtKeyword(_)));
        let name = match first {
            Err(_) => return Ok(Block { nodes, after: before }),
            Ok(true) => Some(parser.slice_from(item_start)[1..].to_string()),
            Ok(false) => {
                parser.reset(&state);
                None
            }
        };

        let prelude_start = parser.position();
        let (prelude_end, end) = scan_prelude(parser)?;
        let prelude = parser.slice(prelude_start..prelude_end).to_string();

        let node = match (name, end) {
            (Some(name), end) => CssNode::AtRule(AtRule {
                before,
                name,
                params: prelude,
                semicolon: matches!(end, ItemEnd::Semicolon),
                block: match end {
                    ItemEnd::Block(block) => Some(block),
                    ItemEnd::Semicolon | ItemEnd::Eof => None,
                },
            }),
            (None, ItemEnd::Block(block)) => CssNode::Rule(Rule {
                before,
                selector: prelude,
                block,
            }),
            (None, end) => CssNode::Declaration(Declaration {
                before,
                text: prelude,
                semicolon: matches!(end, ItemEnd::Semicolon),
            }),
        };
        nodes.push(node);
    }
}

/// Consume tokens up to `;`, a `{}` block or the end of the current block.
///
/// Returns the position where the prelude text ends.
fn scan_prelude<'i>(
    parser: &mut Parser<'i, '_>,
) -> Result<(cssparser::SourcePosition, ItemEnd), ParseError<'i, CssIssue>> {
    loop {
        let token_start = parser.position();
        let location = parser.current_source_location();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok((token_start, ItemEnd::Eof)),
        };
        match token {
            Token::Semicolon => return Ok((token_start, ItemEnd::Semicolon)),
            Token::CurlyBracketBlock => {
                let block = parse_closed(parser, location, CssIssue::UnclosedBlock, |p| {
                    parse_block(p)
                })?;
                return Ok((token_start, ItemEnd::Block(block)));
            }
            Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock => {
                parse_closed(parser, location, CssIssue::UnclosedBracket, |p| {
                    check_nested(p)
                })?;
            }
            Token::CloseCurlyBracket => {
                return Err(issue(location, CssIssue::UnexpectedCloseBrace));
            }
            Token::BadString(_) => return Err(issue(location, CssIssue::BadString)),
            Token::BadUrl(_) => return Err(issue(location, CssIssue::BadUrl)),
            _ => {}
        }
    }
}

/// Walk a `()`/`[]` group looking for malformed strings and URLs.
fn check_nested<'i>(parser: &mut Parser<'i, '_>) -> Result<(), ParseError<'i, CssIssue>> {
    loop {
        let location = parser.current_source_location();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };
        match token {
            Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock => {
                parse_closed(parser, location, CssIssue::UnclosedBracket, |p| {
                    check_nested(p)
                })?
            }
            Token::CurlyBracketBlock => {
                parse_closed(parser, location, CssIssue::UnclosedBlock, |p| check_nested(p))?
            }
            Token::BadString(_) => return Err(issue(location, CssIssue::BadString)),
            Token::BadUrl(_) => return Err(issue(location, CssIssue::BadUrl)),
            _ => {}
        }
    }
}

/// Run `parse` over the block just opened and require its closing token.
///
/// The nested parser stops before the closer, so a block that ran to the end
/// of the input leaves the outer position where the nested one stopped.
fn parse_closed<'i, T, F>(
    parser: &mut Parser<'i, '_>,
    location: SourceLocation,
    unclosed: CssIssue,
    parse: F,
) -> Result<T, ParseError<'i, CssIssue>>
where
    F: for<'tt> FnOnce(&mut Parser<'i, 'tt>) -> Result<T, ParseError<'i, CssIssue>>,
{
    let (value, inner_end) = parser.parse_nested_block(|p| {
        let value = parse(p)?;
        Ok::<_, ParseError<'i, CssIssue>>((value, p.position()))
    })?;
    if parser.position() == inner_end {
        return Err(issue(location, unclosed));
    }
    Ok(value)
}

// ============================================================================
// url() rewriting
// ============================================================================

/// A `url()` inside declaration text.
struct UrlToken {
    value: String,
    /// Byte offset where a `/` goes to make the URL absolute.
    insert_at: usize,
}

fn find_urls<'i>(parser: &mut Parser<'i, '_>, found: &mut Vec<UrlToken>) {
    loop {
        let start = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return,
        };
        match token {
            Token::UnquotedUrl(value) => {
                let raw = parser.slice_from(start);
                let open = raw.find('(').map_or(raw.len(), |i| i + 1);
                let leading = raw[open..].len() - raw[open..].trim_start().len();
                found.push(UrlToken {
                    value: value.to_string(),
                    insert_at: start.byte_index() + open + leading,
                });
            }
            Token::Function(name) if name.eq_ignore_ascii_case("url") => {
                let _ = parser.parse_nested_block(|p| -> Result<(), ParseError<'i, ()>> {
                    p.skip_whitespace();
                    let string_start = p.position();
                    let value = p.expect_string_cloned()?;
                    found.push(UrlToken {
                        value: value.to_string(),
                        // after the opening quote
                        insert_at: string_start.byte_index() + 1,
                    });
                    Ok(())
                });
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let _ = parser.parse_nested_block(|p| -> Result<(), ParseError<'i, ()>> {
                    find_urls(p, found);
                    Ok(())
                });
            }
            _ => {}
        }
    }
}

/// Make every local `url()` in `text` absolute.
///
/// Returns the rewritten text and the URLs in source order.
pub fn rewrite_urls(text: &str) -> (String, Vec<String>) {
    let mut found = Vec::new();
    {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        find_urls(&mut parser, &mut found);
    }

    let mut rewritten = text.to_string();
    let mut urls = Vec::new();
    let mut inserts = Vec::new();
    for token in found {
        if token.value.is_empty() || EXTERNAL_URL.is_match(&token.value) {
            continue;
        }
        if token.value.starts_with('/') {
            urls.push(token.value);
        } else {
            inserts.push(token.insert_at);
            urls.push(format!("/{}", token.value));
        }
    }
    for at in inserts.into_iter().rev() {
        rewritten.insert(at, '/');
    }
    (rewritten, urls)
}

fn visit(nodes: &mut [CssNode], media: Option<&str>, dark: bool, urls: &mut Vec<CollectedUrl>) {
    for node in nodes {
        match node {
            CssNode::Declaration(decl) => {
                if !decl.text.to_ascii_lowercase().contains("url(") {
                    continue;
                }
                let (text, found) = rewrite_urls(&decl.text);
                decl.text = text;
                if !dark {
                    urls.extend(found.into_iter().map(|url| CollectedUrl {
                        media: media.map(str::to_string),
                        url,
                    }));
                }
            }
            CssNode::Rule(rule) => {
                let dark = dark || rule.selector.contains(DARK_SELECTOR);
                visit(&mut rule.block.nodes, media, dark, urls);
            }
            CssNode::AtRule(AtRule {
                name,
                params,
                block: Some(block),
                ..
            }) => {
                let media = if name.eq_ignore_ascii_case("media") {
                    Some(params.trim())
                } else {
                    media
                };
                visit(&mut block.nodes, media, dark, urls);
            }
            CssNode::AtRule(_) => {}
        }
    }
}

// ============================================================================
// Media merging
// ============================================================================

fn media_key(node: &CssNode) -> Option<String> {
    match node {
        CssNode::AtRule(at) if at.block.is_some() && at.name.eq_ignore_ascii_case("media") => {
            Some(at.params.trim().to_string())
        }
        _ => None,
    }
}

/// Merge root-level `@media` blocks with the same condition.
///
/// Children of every occurrence move, in order, into the last one. Blocks
/// whose condition appears once are left untouched.
pub fn merge_media(sheet: &mut Block) {
    let keys: Vec<Option<String>> = sheet.nodes.iter().map(media_key).collect();
    let mut last: HashMap<&str, usize> = HashMap::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (i, key) in keys.iter().enumerate() {
        if let Some(key) = key {
            last.insert(key, i);
            *counts.entry(key).or_default() += 1;
        }
    }
    if counts.values().all(|&count| count < 2) {
        return;
    }

    let mut pending: HashMap<&str, Vec<CssNode>> = HashMap::new();
    let mut merged = Vec::with_capacity(sheet.nodes.len());
    for (i, node) in std::mem::take(&mut sheet.nodes).into_iter().enumerate() {
        let Some(key) = keys[i].as_deref() else {
            merged.push(node);
            continue;
        };
        match node {
            CssNode::AtRule(AtRule {
                block: Some(block), ..
            }) if last[key] != i => {
                pending.entry(key).or_default().extend(block.nodes);
            }
            CssNode::AtRule(mut at) => {
                if let (Some(mut earlier), Some(block)) = (pending.remove(key), at.block.as_mut()) {
                    earlier.append(&mut block.nodes);
                    block.nodes = earlier;
                }
                merged.push(CssNode::AtRule(at));
            }
            other => merged.push(other),
        }
    }
    sheet.nodes = merged;
}

// ============================================================================
// Files
// ============================================================================

/// A repacked stylesheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Repacked {
    pub css: String,
    pub urls: Vec<CollectedUrl>,
}

/// Rewrite URLs, collect them and merge media queries in one stylesheet.
pub fn repack_css(source: &str) -> Result<Repacked, CssSyntaxError> {
    let mut sheet = parse_stylesheet(source)?;
    let mut urls = Vec::new();
    visit(&mut sheet.nodes, None, false, &mut urls);
    merge_media(&mut sheet);
    Ok(Repacked {
        css: sheet.to_string(),
        urls,
    })
}

/// Repack one file in place.
pub fn repack_file(path: &Path) -> Result<Vec<CollectedUrl>, StyleError> {
    let source = std::fs::read_to_string(path)?;
    let repacked = repack_css(&source).map_err(|error| StyleError::Parse {
        path: path.to_path_buf(),
        error,
    })?;
    if repacked.css != source {
        std::fs::write(path, &repacked.css)?;
    }
    tracing::debug!("Repacked {} ({} urls)", path.display(), repacked.urls.len());
    Ok(repacked.urls)
}

/// Repack every file, keeping the collected URLs of each file apart.
pub fn repack_each(files: &[PathBuf]) -> Result<Vec<Vec<CollectedUrl>>, StyleError> {
    let per_file = files
        .par_iter()
        .map(|file| repack_file(file))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(
        "Repacked {} stylesheets, {} urls",
        files.len(),
        per_file.iter().map(Vec::len).sum::<usize>()
    );
    Ok(per_file)
}

/// Repack every file; collected URLs follow the order of `files`.
pub fn repack_styles(files: &[PathBuf]) -> Result<Vec<CollectedUrl>, StyleError> {
    Ok(repack_each(files)?.into_iter().flatten().collect())
}

/// All `*.css` files below `root`, sorted.
pub fn find_css_files(root: &Path) -> Result<Vec<PathBuf>, StyleError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "css") {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::setup_fixtures;
    use std::fs;
    use tempfile::TempDir;

    fn repack(source: &str) -> Repacked {
        repack_css(source).unwrap()
    }

    fn url(media: Option<&str>, url: &str) -> CollectedUrl {
        CollectedUrl {
            media: media.map(str::to_string),
            url: url.to_string(),
        }
    }

    // =========================================================================
    // Lossless round trip
    // =========================================================================

    #[test]
    fn untouched_file_is_byte_identical() {
        let source = "/* theme */\n@charset \"utf-8\";\n@import 'base.css' screen;\n\n\
                      :root {\n  --accent: #f00 ;\n}\n\
                      a:hover,\na:focus { color : red !important; margin:0 }\n\
                      @media (min-width: 40em) {\n  .a { b: c }\n  /* end */\n}\n\
                      @font-face{font-family:X}\n   ";
        assert_eq!(repack(source).css, source);
    }

    #[test]
    fn nested_rules_round_trip() {
        let source = ".card {\n  color: red;\n  &:hover { color: blue; }\n}\n";
        assert_eq!(repack(source).css, source);
    }

    #[test]
    fn empty_file() {
        assert_eq!(repack("").css, "");
        assert!(repack("").urls.is_empty());
    }

    #[test]
    fn tree_shape() {
        let sheet = parse_stylesheet("@media print { a { b: c; } }").unwrap();
        let CssNode::AtRule(at) = &sheet.nodes[0] else {
            panic!("expected at-rule");
        };
        assert_eq!(at.name, "media");
        assert_eq!(at.params, " print ");
        let block = at.block.as_ref().unwrap();
        let CssNode::Rule(rule) = &block.nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.selector, "a ");
        assert_eq!(
            rule.block.nodes[0],
            CssNode::Declaration(Declaration {
                before: " ".to_string(),
                text: "b: c".to_string(),
                semicolon: true,
            })
        );
    }

    // =========================================================================
    // URLs
    // =========================================================================

    #[test]
    fn unquoted_url_made_absolute() {
        let result = repack("a { background: url(img/logo.svg) }");
        assert_eq!(result.css, "a { background: url(/img/logo.svg) }");
        assert_eq!(result.urls, vec![url(None, "/img/logo.svg")]);
    }

    #[test]
    fn quoting_is_preserved() {
        let result = repack("a { b: url('x.png'); c: url( \"y.png\" ) }");
        assert_eq!(result.css, "a { b: url('/x.png'); c: url( \"/y.png\" ) }");
        assert_eq!(result.urls, vec![url(None, "/x.png"), url(None, "/y.png")]);
    }

    #[test]
    fn absolute_url_collected_unchanged() {
        let result = repack("a { b: url(/x.png) }");
        assert_eq!(result.css, "a { b: url(/x.png) }");
        assert_eq!(result.urls, vec![url(None, "/x.png")]);
    }

    #[test]
    fn external_and_inline_urls_ignored() {
        let source = "a { b: url(data:image/png;base64,AAA); c: url(#f); \
                      d: url(//cdn.test/x.png); e: url('https://logux.org/a.png') }";
        let result = repack(source);
        assert_eq!(result.css, source);
        assert!(result.urls.is_empty());
    }

    #[test]
    fn urls_nested_in_functions() {
        let result = repack("a { b: image-set(url(a.png) 1x, url('b.png') 2x) }");
        assert_eq!(
            result.css,
            "a { b: image-set(url(/a.png) 1x, url('/b.png') 2x) }"
        );
        assert_eq!(result.urls, vec![url(None, "/a.png"), url(None, "/b.png")]);
    }

    #[test]
    fn media_condition_is_recorded() {
        let result = repack("@media ( min-width: 40em ) { a { b: url(wide.png) } }");
        assert_eq!(
            result.urls,
            vec![url(Some("( min-width: 40em )"), "/wide.png")]
        );
    }

    #[test]
    fn dark_rules_rewritten_but_not_collected() {
        let result = repack(
            "@media (prefers-color-scheme: dark) { html.is-dark a { b: url(dark.png) } a { b: url(light.png) } }",
        );
        assert!(result.css.contains("url(/dark.png)"));
        assert_eq!(
            result.urls,
            vec![url(Some("(prefers-color-scheme: dark)"), "/light.png")]
        );
    }

    #[test]
    fn font_face_urls_collected() {
        let result = repack("@font-face { src: url(font.woff2) format('woff2') }");
        assert_eq!(result.urls, vec![url(None, "/font.woff2")]);
    }

    // =========================================================================
    // Media merging
    // =========================================================================

    #[test]
    fn duplicate_media_merged_into_last() {
        let source = "@media (a) {\n  x {}\n}\ny {}\n@media (a) {\n  z {}\n}\n";
        assert_eq!(
            repack(source).css,
            "\ny {}\n@media (a) {\n  x {}\n  z {}\n}\n"
        );
    }

    #[test]
    fn conditions_compared_trimmed() {
        let source = "@media (a){x{}}@media  (a)  {z{}}";
        assert_eq!(repack(source).css, "@media  (a)  {x{}z{}}");
    }

    #[test]
    fn different_conditions_not_merged() {
        let source = "@media (a){x{}}@media (b){y{}}";
        assert_eq!(repack(source).css, source);
    }

    #[test]
    fn urls_collected_before_merge_in_source_order() {
        let source = "@media (a){x{b:url(1.png)}}y{b:url(2.png)}@media (a){z{b:url(3.png)}}";
        let result = repack(source);
        let urls: Vec<&str> = result.urls.iter().map(|u| u.url.as_str()).collect();
        assert_eq!(urls, vec!["/1.png", "/2.png", "/3.png"]);
    }

    #[test]
    fn repack_is_idempotent() {
        let source = "@media (a){x{b:url(1.png)}}@media (a){z{}}";
        let once = repack(source).css;
        assert_eq!(repack(&once).css, once);
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn stray_close_brace_reports_location() {
        let error = repack_css("a { color: red; }}").unwrap_err();
        assert_eq!(error.line, 1);
        assert_eq!(error.column, 18);
        assert_eq!(error.message, "Unexpected }");
    }

    #[test]
    fn unclosed_block_is_error() {
        let error = repack_css("a {}\nb { color: red").unwrap_err();
        assert_eq!(error.line, 2);
        assert_eq!(error.message, "Unclosed block");
    }

    #[test]
    fn unclosed_function_is_error() {
        let error = repack_css("a { b: calc(1px + 2px }").unwrap_err();
        assert_eq!(error.line, 1);
        assert_eq!(error.column, 8);
        assert_eq!(error.message, "Unclosed bracket");
    }

    #[test]
    fn unclosed_attribute_selector_is_error() {
        let error = repack_css("a[href { b: url(x.png) }").unwrap_err();
        assert_eq!(error.message, "Unclosed bracket");
    }

    #[test]
    fn closed_inner_group_does_not_close_outer() {
        let error = repack_css("a { b: f(g(1) }").unwrap_err();
        assert_eq!(error.message, "Unclosed bracket");

        let error = repack_css("@media print { a { b: c }").unwrap_err();
        assert_eq!(error.message, "Unclosed block");
    }

    #[test]
    fn balanced_groups_pass() {
        let repacked = repack_css("a[href] { b: calc((1px + 2px) * 2) }").unwrap();
        assert_eq!(repacked.css, "a[href] { b: calc((1px + 2px) * 2) }");
    }

    #[test]
    fn bad_string_is_error() {
        let error = repack_css("a { content: \"x\n}").unwrap_err();
        assert_eq!(error.message, "Unclosed string");
    }

    // =========================================================================
    // Files
    // =========================================================================

    #[test]
    fn repack_styles_rewrites_in_place_in_input_order() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.css");
        let b = tmp.path().join("b.css");
        fs::write(&a, "a { b: url(a.png) }").unwrap();
        fs::write(&b, "@media print { b { c: url(b.png) } }").unwrap();

        let urls = repack_styles(&[b.clone(), a.clone()]).unwrap();
        assert_eq!(
            urls,
            vec![url(Some("print"), "/b.png"), url(None, "/a.png")]
        );
        assert_eq!(fs::read_to_string(&a).unwrap(), "a { b: url(/a.png) }");
    }

    #[test]
    fn parse_error_names_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("broken.css");
        fs::write(&file, "}").unwrap();
        let error = repack_styles(&[file]).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("broken.css:1:1"), "{message}");
    }

    #[test]
    fn fixture_stylesheet() {
        let tmp = setup_fixtures();
        let css = tmp.path().join("assets/style.css");
        let urls = repack_styles(std::slice::from_ref(&css)).unwrap();
        assert_eq!(urls, vec![url(None, "/logo.svg")]);

        let result = fs::read_to_string(&css).unwrap();
        assert_eq!(result.matches("@media (min-width: 40em)").count(), 1);
        assert!(result.contains("url(\"/logo.svg\")"));
        assert!(result.starts_with("/* Logux docs */\nbody {\n  margin: 0;"));
    }

    #[test]
    fn find_css_files_recurses() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("guide")).unwrap();
        fs::write(tmp.path().join("style.css"), "").unwrap();
        fs::write(tmp.path().join("guide/page.css"), "").unwrap();
        fs::write(tmp.path().join("guide/index.html"), "").unwrap();
        let files = find_css_files(tmp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "css"));
    }
}
