//! # logux-site
//!
//! Build pipeline for the Logux documentation website: markdown documents
//! become styled HTML pages, stylesheets get their asset URLs absolutized and
//! their media queries merged, and a cache-first service worker makes the
//! result readable offline.
//!
//! # Architecture: Three Independent Components
//!
//! ```text
//! Doc Transformer   docs/**/*.md  →  article trees  →  dist/<path>/index.html
//! Style Repacker    dist/**/*.css →  rewritten in place + collected URLs
//! Offline Worker    dist/**       →  dist/sw.js (manifest injected)
//! ```
//!
//! The components share nothing but [`config::SiteConfig`]. The CLI runs them
//! separately (`docs`, `styles`, `worker`) or in sequence (`build`).
//!
//! ## The Doc Transformer Passes
//!
//! A document is parsed once and then run through a fixed, ordered list of
//! passes. Each pass is a plain function over an owned tree:
//!
//! ```text
//! syntax::parse        markdown → Vec<SyntaxNode>
//! convert::convert     readme <img>, npm/pnpm/Yarn, title, links
//! highlight::highlight sh/bash/ini/diff lines, arborium grammars
//! markup::from_syntax  Vec<SyntaxNode> → Vec<MarkupNode>
//! markup::reparse_raw  raw HTML → real elements (html5ever)
//! article::wrap_in_article
//! video::insert_videos Youtube:<id> <alt> paragraphs
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`docs`] | Doc Transformer entry points: file discovery and the pass pipeline |
//! | [`syntax`] | Markdown syntax tree built from `pulldown-cmark` events |
//! | [`convert`] | Documentation conventions on the syntax tree |
//! | [`highlight`] | Code block highlighters producing classed spans |
//! | [`markup`] | HTML-shaped tree, raw HTML re-parsing and serialization |
//! | [`article`] | Single `article` wrapper with edit links on `h1` |
//! | [`video`] | YouTube thumbnail links |
//! | [`generate`] | Page shell (Maud), heading slugs, page files, asset copy |
//! | [`styles`] | Style Repacker over a lossless `cssparser` tree |
//! | [`worker`] | Offline Cache Worker: script rendering and a behavioural model |
//! | [`config`] | `logux-site.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting for each stage |
//!
//! # Design Decisions
//!
//! ## Owned Trees, Rebuilt Per Pass
//!
//! Passes that replace nodes (the npm expansion turns one code block into
//! three `details`) rebuild the tree with [`convert::flat_map`] instead of
//! mutating siblings in place. Passes that only annotate (`highlight`,
//! `insert_videos`) walk `&mut` trees. Nothing is shared between nodes.
//!
//! ## Lossless CSS
//!
//! Stylesheets are written back in place, so a file the repacker has nothing
//! to do for must come out byte-identical. The [`styles`] tree keeps every
//! byte of whitespace and comments instead of re-serializing from tokens.
//!
//! ## A Worker You Can Test
//!
//! The browser script is a template rendered at build time. Its install and
//! fetch semantics are mirrored by [`worker::OfflineWorker`] over an
//! in-memory [`worker::CacheStorage`], so eviction, all-or-nothing precache
//! and query-insensitive matching are covered by ordinary unit tests.

pub mod article;
pub mod config;
pub mod convert;
pub mod docs;
pub mod generate;
pub mod highlight;
pub mod markup;
pub mod output;
pub mod styles;
pub mod syntax;
pub mod video;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_helpers;
