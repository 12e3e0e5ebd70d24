//! Markdown parsing and rendering module
//!
//! Turns markdown into the semantic HTML fragment consumed by the theme
//! applicator, using comrak (CommonMark + GFM) plus an ordered plugin chain.
//!
//! # Features
//! - Tables wrapped for horizontal scrolling
//! - Footnotes, table of contents, ruby, implicit figures
//! - Multi-level blockquote classes
//! - `==mark==`, `~~strike~~`, `~sub~`, `^sup^`, emoji shortcodes, task lists
//! - `$…$` / `$$…$$` math rendered to MathML
//! - Fenced code highlighted with syntect, diagram fences passed through
//! - Heading decoration spans
//! - Footnote sync and insertion on raw markdown
//!
//! # Example
//! ```ignore
//! use wemd::markdown::{render_markdown, sync_footnotes};
//!
//! let synced = sync_footnotes("Text[^1]\n\n[^2]: unused\n");
//! let html = render_markdown(&synced.text);
//! ```

pub mod ast;
pub mod footnotes;
pub mod math;
mod parser;
pub mod plugins;
pub mod syntax;

pub use footnotes::{
    insert_footnote, next_footnote_number, sync_footnotes, FootnoteInsertion, FootnoteSync,
};
pub use parser::{create_parser, render_markdown, MarkdownOptions, MarkdownParser};
