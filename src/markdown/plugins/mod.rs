//! AST plugin chain
//!
//! Each plugin rewrites the comrak tree between parsing and HTML rendering.
//! The chain is rebuilt for every render, so no plugin state outlives one
//! document. Order matters: math placeholders are resolved before any
//! text-rewriting plugin runs, and heading wrappers are added last so no
//! other plugin sees them.

mod blocks;
mod code;
mod footnote;
mod inline;
mod math;
mod toc;

pub use blocks::{HeadingWrapper, ImplicitFigures, Multiquote, TableContainer};
pub use code::CodeFence;
pub use footnote::Footnotes;
pub use inline::{InlineMarks, Ruby};
pub use math::MathExpansion;
pub use toc::TableOfContents;

use comrak::nodes::AstNode;
use comrak::Arena;

use crate::error::Result;
use crate::markdown::math::MathExtraction;
use crate::markdown::parser::MarkdownOptions;

/// Per-render state shared with every plugin.
pub struct RenderContext<'o> {
    /// Parser options for this render
    pub options: &'o MarkdownOptions,
    /// Math spans lifted out of the source
    pub math: MathExtraction,
}

/// A rewrite pass over the parsed document.
pub trait AstPlugin {
    /// Short identifier, used in logs
    fn name(&self) -> &'static str;

    /// Rewrite the tree rooted at `root`.
    fn run<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        root: &'a AstNode<'a>,
        ctx: &RenderContext<'_>,
    ) -> Result<()>;
}

/// The plugin chain in application order.
///
/// Definition lists, emoji shortcodes and task lists are handled by comrak
/// extensions and need no pass of their own.
pub fn default_chain(options: &MarkdownOptions) -> Vec<Box<dyn AstPlugin>> {
    let mut chain: Vec<Box<dyn AstPlugin>> = Vec::new();
    if options.math {
        chain.push(Box::new(MathExpansion));
    }
    chain.push(Box::new(CodeFence));
    if options.tables {
        chain.push(Box::new(TableContainer));
    }
    if options.footnotes {
        chain.push(Box::new(Footnotes));
    }
    chain.push(Box::new(TableOfContents));
    chain.push(Box::new(Ruby));
    chain.push(Box::new(ImplicitFigures));
    chain.push(Box::new(Multiquote));
    chain.push(Box::new(InlineMarks));
    chain.push(Box::new(HeadingWrapper));
    chain
}
