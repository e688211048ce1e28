//! Parser module containing the block and inline parsers.

pub mod block_parser;
pub(crate) mod directives;
pub(crate) mod inline_parser;
pub mod line_source;
pub(crate) mod roles;
pub(crate) mod tables;

pub use block_parser::BlockParser;
pub use line_source::{Block, LineSource, string_to_lines};

use crate::config::Settings;
use crate::error::Result;
use crate::nodes::Document;

/// Parses a reStructuredText string into a document tree.
///
/// The tree is returned as the parser left it: references are not resolved
/// and `pending` nodes are still in place until [`crate::transform`] runs.
///
/// # Examples
///
/// ```rust
/// use restruct::{Settings, parse};
///
/// let doc = parse("Some *emphasis*.\n", &Settings::default()).unwrap();
/// assert_eq!(doc.astext(doc.root()), "Some emphasis.");
/// ```
///
/// # Errors
///
/// Fails with [`crate::Error::Halt`] when a system message reaches the
/// halt level.
pub fn parse(text: &str, settings: &Settings) -> Result<Document> {
    let mut doc = Document::new(settings.clone());
    let lines = LineSource::from_text(text, doc.settings.tab_width);
    BlockParser::new(&mut doc).parse(lines)?;
    Ok(doc)
}
