//! Readers that build a document tree from something other than markup.

pub mod xml;

pub use xml::from_xml;
