//! A reStructuredText parser and document-transformation engine.
//!
//! Text goes through three stages: [`parse`] builds a document tree,
//! [`transform`] resolves references, numbers footnotes and promotes
//! titles, and a writer serializes the result. [`publish`] runs all three.
//!
//! ```no_run
//! use restruct::{Format, Settings, publish};
//!
//! let out = publish("Title\n=====\n\nSome *text*.\n", &Settings::default(), Format::PseudoXml)
//!     .unwrap();
//! print!("{out}");
//! ```

pub mod config;
pub mod error;
pub mod languages;
pub mod nodes;
pub mod parser;
pub mod publisher;
pub mod readers;
pub mod reporter;
pub mod transforms;
pub mod utils;
pub mod writers;

pub use config::{Settings, SettingsBuilder};
pub use error::{Error, Result};
pub use nodes::{Document, Kind, NodeId};
pub use parser::parse;
pub use publisher::{Publisher, publish, publish_doctree};
pub use readers::from_xml;
pub use transforms::{Pipeline, transform};
pub use writers::Format;

#[cfg(test)]
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
