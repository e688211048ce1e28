//! Glue between reading, transforming and writing a document.

use crate::config::Settings;
use crate::error::Result;
use crate::nodes::Document;
use crate::transforms::{Pipeline, transform};
use crate::writers::{self, Format};

/// A configured read/transform/write run.
///
/// The free functions [`publish`] and [`publish_doctree`] cover the common
/// case; a `Publisher` is useful to reuse one setup for many inputs or to
/// run a custom [`Pipeline`].
pub struct Publisher {
    settings: Settings,
    pipeline: Pipeline,
    format: Format,
}

impl Publisher {
    /// The standard pipeline, writing pseudo-XML.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            pipeline: Pipeline::standard(),
            format: Format::default(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Parse and transform `text`.
    pub fn doctree(&self, text: &str) -> Result<Document> {
        let mut doc = crate::parser::parse(text, &self.settings)?;
        log::debug!(
            "Parsed {} with {} messages",
            self.settings.source_name(),
            doc.parse_messages.len()
        );
        transform(&mut doc, &self.pipeline)?;
        Ok(doc)
    }

    /// Parse, transform and serialize `text`.
    pub fn publish(&self, text: &str) -> Result<String> {
        let doc = self.doctree(text)?;
        Ok(writers::write(&doc, self.format))
    }

    /// Transform a tree loaded from this crate's XML output and serialize it
    /// again.
    pub fn publish_xml(&self, xml: &str) -> Result<String> {
        let mut doc = crate::readers::from_xml(xml, self.settings.clone())?;
        transform(&mut doc, &self.pipeline)?;
        Ok(writers::write(&doc, self.format))
    }
}

/// Parse `text`, run the standard transforms and serialize the result.
///
/// # Errors
///
/// Fails with [`crate::Error::Halt`] when a system message reaches the
/// halt level, during parsing or during transforms.
pub fn publish(text: &str, settings: &Settings, format: Format) -> Result<String> {
    Publisher::new(settings.clone()).format(format).publish(text)
}

/// Parse `text` and run the standard transforms.
pub fn publish_doctree(text: &str, settings: &Settings) -> Result<Document> {
    Publisher::new(settings.clone()).doctree(text)
}
