//! Serializers for the document tree.

pub mod pseudoxml;
pub mod xml;

use std::fmt;
use std::str::FromStr;

use crate::nodes::Document;

/// Output format of [`write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Indented tree dump, one node per line.
    #[default]
    PseudoXml,
    /// The Docutils generic XML vocabulary.
    Xml,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pseudoxml" | "pseudo-xml" | "pxml" => Ok(Format::PseudoXml),
            "xml" => Ok(Format::Xml),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::PseudoXml => "pseudoxml",
            Format::Xml => "xml",
        })
    }
}

/// Serialize the whole document.
pub fn write(doc: &Document, format: Format) -> String {
    match format {
        Format::PseudoXml => pseudoxml::pformat(doc, doc.root()),
        Format::Xml => xml::to_xml(doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!("xml".parse::<Format>().unwrap(), Format::Xml);
        assert_eq!("PseudoXML".parse::<Format>().unwrap(), Format::PseudoXml);
        assert!("html".parse::<Format>().is_err());
        assert_eq!(Format::Xml.to_string(), "xml");
    }
}
