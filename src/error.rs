//! Crate-level error type.

use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout restruct.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A system message at or above the halt level aborted processing.
    #[error("halted by level-{level} system message at line {}: {message}", line.map_or("?".to_string(), |l| l.to_string()))]
    Halt {
        level: u8,
        line: Option<usize>,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The XML loader found something that is not a serialized document tree.
    #[error("malformed document XML: {0}")]
    Malformed(String),
}

impl Error {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    /// True for the fatal signal raised by the reporter.
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halt_display_includes_line_and_message() {
        let err = Error::Halt {
            level: 4,
            line: Some(12),
            message: "Unexpected section title.".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("level-4"));
        assert!(text.contains("line 12"));
        assert!(text.contains("Unexpected section title."));
        assert!(err.is_halt());
    }

    #[test]
    fn halt_without_line() {
        let err = Error::Halt {
            level: 3,
            line: None,
            message: "boom".to_string(),
        };
        assert!(err.to_string().contains("line ?"));
    }
}
