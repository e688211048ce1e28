//! Diagnostics: `system_message` nodes plus a one-line-per-message stream.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;

use crate::config::{CategoryLevels, Settings};
use crate::error::{Error, Result};
use crate::nodes::{Document, Kind, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
    Severe = 4,
}

impl Level {
    pub fn name(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Severe => "SEVERE",
        }
    }

    pub fn from_u8(level: u8) -> Level {
        match level {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Warning,
            3 => Level::Error,
            _ => Level::Severe,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where one-line diagnostics go.
#[derive(Debug)]
pub enum Stream {
    Stderr,
    Silent,
    /// Keep lines in memory; see [`Reporter::captured`].
    Capture(Vec<String>),
    File(File),
}

#[derive(Debug)]
pub struct Reporter {
    source: String,
    report_level: u8,
    halt_level: u8,
    debug: bool,
    categories: BTreeMap<String, CategoryLevels>,
    stream: Stream,
    max_level: Option<Level>,
    /// Line used for messages that carry neither a line nor a base node.
    pub(crate) current_line: Option<usize>,
}

impl Reporter {
    pub fn from_settings(settings: &Settings) -> Self {
        let stream = match settings.warning_stream.as_deref() {
            None => Stream::Stderr,
            Some("-") => Stream::Silent,
            Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Stream::File(file),
                Err(e) => {
                    log::warn!("Cannot open warning stream {path}: {e}; using stderr");
                    Stream::Stderr
                }
            },
        };
        Self {
            source: settings.source_name().to_string(),
            report_level: settings.report_level,
            halt_level: settings.halt_level,
            debug: settings.debug,
            categories: settings.categories.clone(),
            stream,
            max_level: None,
            current_line: None,
        }
    }

    pub fn set_stream(&mut self, stream: Stream) {
        self.stream = stream;
    }

    /// Lines written so far when the stream is [`Stream::Capture`].
    pub fn captured(&self) -> &[String] {
        match &self.stream {
            Stream::Capture(lines) => lines,
            _ => &[],
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn report_level(&self) -> u8 {
        self.report_level
    }

    pub fn halt_level(&self) -> u8 {
        self.halt_level
    }

    /// Highest level reported so far.
    pub fn max_level(&self) -> Option<Level> {
        self.max_level
    }

    fn thresholds(&self, category: Option<&str>) -> (u8, u8) {
        let levels = category.and_then(|c| self.categories.get(c));
        (
            levels
                .and_then(|l| l.report_level)
                .unwrap_or(self.report_level),
            levels.and_then(|l| l.halt_level).unwrap_or(self.halt_level),
        )
    }

    fn write(&mut self, level: Level, line: Option<usize>, message: &str) {
        let location = match line {
            Some(line) => format!("{}:{line}:", self.source),
            None => format!("{}:", self.source),
        };
        let text = format!("{location} ({}/{}) {message}", level.name(), level as u8);
        match &mut self.stream {
            Stream::Stderr => eprintln!("{text}"),
            Stream::Silent => {}
            Stream::Capture(lines) => lines.push(text),
            Stream::File(file) => {
                if let Err(e) = writeln!(file, "{text}") {
                    log::warn!("Failed to write diagnostic: {e}");
                }
            }
        }
    }
}

/// Builder for one system message; see [`Document::system_message`].
#[must_use = "a system message does nothing until emitted"]
pub struct MessageBuilder<'d> {
    doc: &'d mut Document,
    level: Level,
    message: String,
    line: Option<usize>,
    base: Option<NodeId>,
    literal: Option<String>,
    backrefs: Vec<String>,
    children: Vec<NodeId>,
    category: Option<&'static str>,
}

impl MessageBuilder<'_> {
    pub fn line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn line_opt(mut self, line: Option<usize>) -> Self {
        self.line = line.or(self.line);
        self
    }

    /// Take the line number from `node`, or its nearest ancestor with one,
    /// unless one is set explicitly.
    pub fn base_node(mut self, node: NodeId) -> Self {
        self.base = Some(node);
        self
    }

    /// Attach the offending source text as a literal block.
    pub fn literal(mut self, text: impl Into<String>) -> Self {
        self.literal = Some(text.into());
        self
    }

    pub fn backref(mut self, id: impl Into<String>) -> Self {
        self.backrefs.push(id.into());
        self
    }

    /// Extra children placed after the message paragraph.
    pub fn child(mut self, node: NodeId) -> Self {
        self.children.push(node);
        self
    }

    pub fn category(mut self, category: &'static str) -> Self {
        self.category = Some(category);
        self
    }

    /// Build the `system_message` node, write the stream line and raise
    /// [`Error::Halt`] when the level reaches the halt threshold.
    pub fn emit(self) -> Result<NodeId> {
        let MessageBuilder {
            doc,
            level,
            message,
            line,
            base,
            literal,
            backrefs,
            children,
            category,
        } = self;

        let line = line
            .or_else(|| base.and_then(|b| doc.source_line(b)))
            .or(doc.reporter.current_line);

        let msg = doc.new_element(Kind::SystemMessage);
        let source = doc.reporter.source.clone();
        doc.set_attr(msg, "level", level as i64);
        doc.set_attr(msg, "type", level.name());
        doc.set_attr(msg, "source", source);
        if let Some(line) = line {
            doc.set_attr(msg, "line", line);
            doc.set_line(msg, line);
        }
        for backref in backrefs {
            doc.push_attr(msg, "backrefs", backref);
        }
        let para = doc.new_text_element(Kind::Paragraph, &message, &message);
        doc.append(msg, para);
        if let Some(text) = literal {
            let block = doc.new_text_element(Kind::LiteralBlock, &text, &text);
            doc.append(msg, block);
        }
        doc.extend(msg, children);

        let (report_level, halt_level) = doc.reporter.thresholds(category);
        let numeric = level as u8;
        if numeric >= report_level
            || (doc.reporter.debug && level == Level::Debug)
            || numeric >= halt_level
        {
            doc.reporter.write(level, line, &message);
        }
        doc.reporter.max_level = doc.reporter.max_level.max(Some(level));
        if level > Level::Debug || doc.reporter.debug {
            doc.note_message(msg);
        }

        if numeric >= halt_level {
            return Err(Error::Halt {
                level: numeric,
                line,
                message,
            });
        }
        Ok(msg)
    }
}

impl Document {
    pub fn system_message(&mut self, level: Level, message: impl Into<String>) -> MessageBuilder<'_> {
        MessageBuilder {
            doc: self,
            level,
            message: message.into(),
            line: None,
            base: None,
            literal: None,
            backrefs: Vec::new(),
            children: Vec::new(),
            category: None,
        }
    }

    pub fn debug(&mut self, message: impl Into<String>) -> MessageBuilder<'_> {
        self.system_message(Level::Debug, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> MessageBuilder<'_> {
        self.system_message(Level::Info, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> MessageBuilder<'_> {
        self.system_message(Level::Warning, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> MessageBuilder<'_> {
        self.system_message(Level::Error, message)
    }

    pub fn severe(&mut self, message: impl Into<String>) -> MessageBuilder<'_> {
        self.system_message(Level::Severe, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(settings: Settings) -> Document {
        let mut doc = Document::new(settings);
        doc.reporter.set_stream(Stream::Capture(Vec::new()));
        doc
    }

    #[test]
    fn builds_system_message_node() {
        let mut doc = doc_with(Settings::default());
        let msg = doc.warning("Something odd.").line(3).emit().unwrap();
        assert_eq!(doc.get_int(msg, "level"), Some(2));
        assert_eq!(doc.get_str(msg, "type"), Some("WARNING"));
        assert_eq!(doc.get_int(msg, "line"), Some(3));
        assert_eq!(doc.get_str(msg, "source"), Some("<string>"));
        assert_eq!(doc.astext(msg), "Something odd.");
        assert_eq!(
            doc.reporter.captured(),
            ["<string>:3: (WARNING/2) Something odd."]
        );
    }

    #[test]
    fn below_report_level_is_not_written() {
        let mut doc = doc_with(Settings::default());
        doc.info("quiet").emit().unwrap();
        assert!(doc.reporter.captured().is_empty());
        assert_eq!(doc.reporter.max_level(), Some(Level::Info));
    }

    #[test]
    fn halt_level_raises() {
        let mut doc = doc_with(Settings::builder().halt_level(3).build());
        let err = doc.error("fatal").line(7).emit().unwrap_err();
        assert!(matches!(err, Error::Halt { level: 3, line: Some(7), .. }));
    }

    #[test]
    fn category_thresholds_override() {
        let settings = Settings::builder()
            .category(
                "reference",
                CategoryLevels {
                    report_level: Some(4),
                    halt_level: Some(5),
                },
            )
            .build();
        let mut doc = doc_with(settings);
        doc.error("Unknown target name: \"x\".")
            .category("reference")
            .emit()
            .unwrap();
        assert!(doc.reporter.captured().is_empty());
        doc.error("Malformed table.").emit().unwrap();
        assert_eq!(doc.reporter.captured().len(), 1);
    }

    #[test]
    fn literal_child_follows_paragraph() {
        let mut doc = doc_with(Settings::default());
        let msg = doc.error("Bad.").literal("+--+").emit().unwrap();
        let children = doc.children(msg).to_vec();
        assert_eq!(children.len(), 2);
        assert!(doc.is(children[0], Kind::Paragraph));
        assert!(doc.is(children[1], Kind::LiteralBlock));
    }
}
