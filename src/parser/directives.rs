//! Directives: `.. name:: arguments`, an optional option field list, and
//! indented content.
//!
//! The directive block is split the same way for every directive: argument
//! lines up to the first blank line (when the directive takes arguments or
//! options), options from the first field marker on, and content after
//! that. Each directive then builds its nodes from an [`Invocation`].
//!
//! Content that has to be parsed as body elements is parsed by a queued
//! frame. Directives that post-process the parsed content (figure captions,
//! tables, `replace`, `class`) attach a [`DirectiveHook`] to that frame and
//! insert their nodes once it finishes.

mod body;
mod images;
mod misc;
mod options;
mod parts;
mod tables;

use super::block_parser::explicit::char_offset;
use super::block_parser::{BlockParser, Frame, Hook};
use super::line_source::{Block, IndentSpec};
use crate::error::{Error, Result};
use crate::languages;
use crate::nodes::{Kind, NodeId, fully_normalize_name};
use crate::reporter::Level;

pub(crate) use parts::decoration_part;
pub(crate) use options::{Conversion, OptionSpec, OptionValue, Options, py_repr};

const CLASS_NAME: OptionSpec = &[
    ("class", Conversion::ClassList),
    ("name", Conversion::Unchanged),
];

/// What a directive accepts before its content.
#[derive(Debug, Clone, Copy)]
struct Spec {
    required: usize,
    optional: usize,
    /// The last argument may contain whitespace.
    final_whitespace: bool,
    options: OptionSpec,
    content: bool,
}

impl Spec {
    const fn new(required: usize, optional: usize, final_whitespace: bool) -> Self {
        Self {
            required,
            optional,
            final_whitespace,
            options: &[],
            content: false,
        }
    }

    const fn options(mut self, options: OptionSpec) -> Self {
        self.options = options;
        self
    }

    const fn content(mut self) -> Self {
        self.content = true;
        self
    }

    fn takes_arguments(&self) -> bool {
        self.required + self.optional > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Admonition(Kind),
    GenericAdmonition,
    Topic,
    Sidebar,
    LineBlock,
    ParsedLiteral,
    Code,
    Math,
    Rubric,
    BlockQuote(&'static str),
    Compound,
    Container,
    Image,
    Figure,
    Table,
    CsvTable,
    ListTable,
    Contents,
    SectNum,
    Header,
    Footer,
    TargetNotes,
    Include,
    Raw,
    Replace,
    Unicode,
    Class,
    Role,
    DefaultRole,
    Title,
    Test,
}

impl Directive {
    fn from_canonical(name: &str) -> Option<Self> {
        Some(match name {
            "attention" => Directive::Admonition(Kind::Attention),
            "caution" => Directive::Admonition(Kind::Caution),
            "danger" => Directive::Admonition(Kind::Danger),
            "error" => Directive::Admonition(Kind::Error),
            "hint" => Directive::Admonition(Kind::Hint),
            "important" => Directive::Admonition(Kind::Important),
            "note" => Directive::Admonition(Kind::Note),
            "tip" => Directive::Admonition(Kind::Tip),
            "warning" => Directive::Admonition(Kind::Warning),
            "admonition" => Directive::GenericAdmonition,
            "topic" => Directive::Topic,
            "sidebar" => Directive::Sidebar,
            "line-block" => Directive::LineBlock,
            "parsed-literal" => Directive::ParsedLiteral,
            "code" => Directive::Code,
            "math" => Directive::Math,
            "rubric" => Directive::Rubric,
            "epigraph" => Directive::BlockQuote("epigraph"),
            "highlights" => Directive::BlockQuote("highlights"),
            "pull-quote" => Directive::BlockQuote("pull-quote"),
            "compound" => Directive::Compound,
            "container" => Directive::Container,
            "image" => Directive::Image,
            "figure" => Directive::Figure,
            "table" => Directive::Table,
            "csv-table" => Directive::CsvTable,
            "list-table" => Directive::ListTable,
            "contents" => Directive::Contents,
            "sectnum" => Directive::SectNum,
            "header" => Directive::Header,
            "footer" => Directive::Footer,
            "target-notes" => Directive::TargetNotes,
            "include" => Directive::Include,
            "raw" => Directive::Raw,
            "replace" => Directive::Replace,
            "unicode" => Directive::Unicode,
            "class" => Directive::Class,
            "role" => Directive::Role,
            "default-role" => Directive::DefaultRole,
            "title" => Directive::Title,
            "restructuredtext-test-directive" => Directive::Test,
            _ => return None,
        })
    }

    fn spec(self) -> Spec {
        match self {
            Directive::Admonition(_) => Spec::new(0, 0, true).options(CLASS_NAME).content(),
            Directive::GenericAdmonition => Spec::new(1, 0, true).options(CLASS_NAME).content(),
            Directive::Topic => Spec::new(1, 0, true).options(CLASS_NAME).content(),
            Directive::Sidebar => Spec::new(0, 1, true).options(body::SIDEBAR_OPTIONS).content(),
            Directive::LineBlock | Directive::ParsedLiteral | Directive::Math => {
                Spec::new(0, 0, false).options(CLASS_NAME).content()
            }
            Directive::Code => Spec::new(0, 1, false).options(body::CODE_OPTIONS).content(),
            Directive::Rubric => Spec::new(1, 0, true).options(CLASS_NAME),
            Directive::BlockQuote(_) => Spec::new(0, 0, false).content(),
            Directive::Compound => Spec::new(0, 0, false).options(CLASS_NAME).content(),
            Directive::Container => Spec::new(0, 1, true)
                .options(&[("name", Conversion::Unchanged)])
                .content(),
            Directive::Image => Spec::new(1, 0, true).options(images::IMAGE_OPTIONS),
            Directive::Figure => Spec::new(1, 0, true).options(images::FIGURE_OPTIONS).content(),
            Directive::Table => Spec::new(0, 1, true).options(tables::TABLE_OPTIONS).content(),
            Directive::CsvTable => Spec::new(0, 1, true).options(tables::CSV_OPTIONS).content(),
            Directive::ListTable => {
                Spec::new(0, 1, true).options(tables::LIST_TABLE_OPTIONS).content()
            }
            Directive::Contents => Spec::new(0, 1, true).options(parts::CONTENTS_OPTIONS),
            Directive::SectNum => Spec::new(0, 0, false).options(parts::SECTNUM_OPTIONS),
            Directive::Header | Directive::Footer => Spec::new(0, 0, false).content(),
            Directive::TargetNotes => Spec::new(0, 0, false).options(CLASS_NAME),
            Directive::Include => Spec::new(1, 0, true).options(misc::INCLUDE_OPTIONS),
            Directive::Raw => Spec::new(1, 0, true).options(misc::RAW_OPTIONS).content(),
            Directive::Replace => Spec::new(0, 0, false).content(),
            Directive::Unicode => Spec::new(1, 0, true).options(misc::UNICODE_OPTIONS),
            Directive::Class => Spec::new(1, 0, true).content(),
            Directive::Role => Spec::new(0, 0, false).content(),
            Directive::DefaultRole => Spec::new(0, 1, false),
            Directive::Title => Spec::new(1, 0, true),
            Directive::Test => Spec::new(0, 1, true)
                .options(&[("option", Conversion::Required)])
                .content(),
        }
    }
}

/// One use of a directive, after its block was split up.
#[derive(Debug, Clone)]
pub(crate) struct Invocation {
    /// The directive name as written.
    pub(crate) name: String,
    pub(crate) arguments: Vec<String>,
    pub(crate) options: Options,
    pub(crate) content: Block,
    pub(crate) lineno: usize,
    /// The whole directive source, for error messages.
    pub(crate) block_text: String,
    /// The directive is the body of a substitution definition.
    pub(crate) substitution: bool,
}

impl Invocation {
    pub(crate) fn error(&self, message: impl Into<String>) -> Failure {
        Failure::Report {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub(crate) fn warning(&self, message: impl Into<String>) -> Failure {
        Failure::Report {
            level: Level::Warning,
            message: message.into(),
        }
    }

    pub(crate) fn severe(&self, message: impl Into<String>) -> Failure {
        Failure::Report {
            level: Level::Severe,
            message: message.into(),
        }
    }

    pub(crate) fn assert_has_content(&self) -> std::result::Result<(), Failure> {
        if self.content.is_empty() {
            return Err(self.error(format!(
                "Content block expected for the \"{}\" directive; none found.",
                self.name
            )));
        }
        Ok(())
    }

    pub(crate) fn content_text(&self) -> String {
        self.content.text()
    }

    /// Line number of the first content line.
    pub(crate) fn content_offset(&self) -> usize {
        self.content.first_lineno().unwrap_or(self.lineno)
    }

    pub(crate) fn argument(&self, index: usize) -> Option<&str> {
        self.arguments.get(index).map(String::as_str)
    }
}

/// Why a directive produced no regular output.
#[derive(Debug)]
pub(crate) enum Failure {
    Fatal(Error),
    /// Report `message`; the directive source is attached as a literal block.
    Report { level: Level, message: String },
    /// A message that was already built replaces the directive's output.
    Message(NodeId),
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Failure::Fatal(err)
    }
}

pub(crate) type Outcome = std::result::Result<Vec<NodeId>, Failure>;

/// Post-processing of a directive, run after its content was parsed.
#[derive(Debug, Clone)]
pub(crate) enum DirectiveHook {
    Replace(misc::ReplaceHook),
    Class(misc::ClassHook),
    Figure(images::FigureHook),
    Table(tables::TableHook),
    ListTable(tables::ListTableHook),
}

pub(crate) fn finish(parser: &mut BlockParser<'_>, hook: DirectiveHook) -> Result<()> {
    match hook {
        DirectiveHook::Replace(h) => misc::finish_replace(parser, h),
        DirectiveHook::Class(h) => misc::finish_class(parser, h),
        DirectiveHook::Figure(h) => images::finish_figure(parser, h),
        DirectiveHook::Table(h) => tables::finish_table(parser, h),
        DirectiveHook::ListTable(h) => tables::finish_list_table(parser, h),
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// `str.split(None, maxsplit)`: at most `max + 1` words, the last one
/// keeping its inner whitespace.
fn split_whitespace_max(text: &str, max: usize) -> Vec<String> {
    let mut words = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if words.len() == max {
            words.push(rest.to_string());
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        words.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }
    words
}

fn parse_arguments(spec: &Spec, arg_block: &[String]) -> std::result::Result<Vec<String>, String> {
    let arg_text = arg_block.join("\n");
    let words: Vec<String> = arg_text.split_whitespace().map(String::from).collect();
    let allowed = spec.required + spec.optional;
    if words.len() < spec.required {
        return Err(format!(
            "{} argument(s) required, {} supplied",
            spec.required,
            words.len()
        ));
    }
    if words.len() > allowed {
        if spec.final_whitespace {
            return Ok(split_whitespace_max(&arg_text, allowed - 1));
        }
        return Err(format!(
            "maximum {allowed} argument(s) allowed, {} supplied",
            words.len()
        ));
    }
    Ok(words)
}

/// Split the directive block into arguments, options and content.
fn parse_directive_block(
    spec: &Spec,
    mut indented: Block,
    presets: Options,
) -> std::result::Result<(Vec<String>, Options, Block), String> {
    if indented.lines.first().is_some_and(|l| is_blank(l)) {
        indented.trim_start();
    }
    indented.strip_trailing_blanks();

    let (mut arg_block, arg_end, mut content) =
        if !indented.is_empty() && (spec.takes_arguments() || !spec.options.is_empty()) {
            let end = indented
                .lines
                .iter()
                .position(|l| is_blank(l))
                .unwrap_or(indented.len());
            let content = indented.slice(end + 1, indented.len());
            (indented.lines[..end].to_vec(), end, content)
        } else {
            (Vec::new(), 0, indented.clone())
        };

    let mut options = Options::default();
    if !spec.options.is_empty() {
        let (args, opt_block) = options::split_options(&arg_block);
        options = presets;
        if !opt_block.is_empty() {
            options = options::parse_options(spec.options, &opt_block, options)?;
        }
        arg_block = args;
    }
    if !arg_block.is_empty() && !spec.takes_arguments() {
        let mut joined = indented.slice(0, arg_block.len());
        let rest = indented.slice(arg_end, indented.len());
        joined.lines.extend(rest.lines);
        joined.linenos.extend(rest.linenos);
        content = joined;
        arg_block.clear();
    }
    content.strip_leading_blanks();

    let arguments = if spec.takes_arguments() {
        parse_arguments(spec, &arg_block)?
    } else {
        Vec::new()
    };
    if !content.is_empty() && !spec.content {
        return Err("no content permitted".to_string());
    }
    Ok((arguments, options, content))
}

impl BlockParser<'_> {
    /// Parse the directive starting on the current line; `marker_end` is
    /// the byte offset just past `::` and its spaces. `alt` is set inside a
    /// substitution definition and holds the substitution name.
    pub(crate) fn directive(
        &mut self,
        type_name: &str,
        marker_end: usize,
        alt: Option<String>,
    ) -> Result<(Vec<NodeId>, bool)> {
        let lineno = self.frame.lines.current_lineno();
        let start = self.frame.lines.pos();
        let line = self.frame.lines.current().unwrap_or_default().to_string();
        let mut messages = Vec::new();

        let normname = type_name.to_lowercase();
        let canonical = match languages::directive(&normname) {
            Some(canonical) => canonical.to_string(),
            None => {
                let msg = self
                    .doc
                    .info(format!(
                        "No directive entry for \"{type_name}\" in language \"{}\".\n\
                         Trying \"{type_name}\" as canonical directive name.",
                        self.doc.settings.language_code
                    ))
                    .line(lineno)
                    .emit()?;
                messages.push(msg);
                normname
            }
        };

        let indented = self.frame.lines.get_indented(
            IndentSpec::first_known(char_offset(&line, marker_end)).strip_top(false),
        );
        let mut source = self.frame.lines.slice(start, self.frame.lines.pos());
        source.strip_trailing_blanks();
        let block_text = source.text();

        let Some(directive) = Directive::from_canonical(&canonical) else {
            let literal = self.literal(&block_text);
            let error = self
                .doc
                .error(format!("Unknown directive type \"{type_name}\"."))
                .child(literal)
                .line(lineno)
                .emit()?;
            messages.push(error);
            let blank_finish = indented.blank_finish || self.next_line_is_blank();
            return Ok((messages, blank_finish));
        };

        let spec = directive.spec();
        let substitution = alt.is_some();
        let mut presets = Options::default();
        if let Some(alt) = alt
            && spec.options.iter().any(|(name, _)| *name == "alt")
        {
            presets.insert("alt", OptionValue::Text(alt));
        }
        let invocation = match parse_directive_block(&spec, indented.block, presets) {
            Ok((arguments, options, content)) => Invocation {
                name: type_name.to_string(),
                arguments,
                options,
                content,
                lineno,
                block_text,
                substitution,
            },
            Err(detail) => {
                let literal = self.literal(&block_text);
                let error = self
                    .doc
                    .error(format!("Error in \"{type_name}\" directive:\n{detail}."))
                    .child(literal)
                    .line(lineno)
                    .emit()?;
                messages.push(error);
                let blank_finish = indented.blank_finish || self.next_line_is_blank();
                return Ok((messages, blank_finish));
            }
        };

        log::debug!("Running directive {canonical:?} at line {lineno}");
        match self.run_directive(directive, &invocation) {
            Ok(nodes) => messages.extend(nodes),
            Err(Failure::Fatal(err)) => return Err(err),
            Err(Failure::Message(msg)) => messages.push(msg),
            Err(Failure::Report { level, message }) => {
                let literal = self.literal(&invocation.block_text);
                let msg = self
                    .doc
                    .system_message(level, message)
                    .child(literal)
                    .line(lineno)
                    .emit()?;
                messages.push(msg);
            }
        }
        let blank_finish = indented.blank_finish || self.next_line_is_blank();
        Ok((messages, blank_finish))
    }

    fn run_directive(&mut self, directive: Directive, inv: &Invocation) -> Outcome {
        match directive {
            Directive::Admonition(kind) => self.admonition(inv, kind),
            Directive::GenericAdmonition => self.admonition(inv, Kind::Admonition),
            Directive::Topic => self.topic(inv, Kind::Topic),
            Directive::Sidebar => self.sidebar(inv),
            Directive::LineBlock => self.line_block_directive(inv),
            Directive::ParsedLiteral => self.parsed_literal(inv),
            Directive::Code => self.code(inv),
            Directive::Math => self.math_block(inv),
            Directive::Rubric => self.rubric(inv),
            Directive::BlockQuote(class) => self.block_quote_directive(inv, class),
            Directive::Compound => self.compound(inv),
            Directive::Container => self.container(inv),
            Directive::Image => self.image(inv),
            Directive::Figure => self.figure(inv),
            Directive::Table => self.table_directive(inv),
            Directive::CsvTable => self.csv_table(inv),
            Directive::ListTable => self.list_table(inv),
            Directive::Contents => self.contents(inv),
            Directive::SectNum => self.sectnum(inv),
            Directive::Header => self.decoration_part(inv, Kind::Header),
            Directive::Footer => self.decoration_part(inv, Kind::Footer),
            Directive::TargetNotes => self.target_notes(inv),
            Directive::Include => self.include(inv),
            Directive::Raw => self.raw_directive(inv),
            Directive::Replace => self.replace(inv),
            Directive::Unicode => self.unicode(inv),
            Directive::Class => self.class_directive(inv),
            Directive::Role => self.role_directive(inv),
            Directive::DefaultRole => self.default_role(inv),
            Directive::Title => self.title_directive(inv),
            Directive::Test => self.test_directive(inv),
        }
    }

    fn next_line_is_blank(&self) -> bool {
        self.frame.lines.current().is_none_or(is_blank)
    }

    /// Register the `:name:` option of `node` as an explicit target.
    pub(crate) fn add_name(&mut self, node: NodeId, inv: &Invocation) -> Result<()> {
        if let Some(name) = inv.options.text("name") {
            self.doc.push_attr(node, "names", fully_normalize_name(name));
            self.doc.note_explicit_target(node, Some(node))?;
        }
        Ok(())
    }

    pub(crate) fn add_classes(&mut self, node: NodeId, classes: &[String]) {
        for class in classes {
            self.doc.push_attr(node, "classes", class.clone());
        }
    }

    /// Parse `content` into `parent` once the current line is done.
    pub(crate) fn parse_content(&mut self, content: &Block, parent: NodeId) {
        self.nested_parse(content.clone(), parent);
    }

    /// Parse `content` into the detached `holder`, then run `hook`.
    pub(crate) fn parse_content_then(&mut self, content: &Block, holder: NodeId, hook: DirectiveHook) {
        self.queue(Frame::new(content.clone(), holder).with_hook(Hook::Directive(hook)));
    }

    /// A `title` node with parsed inline content plus its messages.
    pub(crate) fn directive_title(
        &mut self,
        kind: Kind,
        text: &str,
        lineno: usize,
    ) -> Result<(NodeId, Vec<NodeId>)> {
        let (nodes, messages) = self.inline_text(text, lineno)?;
        let title = self.doc.new_element_with(kind, nodes);
        self.doc.set_rawsource(title, text);
        self.doc.set_line(title, lineno);
        Ok((title, messages))
    }
}

#[cfg(test)]
mod tests;
