//! Admonitions and other body-element directives.

use super::{Conversion, Failure, Invocation, OptionSpec, Outcome};
use crate::nodes::{Document, Kind, NodeId, make_id};
use crate::parser::block_parser::BlockParser;
use crate::parser::block_parser::line_blocks::nest_line_block;
use crate::parser::directives::options::class_option;

pub(super) const SIDEBAR_OPTIONS: OptionSpec = &[
    ("subtitle", Conversion::Required),
    ("class", Conversion::ClassList),
    ("name", Conversion::Unchanged),
];

pub(super) const CODE_OPTIONS: OptionSpec = &[
    ("class", Conversion::ClassList),
    ("name", Conversion::Unchanged),
    ("number-lines", Conversion::Unchanged),
];

/// First line number of `:number-lines:`; empty means 1.
pub(super) fn parse_line_start(value: &str) -> Result<usize, String> {
    if value.trim().is_empty() {
        return Ok(1);
    }
    value
        .trim()
        .parse()
        .map_err(|_| ":number-lines: with non-integer start value".to_string())
}

/// Fill `node` with `lines`, each preceded by an `inline` of class `ln`
/// holding its right-aligned number.
pub(super) fn number_lines(doc: &mut Document, node: NodeId, lines: &[String], start: usize) {
    let width = (start + lines.len()).to_string().len();
    for (i, line) in lines.iter().enumerate() {
        let number = format!("{:>width$} ", start + i);
        let ln = doc.new_text_element(Kind::Inline, &number, &number);
        doc.push_attr(ln, "classes", "ln");
        doc.append(node, ln);
        let mut rest = line.clone();
        if i + 1 < lines.len() {
            rest.push('\n');
        }
        if !rest.is_empty() {
            let text = doc.new_text(rest);
            doc.append(node, text);
        }
    }
}

impl BlockParser<'_> {
    pub(super) fn admonition(&mut self, inv: &Invocation, kind: Kind) -> Outcome {
        inv.assert_has_content()?;
        let node = self.doc.new_element(kind);
        self.doc.set_rawsource(node, inv.content_text());
        self.doc.set_line(node, inv.lineno);
        self.add_classes(node, inv.options.classes("class"));
        self.add_name(node, inv)?;
        if kind == Kind::Admonition {
            let title_text = inv.argument(0).unwrap_or_default();
            let (title, messages) = self.directive_title(Kind::Title, title_text, inv.lineno)?;
            self.doc.append(node, title);
            self.doc.extend(node, messages);
            if !inv.options.contains("class") {
                self.doc
                    .push_attr(node, "classes", format!("admonition-{}", make_id(title_text)));
            }
        }
        self.parse_content(&inv.content, node);
        Ok(vec![node])
    }

    /// Topics and sidebars are only allowed where sections are.
    pub(super) fn check_section_context(&self, inv: &Invocation) -> Result<(), Failure> {
        if !(self.frame.match_titles || self.doc.is(self.frame.parent, Kind::Sidebar)) {
            return Err(inv.error(format!(
                "The \"{}\" directive may not be used within topics or body elements.",
                inv.name
            )));
        }
        Ok(())
    }

    pub(super) fn topic(&mut self, inv: &Invocation, kind: Kind) -> Outcome {
        self.check_section_context(inv)?;
        if kind == Kind::Topic {
            inv.assert_has_content()?;
        }
        let node = self.doc.new_element(kind);
        self.doc.set_rawsource(node, inv.content_text());
        self.doc.set_line(node, inv.lineno);
        let mut messages = Vec::new();
        if let Some(title_text) = inv.argument(0) {
            let (title, more) = self.directive_title(Kind::Title, title_text, inv.lineno)?;
            self.doc.append(node, title);
            messages.extend(more);
        }
        if let Some(subtitle_text) = inv.options.text("subtitle") {
            let (subtitle, more) = self.directive_title(Kind::Subtitle, subtitle_text, inv.lineno)?;
            self.doc.append(node, subtitle);
            messages.extend(more);
        }
        self.doc.extend(node, messages);
        self.add_classes(node, inv.options.classes("class"));
        self.add_name(node, inv)?;
        if !inv.content.is_empty() {
            self.parse_content(&inv.content, node);
        }
        Ok(vec![node])
    }

    pub(super) fn sidebar(&mut self, inv: &Invocation) -> Outcome {
        if self.doc.is(self.frame.parent, Kind::Sidebar) {
            return Err(inv.error(format!(
                "The \"{}\" directive may not be used within a sidebar element.",
                inv.name
            )));
        }
        inv.assert_has_content()?;
        self.topic(inv, Kind::Sidebar)
    }

    pub(super) fn line_block_directive(&mut self, inv: &Invocation) -> Outcome {
        inv.assert_has_content()?;
        let block = self.doc.new_element(Kind::LineBlock);
        self.add_classes(block, inv.options.classes("class"));
        self.add_name(block, inv)?;
        let mut output = vec![block];
        let mut indents = Vec::with_capacity(inv.content.len());
        for (line_text, &lineno) in inv.content.lines.iter().zip(&inv.content.linenos) {
            let stripped = line_text.trim();
            let (nodes, messages) = self.inline_text(stripped, lineno)?;
            let line = self.doc.new_element_with(Kind::Line, nodes);
            self.doc.set_rawsource(line, line_text.as_str());
            self.doc.set_line(line, lineno);
            self.doc.append(block, line);
            indents.push(
                (!stripped.is_empty())
                    .then(|| line_text.chars().count() - line_text.trim_start().chars().count()),
            );
            output.extend(messages);
        }
        nest_line_block(self.doc, block, indents);
        Ok(output)
    }

    pub(super) fn parsed_literal(&mut self, inv: &Invocation) -> Outcome {
        inv.assert_has_content()?;
        let text = inv.content_text();
        let (nodes, messages) = self.inline_text(&text, inv.lineno)?;
        let node = self.doc.new_element_with(Kind::LiteralBlock, nodes);
        self.doc.set_rawsource(node, text);
        self.doc.set_line(node, inv.content_offset());
        self.add_classes(node, inv.options.classes("class"));
        self.add_name(node, inv)?;
        let mut output = vec![node];
        output.extend(messages);
        Ok(output)
    }

    pub(super) fn code(&mut self, inv: &Invocation) -> Outcome {
        inv.assert_has_content()?;
        let language = inv.argument(0).unwrap_or_default();
        let text = inv.content_text();
        let node = self.doc.new_element(Kind::LiteralBlock);
        self.doc.set_rawsource(node, text.as_str());
        self.doc.set_line(node, inv.lineno);
        self.doc.push_attr(node, "classes", "code");
        if !language.is_empty() {
            self.doc.push_attr(node, "classes", language);
        }
        self.add_classes(node, inv.options.classes("class"));
        self.add_name(node, inv)?;

        match inv.options.text("number-lines") {
            Some(start) => {
                let start = parse_line_start(start).map_err(|message| inv.error(message))?;
                number_lines(self.doc, node, &inv.content.lines, start);
            }
            None => {
                let child = self.doc.new_text(text);
                self.doc.append(node, child);
            }
        }
        Ok(vec![node])
    }

    pub(super) fn math_block(&mut self, inv: &Invocation) -> Outcome {
        inv.assert_has_content()?;
        let mut output = Vec::new();
        for block in inv.content_text().split("\n\n") {
            if block.is_empty() {
                continue;
            }
            let node = self
                .doc
                .new_text_element(Kind::MathBlock, &inv.block_text, block);
            self.doc.set_line(node, inv.lineno);
            self.add_classes(node, inv.options.classes("class"));
            self.add_name(node, inv)?;
            output.push(node);
        }
        Ok(output)
    }

    pub(super) fn rubric(&mut self, inv: &Invocation) -> Outcome {
        let text = inv.argument(0).unwrap_or_default();
        let (rubric, messages) = self.directive_title(Kind::Rubric, text, inv.lineno)?;
        self.add_classes(rubric, inv.options.classes("class"));
        self.add_name(rubric, inv)?;
        let mut output = vec![rubric];
        output.extend(messages);
        Ok(output)
    }

    pub(super) fn block_quote_directive(&mut self, inv: &Invocation, class: &str) -> Outcome {
        inv.assert_has_content()?;
        let nodes = self.block_quotes(inv.content.clone())?;
        for &node in &nodes {
            if self.doc.is(node, Kind::BlockQuote) {
                self.doc.push_attr(node, "classes", class);
            }
        }
        Ok(nodes)
    }

    pub(super) fn compound(&mut self, inv: &Invocation) -> Outcome {
        inv.assert_has_content()?;
        let node = self.doc.new_element(Kind::Compound);
        self.doc.set_rawsource(node, inv.content_text());
        self.add_classes(node, inv.options.classes("class"));
        self.add_name(node, inv)?;
        self.parse_content(&inv.content, node);
        Ok(vec![node])
    }

    pub(super) fn container(&mut self, inv: &Invocation) -> Outcome {
        inv.assert_has_content()?;
        let classes = match inv.argument(0) {
            Some(argument) => class_option(argument).map_err(|_| {
                inv.error(format!(
                    "Invalid class attribute value for \"{}\" directive: \"{argument}\".",
                    inv.name
                ))
            })?,
            None => Vec::new(),
        };
        let node = self.doc.new_element(Kind::Container);
        self.doc.set_rawsource(node, inv.content_text());
        self.add_classes(node, &classes);
        self.add_name(node, inv)?;
        self.parse_content(&inv.content, node);
        Ok(vec![node])
    }
}
