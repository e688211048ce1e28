//! Paragraphs, literal blocks and doctest blocks.

use super::marker_utils::{self, is_nonalphanum7bit};
use super::{BlockParser, State};
use crate::error::Result;
use crate::nodes::Kind;
use crate::parser::line_source::{Block, IndentSpec};

/// `text` ends in `::` that is not escaped by an odd number of backslashes.
fn ends_with_literal_marker(text: &str) -> bool {
    let Some(before) = text.strip_suffix("::") else {
        return false;
    };
    let backslashes = before.chars().rev().take_while(|&c| c == '\\').count();
    backslashes % 2 == 0
}

impl BlockParser<'_> {
    /// A line that may start a paragraph, a title or a definition term.
    pub(super) fn body_text(&mut self) -> Result<()> {
        let start = self.frame.lines.pos();
        self.frame.lines.advance(1);
        self.frame.states.push(State::Text { start });
        Ok(())
    }

    /// Second line after a possible paragraph start.
    pub(super) fn text_state(&mut self, start: usize, line: &str) -> Result<()> {
        self.frame.states.pop();
        if line.trim().is_empty() {
            self.frame.lines.advance(1);
            return self.single_line_paragraph(start);
        }
        if line.starts_with(' ') {
            return self.definition_list_start(start);
        }
        if marker_utils::is_line(line) {
            return self.text_underline(start, line);
        }
        self.text_paragraph(start)
    }

    pub(super) fn text_eof(&mut self, start: usize) -> Result<()> {
        self.single_line_paragraph(start)
    }

    fn single_line_paragraph(&mut self, start: usize) -> Result<()> {
        let block = self.frame.lines.slice(start, start + 1);
        let lineno = self.frame.lines.lineno(start);
        if self.paragraph(&block, lineno)? {
            self.literal_block()?;
        }
        Ok(())
    }

    /// A paragraph of every flush-left line from `start` up to a blank line.
    pub(super) fn text_paragraph(&mut self, start: usize) -> Result<()> {
        let text_block = self.frame.lines.get_text_block(start, true);
        let mut block = text_block.block;
        if block.is_empty() {
            block = self.frame.lines.slice(start, start + 1);
        }
        self.frame.lines.set_pos(start + block.len());
        let lineno = self.frame.lines.lineno(start);
        let literal_next = self.paragraph(&block, lineno)?;
        if let Some(indent_line) = text_block.unexpected_indent {
            let msg = self
                .doc
                .error("Unexpected indentation.")
                .line(indent_line)
                .emit()?;
            self.append(msg);
        }
        if literal_next {
            self.literal_block()?;
        }
        Ok(())
    }

    /// Append a paragraph built from `block`. Returns true when it ends in
    /// `::` and a literal block should follow.
    pub(super) fn paragraph(&mut self, block: &Block, lineno: usize) -> Result<bool> {
        let data = block.text().trim_end().to_string();
        let (text, literal_next) = if ends_with_literal_marker(&data) {
            if data == "::" {
                return Ok(true);
            }
            let before = &data[..data.len() - 2];
            if before.ends_with([' ', '\n']) {
                (before.trim_end().to_string(), true)
            } else {
                (data[..data.len() - 1].to_string(), true)
            }
        } else {
            (data.clone(), false)
        };
        let (nodes, messages) = self.inline_text(&text, lineno)?;
        let paragraph = self.doc.new_element_with(Kind::Paragraph, nodes);
        self.doc.set_rawsource(paragraph, data);
        self.doc.set_line(paragraph, lineno);
        self.append(paragraph);
        self.append_all(messages);
        Ok(literal_next)
    }

    /// The indented (or quoted) block after a `::` paragraph.
    pub(super) fn literal_block(&mut self) -> Result<()> {
        let indented = self.frame.lines.get_indented(IndentSpec::unknown());
        let mut block = indented.block;
        block.strip_trailing_blanks();
        if block.is_empty() {
            return self.quoted_literal_block();
        }
        let literal = self.literal(&block.text());
        self.doc.set_line(literal, indented.offset);
        self.append(literal);
        if !indented.blank_finish {
            self.unindent_warning("Literal block")?;
        }
        Ok(())
    }

    /// Unindented lines all starting with the same punctuation character.
    fn quoted_literal_block(&mut self) -> Result<()> {
        while self
            .frame
            .lines
            .current()
            .is_some_and(|l| l.trim().is_empty())
        {
            self.frame.lines.advance(1);
        }
        let quote = self
            .frame
            .lines
            .current()
            .and_then(|l| l.chars().next())
            .filter(|&c| is_nonalphanum7bit(c));
        let Some(quote) = quote else {
            let msg = self
                .doc
                .warning("Literal block expected; none found.")
                .line(self.frame.lines.current_lineno())
                .emit()?;
            self.append(msg);
            return Ok(());
        };

        let first_lineno = self.frame.lines.current_lineno();
        let mut lines = Vec::new();
        let mut trailing = None;
        while let Some(line) = self.frame.lines.current() {
            if line.trim().is_empty() {
                break;
            }
            if line.starts_with(quote) {
                lines.push(line.to_string());
                self.frame.lines.advance(1);
                continue;
            }
            let message = if line.starts_with(' ') {
                "Unexpected indentation."
            } else {
                "Inconsistent literal block quoting."
            };
            trailing = Some((message, self.frame.lines.current_lineno()));
            break;
        }

        let text = lines.join("\n");
        let literal = self.literal(&text);
        self.doc.set_line(literal, first_lineno);
        self.append(literal);
        if let Some((message, line)) = trailing {
            let msg = self.doc.error(message).line(line).emit()?;
            self.append(msg);
        }
        Ok(())
    }

    pub(super) fn doctest(&mut self) -> Result<()> {
        let start = self.frame.lines.pos();
        let lineno = self.frame.lines.current_lineno();
        let block = self.frame.lines.get_text_block(start, false).block;
        self.frame.lines.set_pos(start + block.len().max(1));
        let text = block.text();
        let node = self
            .doc
            .new_text_element(Kind::DoctestBlock, &text, &text);
        self.doc.set_line(node, lineno);
        self.append(node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ends_with_literal_marker;

    #[test]
    fn literal_marker_respects_escapes() {
        assert!(ends_with_literal_marker("Paragraph::"));
        assert!(ends_with_literal_marker(r"two \\::"));
        assert!(!ends_with_literal_marker(r"escaped \::"));
        assert!(!ends_with_literal_marker("colon:"));
    }
}
