//! Definition lists: a term line followed by an indented definition.

use std::sync::LazyLock;

use regex::Regex;

use super::marker_utils;
use super::{BlockParser, State};
use crate::error::Result;
use crate::nodes::{Kind, NodeId};
use crate::parser::line_source::IndentSpec;

static CLASSIFIER_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(" +: +").expect("valid classifier regex"));

impl BlockParser<'_> {
    /// The line at `start` was text and the current line is indented.
    pub(super) fn definition_list_start(&mut self, start: usize) -> Result<()> {
        let list = self.doc.new_element(Kind::DefinitionList);
        self.doc.set_line(list, self.frame.lines.lineno(start));
        let (item, blank_finish) = self.definition_list_item(start)?;
        self.doc.append(list, item);
        self.append(list);
        self.frame
            .states
            .push(State::DefinitionList { list, blank_finish });
        Ok(())
    }

    pub(super) fn definition_list_state(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            self.frame.lines.advance(1);
            return Ok(());
        }
        if line.starts_with(' ') || marker_utils::is_body_markup(line) {
            return self.end_state();
        }
        let term = self.frame.lines.pos();
        self.frame.lines.advance(1);
        self.frame.states.push(State::Definition { term });
        Ok(())
    }

    /// The line after a candidate term.
    pub(super) fn definition_state(&mut self, term: usize, line: &str) -> Result<()> {
        self.frame.states.pop();
        if !line.trim().is_empty() && line.starts_with(' ') {
            let (item, blank_finish) = self.definition_list_item(term)?;
            if let Some(State::DefinitionList { list, .. }) = self.frame.states.last() {
                let list = *list;
                self.doc.append(list, item);
            }
            self.set_blank_finish(blank_finish);
            return Ok(());
        }
        self.frame.lines.set_pos(term);
        self.end_state()
    }

    /// Build one item from the term at index `term`; the current line is
    /// the first line of the definition.
    fn definition_list_item(&mut self, term: usize) -> Result<(NodeId, bool)> {
        let dd_lineno = self.frame.lines.current_lineno();
        let dt_lineno = self.frame.lines.lineno(term);
        let term_line = self.frame.lines.line(term).unwrap_or_default().to_string();
        let indented = self.frame.lines.get_indented(IndentSpec::unknown());

        let item = self.doc.new_element(Kind::DefinitionListItem);
        let mut raw = term_line.clone();
        for line in &indented.block.lines {
            raw.push('\n');
            raw.push_str(line);
        }
        self.doc.set_rawsource(item, raw);
        self.doc.set_line(item, dt_lineno);
        let (term_nodes, messages) = self.term(&term_line, dt_lineno)?;
        self.doc.extend(item, term_nodes);

        let definition = self.doc.new_element_with(Kind::Definition, messages);
        self.doc.set_line(definition, dd_lineno);
        self.doc.append(item, definition);
        if term_line.ends_with("::") {
            let msg = self
                .doc
                .info(
                    "Blank line missing before literal block (after the \"::\")? \
                     Interpreted as a definition list item.",
                )
                .line(dd_lineno)
                .emit()?;
            self.doc.append(definition, msg);
        }
        self.nested_parse(indented.block, definition);
        Ok((item, indented.blank_finish))
    }

    /// A `term` node followed by one `classifier` per ` : ` in the text.
    fn term(&mut self, text: &str, lineno: usize) -> Result<(Vec<NodeId>, Vec<NodeId>)> {
        let (text_nodes, messages) = self.inline_text(text, lineno)?;
        let term = self.doc.new_element(Kind::Term);
        self.doc.set_rawsource(term, text);
        self.doc.set_line(term, lineno);
        let mut nodes = vec![term];
        for node in text_nodes {
            let parts: Option<Vec<String>> = self.doc.text_value(node).and_then(|value| {
                let parts: Vec<String> = CLASSIFIER_DELIMITER
                    .split(value)
                    .map(str::to_string)
                    .collect();
                (parts.len() > 1).then_some(parts)
            });
            let last = nodes[nodes.len() - 1];
            let Some(parts) = parts else {
                self.doc.append(last, node);
                continue;
            };
            let head = self.doc.new_text(parts[0].trim_end());
            self.doc.append(last, head);
            for part in &parts[1..] {
                let classifier = self.doc.new_text_element(Kind::Classifier, part, part);
                nodes.push(classifier);
            }
        }
        Ok((nodes, messages))
    }
}

#[cfg(test)]
mod tests {
    use super::CLASSIFIER_DELIMITER;

    #[test]
    fn classifiers_need_surrounding_spaces() {
        let parts: Vec<&str> = CLASSIFIER_DELIMITER.split("term : str : opt").collect();
        assert_eq!(parts, ["term", "str", "opt"]);
        assert_eq!(CLASSIFIER_DELIMITER.split("a:b").count(), 1);
    }
}
