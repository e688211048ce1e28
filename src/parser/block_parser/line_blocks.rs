//! Line blocks: `| ` prefixed lines, nested by indentation.

use super::marker_utils;
use super::{BlockParser, State};
use crate::error::Result;
use crate::nodes::{Document, Kind, NodeId};
use crate::parser::line_source::IndentSpec;

#[derive(Debug, Clone)]
pub(crate) struct LineBlockState {
    pub(crate) block: NodeId,
    /// Indentation of each `line` child; `None` for empty lines, which
    /// inherit the indentation of the line before.
    pub(crate) indents: Vec<Option<usize>>,
    pub(crate) blank_finish: bool,
    pub(crate) lineno: usize,
}

impl BlockParser<'_> {
    /// One `line` element; continuation lines are joined into it.
    fn line_block_line(
        &mut self,
        line: &str,
        end: usize,
    ) -> Result<(NodeId, Option<usize>, Vec<NodeId>, bool)> {
        let lineno = self.frame.lines.current_lineno();
        let indent = line[..end].chars().count();
        let indented = self
            .frame
            .lines
            .get_indented(IndentSpec::first_known(indent).until_blank(true));
        let text = indented.block.text();
        let (nodes, messages) = self.inline_text(&text, lineno)?;
        let node = self.doc.new_element_with(Kind::Line, nodes);
        self.doc.set_rawsource(node, text);
        self.doc.set_line(node, lineno);
        let line_indent = (line.trim_end() != "|").then(|| end.saturating_sub(2));
        Ok((node, line_indent, messages, indented.blank_finish))
    }

    pub(super) fn line_block(&mut self, line: &str, end: usize) -> Result<()> {
        let lineno = self.frame.lines.current_lineno();
        let block = self.doc.new_element(Kind::LineBlock);
        self.doc.set_line(block, lineno);
        self.append(block);
        let (node, indent, messages, blank_finish) = self.line_block_line(line, end)?;
        self.doc.append(block, node);
        self.append_all(messages);
        let state = LineBlockState {
            block,
            indents: vec![indent],
            blank_finish,
            lineno,
        };
        if blank_finish {
            return self.finish_line_block(state);
        }
        self.frame.states.push(State::LineBlock(state));
        Ok(())
    }

    pub(super) fn line_block_state(&mut self, line: &str) -> Result<()> {
        let Some(end) = marker_utils::line_block(line) else {
            return self.end_state();
        };
        let (node, indent, messages, blank_finish) = self.line_block_line(line, end)?;
        if let Some(State::LineBlock(state)) = self.frame.states.last_mut() {
            self.doc.append(state.block, node);
            state.indents.push(indent);
            state.blank_finish = blank_finish;
        }
        self.append_all(messages);
        Ok(())
    }

    pub(super) fn finish_line_block(&mut self, state: LineBlockState) -> Result<()> {
        if !state.blank_finish {
            let msg = self
                .doc
                .warning("Line block ends without a blank line.")
                .line(state.lineno + 1)
                .emit()?;
            self.append(msg);
        }
        nest_line_block(self.doc, state.block, state.indents);
        Ok(())
    }
}

/// Nest the `line` children of `block` by their indentation; `indents`
/// holds one entry per line, `None` for empty lines.
pub(crate) fn nest_line_block(doc: &mut Document, block: NodeId, indents: Vec<Option<usize>>) {
    let lines = doc.children(block).to_vec();
    let mut previous = 0;
    let items: Vec<(NodeId, usize)> = lines
        .into_iter()
        .zip(indents)
        .map(|(node, indent)| {
            previous = indent.unwrap_or(previous);
            (node, previous)
        })
        .collect();
    nest_segment(doc, block, items);
}

/// Regroup `items` under `block` so that lines indented deeper than the
/// shallowest line go into nested line blocks.
fn nest_segment(doc: &mut Document, block: NodeId, items: Vec<(NodeId, usize)>) {
    doc.take_children(block);
    let Some(least) = items.iter().map(|&(_, indent)| indent).min() else {
        return;
    };
    let mut deeper = Vec::new();
    for (node, indent) in items {
        if indent > least {
            deeper.push((node, indent));
            continue;
        }
        flush_nested(doc, block, &mut deeper);
        doc.append(block, node);
    }
    flush_nested(doc, block, &mut deeper);
}

fn flush_nested(doc: &mut Document, block: NodeId, deeper: &mut Vec<(NodeId, usize)>) {
    if deeper.is_empty() {
        return;
    }
    let nested = doc.new_element(Kind::LineBlock);
    nest_segment(doc, nested, std::mem::take(deeper));
    doc.append(block, nested);
}
