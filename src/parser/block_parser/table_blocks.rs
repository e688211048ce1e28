//! Isolating grid and simple tables in the input and building `table`
//! subtrees from parsed [`TableData`].

use std::sync::LazyLock;

use regex::Regex;

use super::BlockParser;
use super::marker_utils::GRID_TABLE_TOP;
use crate::error::Result;
use crate::nodes::{Kind, NodeId};
use crate::parser::line_source::{Block, LineSource};
use crate::parser::tables::{Row, TableData, parse_grid_table, parse_simple_table};
use crate::utils::column_width;

static SIMPLE_TABLE_BORDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=+[ =]*$").expect("valid simple table regex"));

fn line_at(lines: &LineSource, i: usize) -> String {
    lines.line(i).unwrap_or_default().to_string()
}

fn blank_after(lines: &LineSource, i: usize) -> bool {
    lines.line(i + 1).is_none_or(|l| l.trim().is_empty())
}

/// Isolated table lines, or `None` when isolation already failed; plus
/// messages and whether a blank line follows.
type Isolated = (Option<Vec<String>>, Vec<NodeId>, bool);

impl BlockParser<'_> {
    pub(super) fn grid_table(&mut self) -> Result<()> {
        self.table_top(false)
    }

    pub(super) fn simple_table(&mut self) -> Result<()> {
        self.table_top(true)
    }

    fn table_top(&mut self, simple: bool) -> Result<()> {
        let start = self.frame.lines.pos();
        let (lines, messages, blank_finish) = if simple {
            self.isolate_simple_table()?
        } else {
            self.isolate_grid_table()?
        };
        let mut nodes = Vec::new();
        if let Some(lines) = lines {
            let parsed = if simple {
                parse_simple_table(&lines)
            } else {
                parse_grid_table(&lines)
            };
            match parsed {
                Ok(data) => {
                    let tableline = self.frame.lines.lineno(start);
                    nodes.push(self.build_table(data, tableline, 0));
                }
                Err(err) => {
                    nodes.push(self.malformed_table(&lines, &err.message, start, err.offset)?);
                }
            }
        }
        nodes.extend(messages);
        self.append_all(nodes);
        if !blank_finish {
            let line = self.frame.lines.current_lineno();
            let msg = self
                .doc
                .warning("Blank line required after table.")
                .line(line)
                .emit()?;
            self.append(msg);
        }
        Ok(())
    }

    fn isolate_grid_table(&mut self) -> Result<Isolated> {
        let start = self.frame.lines.pos();
        let text_block = self.frame.lines.get_text_block(start, true);
        let mut messages = Vec::new();
        let mut blank_finish = true;
        if let Some(line) = text_block.unexpected_indent {
            messages.push(self.doc.error("Unexpected indentation.").line(line).emit()?);
            blank_finish = false;
        }
        let mut lines: Vec<String> = text_block
            .block
            .lines
            .iter()
            .map(|l| l.trim().to_string())
            .collect();
        self.frame.lines.set_pos(start + lines.len());

        if let Some(i) = lines
            .iter()
            .position(|l| !l.starts_with('+') && !l.starts_with('|'))
        {
            blank_finish = false;
            lines.truncate(i);
            self.frame.lines.set_pos(start + i);
        }
        if !lines.last().is_some_and(|l| GRID_TABLE_TOP.is_match(l)) {
            let bottom = (2..lines.len().saturating_sub(1))
                .rev()
                .find(|&i| GRID_TABLE_TOP.is_match(&lines[i]));
            match bottom {
                Some(i) => {
                    blank_finish = false;
                    lines.truncate(i + 1);
                    self.frame.lines.set_pos(start + i + 1);
                }
                None => {
                    messages.insert(0, self.malformed_table(&lines, "", start, 0)?);
                    return Ok((None, messages, blank_finish));
                }
            }
        }
        let width = lines.first().map_or(0, |l| column_width(l));
        let ragged = lines
            .iter()
            .any(|l| column_width(l) != width || !(l.ends_with('+') || l.ends_with('|')));
        if ragged {
            messages.insert(0, self.malformed_table(&lines, "", start, 0)?);
            return Ok((None, messages, blank_finish));
        }
        Ok((Some(lines), messages, blank_finish))
    }

    fn isolate_simple_table(&mut self) -> Result<Isolated> {
        let start = self.frame.lines.pos();
        let len = self.frame.lines.len();
        let toplen = line_at(&self.frame.lines, start).trim().chars().count();
        let mut found = 0;
        let mut found_at = None;
        let mut end = None;
        for i in start + 1..len {
            let line = line_at(&self.frame.lines, i);
            if !SIMPLE_TABLE_BORDER.is_match(&line) {
                continue;
            }
            if line.trim().chars().count() != toplen {
                let blank_finish = blank_after(&self.frame.lines, i);
                let lines = self.frame.lines.slice(start, i + 1).lines;
                self.frame.lines.set_pos(i + 1);
                let msg = self.malformed_table(
                    &lines,
                    "Bottom/header table border does not match top border.",
                    start,
                    0,
                )?;
                return Ok((None, vec![msg], blank_finish));
            }
            found += 1;
            found_at = Some(i);
            if found == 2 || i + 1 == len || blank_after(&self.frame.lines, i) {
                end = Some(i);
                break;
            }
        }
        let Some(end) = end else {
            let (last, extra) = match found_at {
                Some(at) => (at + 1, " or no blank line after table bottom"),
                None => (len, ""),
            };
            let lines = self.frame.lines.slice(start, last).lines;
            self.frame.lines.set_pos(last);
            let msg = self.malformed_table(
                &lines,
                &format!("No bottom table border found{extra}."),
                start,
                0,
            )?;
            return Ok((None, vec![msg], extra.is_empty()));
        };
        let blank_finish = blank_after(&self.frame.lines, end);
        let lines = self.frame.lines.slice(start, end + 1).lines;
        self.frame.lines.set_pos(end + 1);
        Ok((Some(lines), Vec::new(), blank_finish))
    }

    /// An error carrying the table text; `start` is the index of the table's
    /// first line and `offset` the table line the problem is on.
    pub(crate) fn malformed_table(
        &mut self,
        lines: &[String],
        detail: &str,
        start: usize,
        offset: usize,
    ) -> Result<NodeId> {
        let mut message = "Malformed table.".to_string();
        if !detail.is_empty() {
            message.push('\n');
            message.push_str(detail);
        }
        let line = self.frame.lines.lineno(start) + offset;
        self.doc
            .error(message)
            .literal(lines.join("\n"))
            .line(line)
            .emit()
    }

    /// Build a `table` from `data`; cell contents are parsed as nested
    /// blocks. The first `stub_columns` colspecs are marked as stubs.
    pub(crate) fn build_table(
        &mut self,
        data: TableData,
        tableline: usize,
        mut stub_columns: usize,
    ) -> NodeId {
        let table = self.doc.new_element(Kind::Table);
        self.doc.set_line(table, tableline);
        let tgroup = self.doc.new_element(Kind::Tgroup);
        self.doc.set_attr(tgroup, "cols", data.colwidths.len());
        self.doc.append(table, tgroup);
        for width in &data.colwidths {
            let colspec = self.doc.new_element(Kind::Colspec);
            self.doc.set_attr(colspec, "colwidth", *width);
            if stub_columns > 0 {
                self.doc.set_attr(colspec, "stub", 1_i64);
                stub_columns -= 1;
            }
            self.doc.append(tgroup, colspec);
        }
        if !data.head.is_empty() {
            let thead = self.doc.new_element(Kind::Thead);
            self.doc.append(tgroup, thead);
            for row in data.head {
                let row = self.build_table_row(row, tableline);
                self.doc.append(thead, row);
            }
        }
        let tbody = self.doc.new_element(Kind::Tbody);
        self.doc.append(tgroup, tbody);
        for row in data.body {
            let row = self.build_table_row(row, tableline);
            self.doc.append(tbody, row);
        }
        table
    }

    fn build_table_row(&mut self, cells: Row, tableline: usize) -> NodeId {
        let row = self.doc.new_element(Kind::Row);
        for cell in cells.into_iter().flatten() {
            let entry = self.doc.new_element(Kind::Entry);
            if cell.morerows > 0 {
                self.doc.set_attr(entry, "morerows", cell.morerows);
            }
            if cell.morecols > 0 {
                self.doc.set_attr(entry, "morecols", cell.morecols);
            }
            self.doc.append(row, entry);
            if cell.lines.iter().any(|l| !l.is_empty()) {
                let block = Block::from_lines(cell.lines, tableline + cell.offset);
                self.nested_parse(block, entry);
            }
        }
        row
    }
}
