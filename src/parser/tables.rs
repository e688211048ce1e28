//! Table markup parsers.
//!
//! Both parsers take the isolated table lines and return a [`TableData`]:
//! column widths plus head and body rows of cells. Building the `table`
//! subtree (and nested-parsing each cell) is the block parser's job.

mod grid;
mod simple;

pub(crate) use grid::parse_grid_table;
pub(crate) use simple::parse_simple_table;

use crate::utils::column_width;

/// Stands in for the second column of an East Asian wide character so
/// column arithmetic can index characters directly.
const PAD: char = '\0';

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cell {
    pub morerows: usize,
    pub morecols: usize,
    /// Index of the first line of the cell within the table block.
    pub offset: usize,
    pub lines: Vec<String>,
}

/// A row slot is `None` when a spanning cell above or to the left covers it.
pub(crate) type Row = Vec<Option<Cell>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TableData {
    pub colwidths: Vec<usize>,
    pub head: Vec<Row>,
    pub body: Vec<Row>,
}

/// Markup error inside an isolated table; `offset` is the table line the
/// problem was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableMarkupError {
    pub message: String,
    pub offset: usize,
}

impl TableMarkupError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Characters of `line`, with a [`PAD`] after every double-width character.
fn padded(line: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(line.len());
    for c in line.chars() {
        out.push(c);
        let mut buf = [0u8; 4];
        if column_width(c.encode_utf8(&mut buf)) == 2 {
            out.push(PAD);
        }
    }
    out
}

/// The columns `left..right` of rows `top..bottom`, with the common
/// indentation removed and padding dropped.
fn block_2d(rows: &[Vec<char>], top: usize, left: usize, bottom: usize, right: usize) -> Vec<String> {
    let mut lines: Vec<Vec<char>> = rows[top..bottom]
        .iter()
        .map(|row| {
            let start = left.min(row.len());
            let end = right.min(row.len()).max(start);
            row[start..end].to_vec()
        })
        .collect();
    let indent = lines
        .iter()
        .filter_map(|l| l.iter().position(|&c| c != ' '))
        .min()
        .unwrap_or(0);
    if indent > 0 {
        for line in &mut lines {
            line.drain(..indent.min(line.len()));
        }
    }
    lines
        .into_iter()
        .map(|l| {
            l.into_iter()
                .filter(|&c| c != PAD)
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_characters_take_two_slots() {
        assert_eq!(padded("a日b"), vec!['a', '日', PAD, 'b']);
    }

    #[test]
    fn block_2d_strips_common_indent() {
        let rows: Vec<Vec<char>> = ["|  a  |", "|   b |"].iter().map(|l| padded(l)).collect();
        assert_eq!(block_2d(&rows, 0, 1, 2, 6), vec!["a", " b"]);
    }
}
