//! Simple tables: columns delimited by `=` borders.
//!
//! The top border defines the columns. A row whose first column is blank
//! continues the previous row; a `-` underline ends a row and may join
//! columns into spans. Text may run past the right border only in the last
//! column.

use super::{Cell, Row, TableData, TableMarkupError, block_2d, padded};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Column {
    start: usize,
    end: usize,
}

fn is_head_body_separator(line: &[char]) -> bool {
    line.first() == Some(&'=') && line.iter().all(|&c| c == '=' || c == ' ')
}

fn is_span_line(line: &[char]) -> bool {
    line.first() == Some(&'-') && line.iter().all(|&c| c == '-' || c == ' ')
}

fn is_blank(chars: &[char]) -> bool {
    chars.iter().all(|c| c.is_whitespace())
}

fn slice(line: &[char], start: usize, end: usize) -> &[char] {
    let start = start.min(line.len());
    &line[start..end.min(line.len()).max(start)]
}

/// Dash runs of a border or span line.
fn extract_columns(line: &[char]) -> Vec<Column> {
    let mut columns = Vec::new();
    let mut start = None;
    for (i, &c) in line.iter().enumerate() {
        match (c, start) {
            ('-', None) => start = Some(i),
            (' ', Some(s)) => {
                columns.push(Column { start: s, end: i });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        columns.push(Column {
            start: s,
            end: line.len(),
        });
    }
    columns
}

struct SimpleParser {
    rows: Vec<Vec<char>>,
    head_body_sep: Option<usize>,
    columns: Vec<Column>,
    border_end: usize,
    table: Vec<Vec<Cell>>,
}

impl SimpleParser {
    fn new(lines: &[String]) -> Self {
        let mut rows: Vec<Vec<char>> = lines.iter().map(|l| padded(l)).collect();
        let last = rows.len().saturating_sub(1);
        for index in [0, last] {
            if let Some(row) = rows.get_mut(index) {
                for c in row.iter_mut().filter(|c| **c == '=') {
                    *c = '-';
                }
            }
        }
        Self {
            rows,
            head_body_sep: None,
            columns: Vec::new(),
            border_end: 0,
            table: Vec::new(),
        }
    }

    fn find_head_body_sep(&mut self) -> Result<(), TableMarkupError> {
        for i in 0..self.rows.len() {
            if !is_head_body_separator(&self.rows[i]) {
                continue;
            }
            if let Some(first) = self.head_body_sep {
                return Err(TableMarkupError::new(
                    format!(
                        "Multiple head/body row separators (table lines {} and {}); only one allowed.",
                        first + 1,
                        i + 1
                    ),
                    i,
                ));
            }
            self.head_body_sep = Some(i);
            for c in self.rows[i].iter_mut().filter(|c| **c == '=') {
                *c = '-';
            }
        }
        Ok(())
    }

    /// Columns of a span line; the last one is unbounded to the right.
    fn parse_columns(&self, line: &[char], offset: usize) -> Result<Vec<Column>, TableMarkupError> {
        let mut columns = extract_columns(line);
        if let (Some(last), Some(main_last)) = (columns.last_mut(), self.columns.last()) {
            if last.end != self.border_end {
                return Err(TableMarkupError::new(
                    format!("Column span incomplete in table line {}.", offset + 1),
                    offset,
                ));
            }
            last.end = main_last.end;
        }
        Ok(columns)
    }

    fn parse_table(&mut self) -> Result<(), TableMarkupError> {
        self.columns = self.parse_columns(&self.rows[0].clone(), 0)?;
        let Some(first) = self.columns.first().copied() else {
            return Err(TableMarkupError::new("No columns found in table border.", 0));
        };
        self.border_end = self.columns.last().map_or(0, |c| c.end);

        let mut start = 1;
        let mut text_found = false;
        for offset in 1..self.rows.len() {
            let line = self.rows[offset].clone();
            if is_span_line(&line) {
                let mut trimmed = line;
                while trimmed.last() == Some(&' ') {
                    trimmed.pop();
                }
                self.parse_row(start, offset, Some((trimmed, offset)))?;
                start = offset + 1;
                text_found = false;
            } else if !is_blank(slice(&line, first.start, first.end)) {
                if text_found && offset != start {
                    self.parse_row(start, offset, None)?;
                }
                start = offset;
                text_found = true;
            } else if !text_found {
                start = offset + 1;
            }
        }
        Ok(())
    }

    fn parse_row(
        &mut self,
        start: usize,
        end: usize,
        spanline: Option<(Vec<char>, usize)>,
    ) -> Result<(), TableMarkupError> {
        if start >= end && spanline.is_none() {
            return Ok(());
        }
        let mut columns = match &spanline {
            Some((line, offset)) => self.parse_columns(line, *offset)?,
            None => self.columns.clone(),
        };
        self.check_columns(start, end, &mut columns)?;
        let mut row = self.init_row(&columns, start)?;
        for (cell, column) in row.iter_mut().zip(&columns) {
            cell.lines = block_2d(&self.rows, start, column.start, end, column.end);
        }
        self.table.push(row);
        Ok(())
    }

    /// Reject text in the margins between columns. Text past the last
    /// column widens it.
    fn check_columns(
        &mut self,
        start: usize,
        end: usize,
        columns: &mut [Column],
    ) -> Result<(), TableMarkupError> {
        let last = columns.len().saturating_sub(1);
        for i in 0..columns.len() {
            let column = columns[i];
            let next_start = columns.get(i + 1).map_or(usize::MAX, |c| c.start);
            for (line_offset, line) in self.rows[start..end].iter().enumerate() {
                if i == last && !is_blank(slice(line, column.end, usize::MAX)) {
                    let text = slice(line, column.start, usize::MAX);
                    let len = text.len() - text.iter().rev().take_while(|c| c.is_whitespace()).count();
                    let new_end = column.start + len;
                    let main = self.columns[self.columns.len() - 1];
                    columns[i].end = main.end.max(new_end).max(columns[i].end);
                    if new_end > main.end {
                        let main_index = self.columns.len() - 1;
                        self.columns[main_index].end = new_end;
                    }
                } else if i != last && !is_blank(slice(line, column.end, next_start)) {
                    let offset = start + line_offset;
                    return Err(TableMarkupError::new(
                        format!("Text in column margin in table line {}.", offset + 1),
                        offset,
                    ));
                }
            }
        }
        Ok(())
    }

    /// One cell per span, with `morecols` counting the joined columns.
    fn init_row(&self, spans: &[Column], offset: usize) -> Result<Vec<Cell>, TableMarkupError> {
        let misaligned = || {
            TableMarkupError::new(
                format!("Column span alignment problem in table line {}.", offset + 1),
                offset.saturating_sub(1),
            )
        };
        let mut i = 0;
        let mut cells = Vec::new();
        for span in spans {
            let column = self.columns.get(i).ok_or_else(misaligned)?;
            if span.start != column.start {
                return Err(misaligned());
            }
            let mut morecols = 0;
            while span.end != self.columns.get(i).ok_or_else(misaligned)?.end {
                i += 1;
                morecols += 1;
            }
            cells.push(Cell {
                morerows: 0,
                morecols,
                offset,
                lines: Vec::new(),
            });
            i += 1;
        }
        Ok(cells)
    }

    fn structure(self) -> TableData {
        let colwidths = self.columns.iter().map(|c| c.end - c.start).collect();
        let first_body_row = match self.head_body_sep {
            Some(sep) => self
                .table
                .iter()
                .position(|row| row.first().is_some_and(|c| c.offset > sep))
                .unwrap_or(0),
            None => 0,
        };
        let mut rows: Vec<Row> = self
            .table
            .into_iter()
            .map(|row| row.into_iter().map(Some).collect())
            .collect();
        let body = rows.split_off(first_body_row);
        TableData {
            colwidths,
            head: rows,
            body,
        }
    }
}

/// Parse an isolated simple table, borders included.
pub(crate) fn parse_simple_table(lines: &[String]) -> Result<TableData, TableMarkupError> {
    let mut parser = SimpleParser::new(lines);
    parser.find_head_body_sep()?;
    if let Some(sep) = parser.head_body_sep
        && (sep == 0 || sep + 1 == lines.len())
    {
        return Err(TableMarkupError::new(
            "The head/body row separator may not be the first or last line of the table.",
            sep,
        ));
    }
    parser.parse_table()?;
    Ok(parser.structure())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn header_and_body_rows() {
        let table = parse_simple_table(&lines(
            "=====  =====\n\
             A      B\n\
             =====  =====\n\
             1      2\n\
             3      4\n\
             =====  =====",
        ))
        .unwrap();
        assert_eq!(table.colwidths, vec![5, 5]);
        assert_eq!(table.head.len(), 1);
        assert_eq!(table.body.len(), 2);
        assert_eq!(table.body[1][1].as_ref().unwrap().lines, vec!["4"]);
    }

    #[test]
    fn blank_first_column_continues_row() {
        let table = parse_simple_table(&lines(
            "=====  =====\n\
             a      b\n\
             \x20      more\n\
             =====  =====",
        ))
        .unwrap();
        assert_eq!(table.body.len(), 1);
        assert_eq!(table.body[0][1].as_ref().unwrap().lines, vec!["b", "more"]);
    }

    #[test]
    fn span_underline_joins_columns() {
        let table = parse_simple_table(&lines(
            "=====  =====\n\
             both columns\n\
             ------------\n\
             1      2\n\
             =====  =====",
        ))
        .unwrap();
        let spanning = table.body[0][0].as_ref().unwrap();
        assert_eq!(spanning.morecols, 1);
        assert_eq!(table.body[0].len(), 1);
    }

    #[test]
    fn last_column_may_overflow() {
        let table = parse_simple_table(&lines("==  ==\na   long text\n==  ==")).unwrap();
        assert_eq!(table.body[0][1].as_ref().unwrap().lines, vec!["long text"]);
    }

    #[test]
    fn text_in_margin_is_an_error() {
        let err = parse_simple_table(&lines("===  ===\nabcdef x\n===  ===")).unwrap_err();
        assert_eq!(err.message, "Text in column margin in table line 2.");
        assert_eq!(err.offset, 1);
    }
}
