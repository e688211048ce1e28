//! Grid tables: cells drawn with `+`, `-`, `=` and `|`.
//!
//! Cells are found by scanning from each known top-left corner right, down,
//! left and up until a closed rectangle is found. A cell found from one
//! corner contributes its top-right and bottom-left corners as new starting
//! points.

use std::collections::{BTreeMap, BTreeSet};

use super::{Cell, Row, TableData, TableMarkupError, block_2d, padded};

fn is_head_body_separator(line: &[char]) -> bool {
    let text: String = line.iter().collect();
    let text = text.trim_end();
    text.len() >= 4
        && text.starts_with("+=")
        && text.ends_with("=+")
        && text.chars().all(|c| c == '=' || c == '+')
}

struct FoundCell {
    top: usize,
    left: usize,
    bottom: usize,
    right: usize,
    lines: Vec<String>,
}

struct GridParser {
    rows: Vec<Vec<char>>,
    bottom: usize,
    right: usize,
    head_body_sep: Option<usize>,
    /// Per column, the last row index already covered by a cell.
    done: Vec<isize>,
    cells: Vec<FoundCell>,
    rowseps: BTreeSet<usize>,
    colseps: BTreeSet<usize>,
}

impl GridParser {
    fn new(lines: &[String]) -> Self {
        let rows: Vec<Vec<char>> = lines.iter().map(|l| padded(l)).collect();
        let width = rows.first().map_or(0, Vec::len);
        Self {
            bottom: rows.len().saturating_sub(1),
            right: width.saturating_sub(1),
            rows,
            head_body_sep: None,
            done: vec![-1; width],
            cells: Vec::new(),
            rowseps: BTreeSet::from([0]),
            colseps: BTreeSet::from([0]),
        }
    }

    fn at(&self, row: usize, col: usize) -> char {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(' ')
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
            for c in &mut self.rows[i] {
                if *c == '=' {
                    *c = '-';
                }
            }
        }
        if let Some(sep) = self.head_body_sep
            && (sep == 0 || sep == self.bottom)
        {
            return Err(TableMarkupError::new(
                "The head/body row separator may not be the first or last line of the table.",
                sep,
            ));
        }
        Ok(())
    }

    fn parse_table(&mut self) -> Result<(), TableMarkupError> {
        let mut corners = vec![(0usize, 0usize)];
        while !corners.is_empty() {
            let (top, left) = corners.remove(0);
            if top == self.bottom || left == self.right || top as isize <= self.done[left] {
                continue;
            }
            let Some((bottom, right, rowseps, colseps)) = self.scan_right(top, left) else {
                continue;
            };
            self.rowseps.extend(rowseps);
            self.colseps.extend(colseps);
            for col in left..right {
                self.done[col] = bottom as isize - 1;
            }
            let lines = block_2d(&self.rows, top + 1, left + 1, bottom, right);
            self.cells.push(FoundCell {
                top,
                left,
                bottom,
                right,
                lines,
            });
            corners.push((top, right));
            corners.push((bottom, left));
            corners.sort_unstable();
        }
        let last = self.bottom as isize - 1;
        if self.done[..self.right].iter().any(|&d| d != last) {
            return Err(TableMarkupError::new("Malformed table; parse incomplete.", 0));
        }
        Ok(())
    }

    /// Along the top edge from the corner at (`top`, `left`).
    fn scan_right(
        &self,
        top: usize,
        left: usize,
    ) -> Option<(usize, usize, Vec<usize>, Vec<usize>)> {
        let mut colseps = Vec::new();
        for i in left + 1..=self.right {
            match self.at(top, i) {
                '+' => {
                    colseps.push(i);
                    if let Some((bottom, rowseps, more)) = self.scan_down(top, left, i) {
                        colseps.extend(more);
                        return Some((bottom, i, rowseps, colseps));
                    }
                }
                '-' => {}
                _ => return None,
            }
        }
        None
    }

    fn scan_down(&self, top: usize, left: usize, right: usize) -> Option<(usize, Vec<usize>, Vec<usize>)> {
        let mut rowseps = Vec::new();
        for i in top + 1..=self.bottom {
            match self.at(i, right) {
                '+' => {
                    rowseps.push(i);
                    if let Some((more, colseps)) = self.scan_left(top, left, i, right) {
                        rowseps.extend(more);
                        return Some((i, rowseps, colseps));
                    }
                }
                '|' => {}
                _ => return None,
            }
        }
        None
    }

    fn scan_left(
        &self,
        top: usize,
        left: usize,
        bottom: usize,
        right: usize,
    ) -> Option<(Vec<usize>, Vec<usize>)> {
        let mut colseps = Vec::new();
        for i in (left + 1..right).rev() {
            match self.at(bottom, i) {
                '+' => colseps.push(i),
                '-' => {}
                _ => return None,
            }
        }
        if self.at(bottom, left) != '+' {
            return None;
        }
        let rowseps = self.scan_up(top, left, bottom)?;
        Some((rowseps, colseps))
    }

    fn scan_up(&self, top: usize, left: usize, bottom: usize) -> Option<Vec<usize>> {
        let mut rowseps = Vec::new();
        for i in (top + 1..bottom).rev() {
            match self.at(i, left) {
                '+' => rowseps.push(i),
                '|' => {}
                _ => return None,
            }
        }
        Some(rowseps)
    }

    fn structure(self) -> Result<TableData, TableMarkupError> {
        let rowseps: Vec<usize> = self.rowseps.into_iter().collect();
        let colseps: Vec<usize> = self.colseps.into_iter().collect();
        let rowindex: BTreeMap<usize, usize> =
            rowseps.iter().enumerate().map(|(i, &r)| (r, i)).collect();
        let colindex: BTreeMap<usize, usize> =
            colseps.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        let colwidths: Vec<usize> = colseps.windows(2).map(|w| w[1] - w[0] - 1).collect();

        let mut rows: Vec<Row> = vec![vec![None; colwidths.len()]; rowseps.len().saturating_sub(1)];
        let mut remaining = rows.len() * colwidths.len();
        for cell in self.cells {
            let incomplete = || TableMarkupError::new("Malformed table; parse incomplete.", cell.top);
            let rownum = *rowindex.get(&cell.top).ok_or_else(incomplete)?;
            let colnum = *colindex.get(&cell.left).ok_or_else(incomplete)?;
            let morerows = rowindex.get(&cell.bottom).ok_or_else(incomplete)? - rownum - 1;
            let morecols = colindex.get(&cell.right).ok_or_else(incomplete)? - colnum - 1;
            let slot = rows
                .get_mut(rownum)
                .and_then(|r| r.get_mut(colnum))
                .ok_or_else(incomplete)?;
            if slot.is_some() {
                return Err(incomplete());
            }
            remaining = remaining.saturating_sub((morerows + 1) * (morecols + 1));
            *slot = Some(Cell {
                morerows,
                morecols,
                offset: cell.top + 1,
                lines: cell.lines,
            });
        }
        if remaining != 0 {
            return Err(TableMarkupError::new("Malformed table; unused cells remaining.", 0));
        }
        let split = match self.head_body_sep {
            Some(sep) => rowindex.get(&sep).copied().unwrap_or(0),
            None => 0,
        };
        let body = rows.split_off(split);
        Ok(TableData {
            colwidths,
            head: rows,
            body,
        })
    }
}

/// Parse an isolated grid table. Lines must be stripped and of equal width.
pub(crate) fn parse_grid_table(lines: &[String]) -> Result<TableData, TableMarkupError> {
    let mut parser = GridParser::new(lines);
    parser.find_head_body_sep()?;
    parser.parse_table()?;
    parser.structure()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn two_by_two_with_header() {
        let table = parse_grid_table(&lines(
            "+-----+-----+\n\
             | h1  | h2  |\n\
             +=====+=====+\n\
             | a   | b   |\n\
             +-----+-----+",
        ))
        .unwrap();
        assert_eq!(table.colwidths, vec![5, 5]);
        assert_eq!(table.head.len(), 1);
        assert_eq!(table.body.len(), 1);
        let cell = table.body[0][1].as_ref().unwrap();
        assert_eq!(cell.lines, vec!["b"]);
        assert_eq!(cell.offset, 3);
    }

    #[test]
    fn spanning_cells() {
        let table = parse_grid_table(&lines(
            "+---+---+\n\
             | wide  |\n\
             +---+---+\n\
             | a | b |\n\
             +   +---+\n\
             |   | c |\n\
             +---+---+",
        ))
        .unwrap();
        let wide = table.body[0][0].as_ref().unwrap();
        assert_eq!(wide.morecols, 1);
        assert!(table.body[0][1].is_none());
        let tall = table.body[1][0].as_ref().unwrap();
        assert_eq!(tall.morerows, 1);
        assert!(table.body[2][0].is_none());
        assert_eq!(table.body[2][1].as_ref().unwrap().lines, vec!["c"]);
    }

    #[test]
    fn broken_border_is_incomplete() {
        let err = parse_grid_table(&lines(
            "+---+---+\n\
             | a   b |\n\
             +---+---+\n\
             | c | d  \n\
             +---+---+",
        ))
        .unwrap_err();
        assert!(err.message.starts_with("Malformed table"));
    }

    #[test]
    fn two_separators_are_rejected() {
        let err = parse_grid_table(&lines(
            "+---+\n| a |\n+===+\n| b |\n+===+\n| c |\n+---+",
        ))
        .unwrap_err();
        assert!(err.message.starts_with("Multiple head/body row separators"));
        assert_eq!(err.offset, 4);
    }
}
