//! Normalized input lines with absolute line numbers.
//!
//! `pos` is always the index of the next line not yet consumed. Nested
//! parses get their own [`LineSource`] built from a [`Block`] that keeps the
//! absolute line numbers of the outer input.

/// A run of lines together with their absolute 1-based line numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub lines: Vec<String>,
    pub linenos: Vec<usize>,
}

impl Block {
    pub fn new(lines: Vec<String>, linenos: Vec<usize>) -> Self {
        debug_assert_eq!(lines.len(), linenos.len());
        Self { lines, linenos }
    }

    /// A block of consecutive lines starting at `first_lineno`.
    pub fn from_lines(lines: Vec<String>, first_lineno: usize) -> Self {
        let linenos = (first_lineno..first_lineno + lines.len()).collect();
        Self { lines, linenos }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn first_lineno(&self) -> Option<usize> {
        self.linenos.first().copied()
    }

    /// Drop the first line.
    pub fn trim_start(&mut self) {
        if !self.lines.is_empty() {
            self.lines.remove(0);
            self.linenos.remove(0);
        }
    }

    /// Drop the last line.
    pub fn trim_end(&mut self) {
        self.lines.pop();
        self.linenos.pop();
    }

    pub fn strip_leading_blanks(&mut self) -> usize {
        let mut dropped = 0;
        while self.lines.first().is_some_and(|l| l.trim().is_empty()) {
            self.trim_start();
            dropped += 1;
        }
        dropped
    }

    pub fn strip_trailing_blanks(&mut self) {
        while self.lines.last().is_some_and(|l| l.trim().is_empty()) {
            self.trim_end();
        }
    }

    /// Remove `n` leading characters from every line at index `start` or later.
    pub fn trim_left(&mut self, n: usize, start: usize) {
        for line in self.lines.iter_mut().skip(start) {
            let cut = line
                .char_indices()
                .nth(n)
                .map(|(i, _)| i)
                .unwrap_or(line.len());
            line.drain(..cut);
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> Block {
        let end = end.min(self.len());
        let start = start.min(end);
        Block {
            lines: self.lines[start..end].to_vec(),
            linenos: self.linenos[start..end].to_vec(),
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Result of [`LineSource::get_indented`].
#[derive(Debug, Clone, Default)]
pub struct Indented {
    pub block: Block,
    /// Common indentation that was stripped.
    pub indent: usize,
    /// Absolute line number of the first line of `block` (after leading blank
    /// lines were dropped).
    pub offset: usize,
    /// The block ended at a blank line or at end of input.
    pub blank_finish: bool,
}

/// How [`LineSource::get_indented`] determines the block indentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndentSpec {
    pub until_blank: bool,
    pub strip_indent: bool,
    /// Every line must be indented at least this much.
    pub block_indent: Option<usize>,
    /// The first line's indentation is known and removed as-is.
    pub first_indent: Option<usize>,
    /// Drop leading blank lines from the result.
    pub strip_top: bool,
}

impl IndentSpec {
    /// Indentation unknown; determined from the lines.
    pub fn unknown() -> Self {
        Self {
            strip_indent: true,
            strip_top: true,
            ..Self::default()
        }
    }

    pub fn known(indent: usize) -> Self {
        Self {
            block_indent: Some(indent),
            ..Self::unknown()
        }
    }

    pub fn first_known(indent: usize) -> Self {
        Self {
            first_indent: Some(indent),
            ..Self::unknown()
        }
    }

    pub fn until_blank(mut self, until_blank: bool) -> Self {
        self.until_blank = until_blank;
        self
    }

    pub fn strip_indent(mut self, strip_indent: bool) -> Self {
        self.strip_indent = strip_indent;
        self
    }

    pub fn strip_top(mut self, strip_top: bool) -> Self {
        self.strip_top = strip_top;
        self
    }
}

/// Result of [`LineSource::get_text_block`].
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub block: Block,
    /// Absolute line number of an unexpectedly indented line, when
    /// `flush_left` was requested.
    pub unexpected_indent: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct LineSource {
    block: Block,
    pos: usize,
}

fn is_line_separator(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn expand_tabs(line: &str, tab_width: usize) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + tab_width);
    let mut col = 0;
    for c in line.chars() {
        if c == '\t' {
            let spaces = if tab_width == 0 {
                0
            } else {
                tab_width - col % tab_width
            };
            out.extend(std::iter::repeat_n(' ', spaces));
            col += spaces;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out
}

/// Split `text` into lines: vertical tab and form feed become spaces, tabs
/// are expanded, trailing whitespace is stripped and empty lines are kept.
pub fn string_to_lines(text: &str, tab_width: usize) -> Vec<String> {
    let text = text.replace(['\x0b', '\x0c'], " ");
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    let mut ended_on_separator = false;
    while let Some(c) = chars.next() {
        if is_line_separator(c) {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            lines.push(std::mem::take(&mut current));
            ended_on_separator = true;
        } else {
            current.push(c);
            ended_on_separator = false;
        }
    }
    if !current.is_empty() || (!ended_on_separator && !text.is_empty()) {
        lines.push(current);
    }
    lines
        .into_iter()
        .map(|l| expand_tabs(&l, tab_width).trim_end().to_string())
        .collect()
}

impl LineSource {
    pub fn from_text(text: &str, tab_width: usize) -> Self {
        let lines = string_to_lines(text, tab_width);
        Self::new(Block::from_lines(lines, 1))
    }

    pub fn new(block: Block) -> Self {
        Self { block, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.len());
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.len()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.block.lines.get(index).map(String::as_str)
    }

    /// The next unconsumed line.
    pub fn current(&self) -> Option<&str> {
        self.line(self.pos)
    }

    /// Line at `offset` relative to the next unconsumed line.
    pub fn peek(&self, offset: isize) -> Option<&str> {
        let index = self.pos as isize + offset;
        if index < 0 {
            return None;
        }
        self.line(index as usize)
    }

    pub fn advance(&mut self, n: usize) {
        self.set_pos(self.pos + n);
    }

    pub fn rewind(&mut self, n: usize) {
        self.pos = self.pos.saturating_sub(n);
    }

    /// Absolute line number of the line at `index`. Past the end, one past
    /// the last line.
    pub fn lineno(&self, index: usize) -> usize {
        match self.block.linenos.get(index) {
            Some(n) => *n,
            None => self.block.linenos.last().map_or(1, |n| n + 1),
        }
    }

    /// Absolute line number of the next unconsumed line.
    pub fn current_lineno(&self) -> usize {
        self.lineno(self.pos)
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Lines from `start` up to `end`.
    pub fn slice(&self, start: usize, end: usize) -> Block {
        self.block.slice(start, end)
    }

    /// Contiguous non-blank lines starting at `start`. Does not move `pos`.
    pub fn get_text_block(&self, start: usize, flush_left: bool) -> TextBlock {
        let mut end = start;
        let mut unexpected_indent = None;
        while let Some(line) = self.line(end) {
            if line.trim().is_empty() {
                break;
            }
            if flush_left && line.starts_with(' ') {
                unexpected_indent = Some(self.lineno(end));
                break;
            }
            end += 1;
        }
        TextBlock {
            block: self.slice(start, end),
            unexpected_indent,
        }
    }

    /// Extract the indented block starting at `pos` and consume it.
    ///
    /// With `first_indent`, the first line is part of the block regardless
    /// of its indentation and has exactly that many characters removed.
    pub fn get_indented(&mut self, spec: IndentSpec) -> Indented {
        let start = self.pos;
        let offset = self.lineno(start);
        let first_indent = spec.first_indent.or(spec.block_indent);
        let mut indent = spec.block_indent;
        let mut end = start;
        if first_indent.is_some() {
            end += 1;
        }
        let mut blank_finish = true;
        while let Some(line) = self.line(end) {
            let insufficient = !line.is_empty()
                && (!line.starts_with(' ')
                    || spec.block_indent.is_some_and(|bi| {
                        line.chars().take(bi).any(|c| !c.is_whitespace())
                    }));
            if insufficient {
                blank_finish = end > start
                    && self.line(end - 1).is_some_and(|l| l.trim().is_empty());
                break;
            }
            let stripped = line.trim_start();
            if stripped.is_empty() {
                if spec.until_blank {
                    blank_finish = true;
                    break;
                }
            } else if spec.block_indent.is_none() {
                let line_indent = line.chars().count() - stripped.chars().count();
                indent = Some(indent.map_or(line_indent, |i| i.min(line_indent)));
            }
            end += 1;
        }

        let mut block = self.slice(start, end);
        if let Some(first) = first_indent
            && let Some(line) = block.lines.first_mut()
        {
            let cut = line
                .char_indices()
                .nth(first)
                .map(|(i, _)| i)
                .unwrap_or(line.len());
            line.drain(..cut);
        }
        let indent = indent.unwrap_or(0);
        if indent > 0 && spec.strip_indent {
            block.trim_left(indent, usize::from(first_indent.is_some()));
        }
        self.pos = end;

        if spec.strip_top {
            block.strip_leading_blanks();
        }
        let offset = block.first_lineno().unwrap_or(offset);
        Indented {
            block,
            indent,
            offset,
            blank_finish,
        }
    }

    /// Splice `block` in before the next unconsumed line.
    pub fn insert(&mut self, block: Block) {
        let at = self.pos;
        self.block.lines.splice(at..at, block.lines);
        self.block.linenos.splice(at..at, block.linenos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_all_terminators() {
        let lines = string_to_lines("a\r\nb\rc\nd\x1ce", 8);
        assert_eq!(lines, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn keeps_empty_lines_and_strips_trailing_space() {
        let lines = string_to_lines("a  \n\n  b\t\n", 8);
        assert_eq!(lines, vec!["a", "", "  b"]);
    }

    #[test]
    fn expands_tabs_to_stops() {
        assert_eq!(string_to_lines("a\tb", 4), vec!["a   b"]);
        assert_eq!(string_to_lines("\tx", 8), vec!["        x"]);
        assert_eq!(string_to_lines("x\x0by", 8), vec!["x y"]);
    }

    #[test]
    fn text_block_stops_at_blank() {
        let src = LineSource::from_text("one\ntwo\n\nthree", 8);
        let tb = src.get_text_block(0, false);
        assert_eq!(tb.block.lines, vec!["one", "two"]);
        assert_eq!(tb.unexpected_indent, None);
    }

    #[test]
    fn text_block_flush_left_reports_indent() {
        let src = LineSource::from_text("one\n  two\n", 8);
        let tb = src.get_text_block(0, true);
        assert_eq!(tb.block.lines, vec!["one"]);
        assert_eq!(tb.unexpected_indent, Some(2));
    }

    #[test]
    fn get_indented_unknown() {
        let mut src = LineSource::from_text("  a\n    b\n\n  c\nd", 8);
        let ind = src.get_indented(IndentSpec::unknown());
        assert_eq!(ind.block.lines, vec!["a", "  b", "", "c"]);
        assert_eq!(ind.indent, 2);
        assert_eq!(ind.offset, 1);
        assert!(!ind.blank_finish);
        assert_eq!(src.pos(), 4);
        assert_eq!(src.current(), Some("d"));
    }

    #[test]
    fn get_indented_until_blank() {
        let mut src = LineSource::from_text("  a\n  b\n\n  c", 8);
        let ind = src.get_indented(IndentSpec::unknown().until_blank(true));
        assert_eq!(ind.block.lines, vec!["a", "b"]);
        assert!(ind.blank_finish);
        assert_eq!(src.pos(), 2);
    }

    #[test]
    fn get_first_known_indented() {
        let mut src = LineSource::from_text("- item\n  more\n\nnext", 8);
        let ind = src.get_indented(IndentSpec::first_known(2));
        assert_eq!(ind.block.lines, vec!["item", "more", ""]);
        assert!(ind.blank_finish);
        assert_eq!(src.current(), Some("next"));
    }

    #[test]
    fn get_known_indented_stops_on_short_indent() {
        let mut src = LineSource::from_text("1. a\n   b\n  c", 8);
        let ind = src.get_indented(IndentSpec::known(3));
        assert_eq!(ind.block.lines, vec!["a", "b"]);
        assert!(!ind.blank_finish);
        assert_eq!(src.current(), Some("  c"));
    }

    #[test]
    fn leading_blank_lines_shift_offset() {
        let mut src = LineSource::from_text("x\n\n  body", 8);
        let ind = src.get_indented(IndentSpec::first_known(1));
        assert_eq!(ind.block.lines, vec!["body"]);
        assert_eq!(ind.offset, 3);
    }

    #[test]
    fn insert_splices_before_next_line() {
        let mut src = LineSource::from_text("a\nb", 8);
        src.advance(1);
        src.insert(Block::from_lines(vec!["x".into()], 100));
        assert_eq!(src.current(), Some("x"));
        assert_eq!(src.current_lineno(), 100);
        assert_eq!(src.line(2), Some("b"));
    }
}
