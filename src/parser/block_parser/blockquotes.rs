//! Block quotes and their attributions.

use super::{BlockParser, Frame, Hook};
use crate::error::Result;
use crate::nodes::{Kind, NodeId};
use crate::parser::line_source::{Block, IndentSpec};

/// Length of an attribution marker (`--`, `---` or an em dash plus the
/// following spaces) when `line` starts with one followed by text.
fn attribution_marker(line: &str) -> Option<usize> {
    let dashes = line.chars().take_while(|&c| c == '-').count();
    let marker = match dashes {
        2 | 3 => dashes,
        0 if line.starts_with('\u{2014}') => '\u{2014}'.len_utf8(),
        _ => return None,
    };
    let rest = &line[marker..];
    let text = rest.trim_start_matches(' ');
    if text.is_empty() {
        return None;
    }
    Some(line.len() - text.len())
}

/// End (exclusive) and indentation of the attribution starting at `start`.
/// `None` when the continuation lines are not consistently indented.
fn check_attribution(lines: &[String], start: usize) -> Option<(usize, usize)> {
    let mut indent = None;
    let mut end = start + 1;
    while end < lines.len() {
        let line = lines[end].trim_end();
        if line.is_empty() {
            break;
        }
        let line_indent = line.len() - line.trim_start().len();
        match indent {
            None => indent = Some(line_indent),
            Some(i) if i != line_indent => return None,
            Some(_) => {}
        }
        end += 1;
    }
    Some((end, indent.unwrap_or(0)))
}

/// Lines of a block quote, an optional attribution and whatever follows it.
struct Split {
    quote: Block,
    attribution: Option<Block>,
    rest: Block,
}

/// Split off an attribution: a dash-led paragraph that follows a blank line.
fn split_attribution(block: Block) -> Split {
    let mut blank = None;
    let mut nonblank_seen = false;
    for (i, raw) in block.lines.iter().enumerate() {
        let line = raw.trim_end();
        if line.is_empty() {
            blank = Some(i);
            continue;
        }
        if nonblank_seen
            && i > 0
            && blank == Some(i - 1)
            && let Some(marker_end) = attribution_marker(line)
            && let Some((end, indent)) = check_attribution(&block.lines, i)
        {
            let mut attribution = block.slice(i, end);
            if let Some(first) = attribution.lines.first_mut() {
                first.drain(..marker_end);
            }
            attribution.trim_left(indent, 1);
            return Split {
                quote: block.slice(0, i),
                attribution: Some(attribution),
                rest: block.slice(end, block.len()),
            };
        }
        nonblank_seen = true;
    }
    Split {
        quote: block,
        attribution: None,
        rest: Block::default(),
    }
}

impl BlockParser<'_> {
    pub(super) fn indented_block_quote(&mut self) -> Result<()> {
        let indented = self.frame.lines.get_indented(IndentSpec::unknown());
        self.block_quote(indented.block)?;
        if !indented.blank_finish {
            self.unindent_warning("Block quote")?;
        }
        Ok(())
    }

    /// Append one block quote per attribution-separated part of `block`.
    pub(super) fn block_quote(&mut self, block: Block) -> Result<()> {
        let nodes = self.block_quotes(block)?;
        self.append_all(nodes);
        Ok(())
    }

    /// Build the block quotes for `block` (plus attribution messages);
    /// their content is parsed by queued frames.
    pub(crate) fn block_quotes(&mut self, mut block: Block) -> Result<Vec<NodeId>> {
        let mut nodes = Vec::new();
        while !block.is_empty() {
            let quote = self.doc.new_element(Kind::BlockQuote);
            self.doc.set_rawsource(quote, block.text());
            if let Some(line) = block.first_lineno() {
                self.doc.set_line(quote, line);
            }
            nodes.push(quote);
            let Split {
                quote: quote_lines,
                attribution,
                rest,
            } = split_attribution(block);

            let mut frame = Frame::new(quote_lines, quote);
            if let Some(lines) = attribution {
                let lineno = lines.first_lineno().unwrap_or_default();
                let text = lines.text().trim_end().to_string();
                let (children, messages) = self.inline_text(&text, lineno)?;
                let node = self.doc.new_element_with(Kind::Attribution, children);
                self.doc.set_rawsource(node, text);
                self.doc.set_line(node, lineno);
                nodes.extend(messages);
                frame = frame.with_hook(Hook::AppendChildren {
                    parent: quote,
                    children: vec![node],
                });
            }
            self.queue(frame);

            block = rest;
            block.strip_leading_blanks();
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Block {
        Block::from_lines(text.lines().map(str::to_string).collect(), 1)
    }

    #[test]
    fn attribution_markers() {
        assert_eq!(attribution_marker("-- Someone"), Some(3));
        assert_eq!(attribution_marker("---  Someone"), Some(5));
        assert_eq!(attribution_marker("\u{2014}Someone"), Some(3));
        assert_eq!(attribution_marker("---- Someone"), None);
        assert_eq!(attribution_marker("--"), None);
    }

    #[test]
    fn splits_attribution_after_blank_line() {
        let split = split_attribution(lines("Quote.\n\n-- Author\n   continued\n\nMore."));
        assert_eq!(split.quote.lines, ["Quote.", ""]);
        assert_eq!(
            split.attribution.map(|a| a.lines),
            Some(vec!["Author".to_string(), "continued".to_string()])
        );
        assert_eq!(split.rest.lines, ["", "More."]);
    }

    #[test]
    fn ragged_attribution_is_not_split() {
        let split = split_attribution(lines("Quote.\n\n-- Author\n   a\n  b"));
        assert!(split.attribution.is_none());
        assert_eq!(split.quote.len(), 5);
    }
}
