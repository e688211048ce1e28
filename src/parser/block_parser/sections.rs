//! Section titles (underlined or over- and underlined) and transitions.

use super::marker_utils;
use super::{BlockParser, State};
use crate::error::Result;
use crate::nodes::{Kind, NodeId, fully_normalize_name};
use crate::utils::column_width;

const SHORT_TITLE_UNDERLINE: &str = "Possible title underline, too short for the title.\n\
     Treating it as ordinary text because it's so short.";
const SHORT_OVERLINE: &str = "Possible incomplete section title.\n\
     Treating the overline as ordinary text because it's so short.";
const SHORT_LINE: &str = "Unexpected possible title overline or transition.\n\
     Treating it as ordinary text because it's so short.";

/// A title style: the underline character and the overline character, if any.
pub(crate) type TitleStyle = (char, Option<char>);

impl BlockParser<'_> {
    /// Re-read the line at `start` as plain paragraph text.
    fn retry_as_text(&mut self, start: usize) {
        self.frame.lines.set_pos(start);
        self.frame.force_text = true;
    }

    /// The line after `start` underlines it.
    pub(super) fn text_underline(&mut self, start: usize, line: &str) -> Result<()> {
        let title_line = self.frame.lines.line(start).unwrap_or_default().to_string();
        let title = title_line.trim_end();
        let underline = line.trim_end();
        let lineno = self.frame.lines.current_lineno();
        let source = format!("{title}\n{underline}");
        let block_text = format!("{title_line}\n{line}");

        let mut messages = Vec::new();
        if column_width(title) > underline.chars().count() {
            if underline.chars().count() < 4 {
                if self.frame.match_titles {
                    let msg = self.doc.info(SHORT_TITLE_UNDERLINE).line(lineno).emit()?;
                    self.append(msg);
                }
                return self.text_paragraph(start);
            }
            let msg = self
                .doc
                .warning("Title underline too short.")
                .literal(block_text.as_str())
                .line(lineno)
                .emit()?;
            messages.push(msg);
        }
        self.frame.lines.advance(1);

        if !self.frame.match_titles {
            let msg = self
                .doc
                .severe("Unexpected section title.")
                .literal(block_text)
                .line(lineno)
                .emit()?;
            self.append_all(messages);
            self.append(msg);
            return Ok(());
        }
        let style = (underline.chars().next().unwrap_or('='), None);
        let title_lineno = self.frame.lines.lineno(start);
        self.new_section(title, &source, style, title_lineno, messages)
    }

    /// A punctuation line in the body: overline or transition.
    pub(super) fn body_line(&mut self, line: &str) -> Result<()> {
        if self.frame.match_titles {
            let start = self.frame.lines.pos();
            self.frame.lines.advance(1);
            self.frame.states.push(State::Line { start });
            return Ok(());
        }
        let marker = line.trim();
        if marker == "::" {
            return self.body_text();
        }
        let lineno = self.frame.lines.current_lineno();
        if marker.chars().count() < 4 {
            let msg = self.doc.info(SHORT_LINE).line(lineno).emit()?;
            self.append(msg);
            return self.body_text();
        }
        let msg = self
            .doc
            .severe("Unexpected section title or transition.")
            .literal(line)
            .line(lineno)
            .emit()?;
        self.append(msg);
        self.frame.lines.advance(1);
        Ok(())
    }

    fn short_overline(&mut self, start: usize) -> Result<()> {
        let lineno = self.frame.lines.lineno(start);
        let msg = self.doc.info(SHORT_OVERLINE).line(lineno).emit()?;
        self.append(msg);
        self.retry_as_text(start);
        Ok(())
    }

    fn transition(&mut self, start: usize) -> Result<()> {
        let marker = self.frame.lines.line(start).unwrap_or_default().to_string();
        if marker.trim().chars().count() < 4 {
            self.retry_as_text(start);
            return Ok(());
        }
        let transition = self.doc.new_element(Kind::Transition);
        self.doc.set_rawsource(transition, marker.trim());
        self.doc.set_line(transition, self.frame.lines.lineno(start));
        self.append(transition);
        Ok(())
    }

    /// The line after an overline candidate at `start`.
    pub(super) fn line_state(&mut self, start: usize, line: &str) -> Result<()> {
        self.frame.states.pop();
        if line.trim().is_empty() {
            self.frame.lines.advance(1);
            return self.transition(start);
        }
        let overline = self.frame.lines.line(start).unwrap_or_default().to_string();
        let short = overline.trim_end().chars().count() < 4;
        if marker_utils::is_line(line) {
            if short {
                return self.short_overline(start);
            }
            let block_text = format!("{overline}\n{line}");
            let msg = self
                .doc
                .error("Invalid section title or transition marker.")
                .literal(block_text)
                .line(self.frame.lines.lineno(start))
                .emit()?;
            self.append(msg);
            self.frame.lines.advance(1);
            return Ok(());
        }
        self.overlined_title(start, &overline, line)
    }

    fn overlined_title(&mut self, start: usize, overline: &str, title: &str) -> Result<()> {
        let lineno = self.frame.lines.lineno(start);
        let short = overline.trim_end().chars().count() < 4;
        self.frame.lines.advance(1);

        let Some(underline) = self.frame.lines.current().map(str::to_string) else {
            if short {
                return self.short_overline(start);
            }
            let block_text = format!("{overline}\n{title}");
            let msg = self
                .doc
                .severe("Incomplete section title.")
                .literal(block_text)
                .line(lineno)
                .emit()?;
            self.append(msg);
            return Ok(());
        };
        self.frame.lines.advance(1);

        let source = format!("{overline}\n{title}\n{underline}");
        let overline = overline.trim_end();
        let underline = underline.trim_end();
        let problem = if !marker_utils::is_line(underline) {
            Some("Missing matching underline for section title overline.")
        } else if overline != underline {
            Some("Title overline & underline mismatch.")
        } else {
            None
        };
        if let Some(problem) = problem {
            if short {
                return self.short_overline(start);
            }
            let msg = self
                .doc
                .severe(problem)
                .literal(source.as_str())
                .line(lineno)
                .emit()?;
            self.append(msg);
            return Ok(());
        }

        let title = title.trim_end();
        let mut messages = Vec::new();
        if column_width(title) > overline.chars().count() {
            if short {
                return self.short_overline(start);
            }
            let msg = self
                .doc
                .warning("Title overline too short.")
                .literal(source.as_str())
                .line(lineno)
                .emit()?;
            messages.push(msg);
        }
        let style = (
            underline.chars().next().unwrap_or('='),
            overline.chars().next(),
        );
        self.new_section(title.trim_start(), &source, style, lineno + 1, messages)
    }

    pub(super) fn line_eof(&mut self, start: usize) -> Result<()> {
        self.frame.states.pop();
        self.transition(start)
    }

    /// Place a title of `style` in the section hierarchy. Closes sections
    /// at the same or deeper level. Returns false when the style does not
    /// fit the current nesting.
    fn check_subsection(&mut self, source: &str, style: TitleStyle, lineno: usize) -> Result<bool> {
        let depth = self.frame.sections.len();
        let level = match self.doc.title_styles.iter().position(|s| *s == style) {
            Some(index) => index + 1,
            None if self.doc.title_styles.len() == depth => {
                self.doc.title_styles.push(style);
                return Ok(true);
            }
            None => {
                self.title_inconsistent(source, lineno)?;
                return Ok(false);
            }
        };
        if level <= depth {
            self.frame.sections.truncate(level - 1);
            return Ok(true);
        }
        if level == depth + 1 {
            return Ok(true);
        }
        self.title_inconsistent(source, lineno)?;
        Ok(false)
    }

    fn title_inconsistent(&mut self, source: &str, lineno: usize) -> Result<()> {
        let msg = self
            .doc
            .severe("Title level inconsistent:")
            .literal(source)
            .line(lineno)
            .emit()?;
        self.append(msg);
        Ok(())
    }

    fn new_section(
        &mut self,
        title: &str,
        source: &str,
        style: TitleStyle,
        lineno: usize,
        messages: Vec<NodeId>,
    ) -> Result<()> {
        if !self.check_subsection(source, style, lineno)? {
            return Ok(());
        }
        log::debug!(
            "Section {:?} at level {} (line {lineno})",
            title,
            self.frame.sections.len() + 1
        );
        let section = self.doc.new_element(Kind::Section);
        self.append(section);
        let (nodes, title_messages) = self.inline_text(title, lineno)?;
        let title_node = self.doc.new_element_with(Kind::Title, nodes);
        self.doc.set_rawsource(title_node, title);
        self.doc.set_line(title_node, lineno);
        let name = fully_normalize_name(&self.doc.astext(title_node));
        self.doc.push_attr(section, "names", name);
        self.doc.append(section, title_node);
        self.doc.extend(section, messages);
        self.doc.extend(section, title_messages);
        self.doc.note_implicit_target(section, Some(section))?;
        self.frame.sections.push(section);
        Ok(())
    }
}
