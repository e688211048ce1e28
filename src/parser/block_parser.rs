//! Block-level parser: a line-classifying state machine.
//!
//! Input is consumed line by line. The active [`State`] decides what each
//! line starts. Every nested block (list item body, block quote, directive
//! content, table cell) is parsed in its own [`Frame`]; handlers never
//! recurse into the parser, they queue frames that run before the queuing
//! frame resumes.

mod blockquotes;
mod definition_lists;
pub(crate) mod explicit;
pub(crate) mod line_blocks;
mod lists;
pub(crate) mod marker_utils;
mod paragraphs;
mod sections;
mod table_blocks;

use super::inline_parser::Inliner;
use super::line_source::{Block, LineSource};
use crate::error::Result;
use crate::nodes::{Document, Kind, NodeId};

/// One parser state. Every frame has `Body` (or `SubstitutionDef`) at the
/// bottom of its state stack; the others are pushed on top while a
/// construct spanning several lines is open.
#[derive(Debug, Clone)]
pub(crate) enum State {
    Body,
    BulletList {
        list: NodeId,
        bullet: char,
        blank_finish: bool,
    },
    EnumeratedList(lists::EnumState),
    FieldList {
        list: NodeId,
        blank_finish: bool,
    },
    OptionList {
        list: NodeId,
        blank_finish: bool,
    },
    LineBlock(line_blocks::LineBlockState),
    Explicit {
        blank_finish: bool,
    },
    DefinitionList {
        list: NodeId,
        blank_finish: bool,
    },
    /// A possible definition list term was consumed at `term`.
    Definition {
        term: usize,
    },
    /// A possible paragraph line was consumed at `start`.
    Text {
        start: usize,
    },
    /// A possible overline or transition was consumed at `start`.
    Line {
        start: usize,
    },
    /// Start of a substitution definition body: accepts one directive.
    SubstitutionDef {
        name: String,
    },
}

/// Work to do once a frame's lines are exhausted.
#[derive(Debug, Clone)]
pub(crate) enum Hook {
    /// Append nodes after the parsed content of `parent`.
    AppendChildren { parent: NodeId, children: Vec<NodeId> },
    /// Validate a parsed substitution definition and register it.
    SubstitutionDefinition(explicit::SubstitutionHook),
    /// Finish a directive whose content had to be parsed first.
    Directive(crate::parser::directives::DirectiveHook),
}

/// A nested parse over its own lines, appending to `parent`.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) lines: LineSource,
    pub(crate) parent: NodeId,
    pub(crate) states: Vec<State>,
    pub(crate) match_titles: bool,
    /// Open sections, outermost first. Only used when titles are allowed.
    pub(crate) sections: Vec<NodeId>,
    /// Treat the next line as plain text regardless of its markup.
    pub(crate) force_text: bool,
    pub(crate) hooks: Vec<Hook>,
}

impl Frame {
    pub(crate) fn new(block: Block, parent: NodeId) -> Self {
        Self {
            lines: LineSource::new(block),
            parent,
            states: vec![State::Body],
            match_titles: false,
            sections: Vec::new(),
            force_text: false,
            hooks: Vec::new(),
        }
    }

    pub(crate) fn with_hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub(crate) fn with_state(mut self, state: State) -> Self {
        self.states = vec![state];
        self
    }

    /// Where body elements go: the innermost open section, or the frame's parent.
    pub(crate) fn body_parent(&self) -> NodeId {
        self.sections.last().copied().unwrap_or(self.parent)
    }

    fn top_state(&self) -> State {
        self.states.last().cloned().unwrap_or(State::Body)
    }
}

pub struct BlockParser<'d> {
    pub(crate) doc: &'d mut Document,
    pub(crate) inliner: Inliner,
    pub(crate) frame: Frame,
    suspended: Vec<Frame>,
    queued: Vec<Frame>,
    /// Files currently being included, innermost last.
    pub(crate) include_log: Vec<std::path::PathBuf>,
}

impl<'d> BlockParser<'d> {
    pub fn new(doc: &'d mut Document) -> Self {
        let inliner = Inliner::new(&doc.settings);
        let root = doc.root();
        Self {
            doc,
            inliner,
            frame: Frame::new(Block::default(), root),
            suspended: Vec::new(),
            queued: Vec::new(),
            include_log: Vec::new(),
        }
    }

    /// Parse `lines` into the document root, with section titles allowed.
    pub fn parse(mut self, lines: LineSource) -> Result<()> {
        let mut top = Frame::new(Block::default(), self.doc.root());
        top.lines = lines;
        top.match_titles = true;
        self.frame = top;
        log::debug!("Starting block parse of {} lines", self.frame.lines.len());
        self.run()
    }

    fn run(&mut self) -> Result<()> {
        loop {
            if self.frame.lines.at_eof() {
                if self.frame_eof()? {
                    let hooks = std::mem::take(&mut self.frame.hooks);
                    for hook in hooks {
                        self.run_hook(hook)?;
                    }
                    match self.suspended.pop() {
                        Some(frame) => {
                            log::trace!("Resuming frame at line {}", frame.lines.current_lineno());
                            self.frame = frame;
                        }
                        None => break,
                    }
                }
            } else {
                self.doc.reporter.current_line = Some(self.frame.lines.current_lineno());
                self.dispatch()?;
            }
            self.flush_queued();
        }
        log::debug!("Block parse finished");
        Ok(())
    }

    /// Start queued frames, in queue order, before the current one resumes.
    fn flush_queued(&mut self) {
        if self.queued.is_empty() {
            return;
        }
        let mut queued = std::mem::take(&mut self.queued);
        let first = queued.remove(0);
        log::debug!(
            "Entering nested frame at line {} ({} more queued)",
            first.lines.current_lineno(),
            queued.len()
        );
        let outer = std::mem::replace(&mut self.frame, first);
        self.suspended.push(outer);
        while let Some(frame) = queued.pop() {
            self.suspended.push(frame);
        }
    }

    /// Queue a nested parse of `block` into `parent`.
    pub(crate) fn nested_parse(&mut self, block: Block, parent: NodeId) {
        self.queued.push(Frame::new(block, parent));
    }

    pub(crate) fn queue(&mut self, frame: Frame) {
        self.queued.push(frame);
    }

    /// Handle end of input for the current frame. Returns true once the frame
    /// has nothing left to do.
    fn frame_eof(&mut self) -> Result<bool> {
        match self.frame.top_state() {
            State::Body | State::SubstitutionDef { .. } => Ok(true),
            State::Text { start } => {
                self.frame.states.pop();
                self.text_eof(start)?;
                Ok(false)
            }
            State::Line { start } => {
                self.line_eof(start)?;
                Ok(false)
            }
            State::Definition { .. } => {
                self.frame.states.pop();
                self.frame.lines.rewind(1);
                self.end_state()?;
                Ok(false)
            }
            _ => {
                self.end_state()?;
                Ok(false)
            }
        }
    }

    fn dispatch(&mut self) -> Result<()> {
        let line = self.frame.lines.current().unwrap_or_default().to_string();
        let state = self.frame.top_state();
        log::trace!(
            "{:?} line {}: {:?}",
            state,
            self.frame.lines.current_lineno(),
            line
        );
        match state {
            State::Body => self.body(&line),
            State::Text { start } => self.text_state(start, &line),
            State::Line { start } => self.line_state(start, &line),
            State::BulletList { bullet, .. } => self.bullet_list_state(bullet, &line),
            State::EnumeratedList(_) => self.enumerated_list_state(&line),
            State::FieldList { .. } => self.field_list_state(&line),
            State::OptionList { .. } => self.option_list_state(&line),
            State::LineBlock(_) => self.line_block_state(&line),
            State::Explicit { .. } => self.explicit_state(&line),
            State::DefinitionList { .. } => self.definition_list_state(&line),
            State::Definition { term } => self.definition_state(term, &line),
            State::SubstitutionDef { name } => self.substitution_def_state(&name, &line),
        }
    }

    /// The main transition table.
    fn body(&mut self, line: &str) -> Result<()> {
        if std::mem::take(&mut self.frame.force_text) {
            return self.body_text();
        }
        if line.trim().is_empty() {
            self.frame.lines.advance(1);
            return Ok(());
        }
        if line.starts_with(' ') {
            return self.indented_block_quote();
        }
        if let Some(end) = marker_utils::bullet(line) {
            return self.bullet(line, end);
        }
        if let Some(m) = marker_utils::enumerator(line) {
            return self.enumerator(m);
        }
        if let Some(end) = marker_utils::field_marker(line) {
            return self.field_marker(line, end);
        }
        if let Some(end) = marker_utils::option_marker(line) {
            return self.option_marker(line, end);
        }
        if marker_utils::is_doctest(line) {
            return self.doctest();
        }
        if let Some(end) = marker_utils::line_block(line) {
            return self.line_block(line, end);
        }
        if marker_utils::is_grid_table_top(line) {
            return self.grid_table();
        }
        if marker_utils::is_simple_table_top(line) {
            return self.simple_table();
        }
        if let Some(end) = marker_utils::explicit_markup(line) {
            return self.explicit_markup(line, end);
        }
        if let Some(end) = marker_utils::anonymous_target(line) {
            return self.anonymous(line, end);
        }
        if marker_utils::is_line(line) {
            return self.body_line(line);
        }
        self.body_text()
    }

    /// Pop the top specialized state, finishing the construct it represents.
    pub(crate) fn end_state(&mut self) -> Result<()> {
        let Some(state) = self.frame.states.pop() else {
            return Ok(());
        };
        log::trace!("Leaving {state:?}");
        let (what, blank_finish) = match state {
            State::BulletList { blank_finish, .. } => ("Bullet list", blank_finish),
            State::EnumeratedList(ref e) => ("Enumerated list", e.blank_finish),
            State::FieldList { blank_finish, .. } => ("Field list", blank_finish),
            State::OptionList { blank_finish, .. } => ("Option list", blank_finish),
            State::Explicit { blank_finish } => ("Explicit markup", blank_finish),
            State::DefinitionList { blank_finish, .. } => ("Definition list", blank_finish),
            State::LineBlock(lb) => return self.finish_line_block(lb),
            _ => return Ok(()),
        };
        if !blank_finish {
            self.unindent_warning(what)?;
        }
        Ok(())
    }

    /// Update the `blank_finish` flag of the top list-like state.
    pub(crate) fn set_blank_finish(&mut self, value: bool) {
        match self.frame.states.last_mut() {
            Some(
                State::BulletList { blank_finish, .. }
                | State::FieldList { blank_finish, .. }
                | State::OptionList { blank_finish, .. }
                | State::Explicit { blank_finish }
                | State::DefinitionList { blank_finish, .. },
            ) => *blank_finish = value,
            Some(State::EnumeratedList(e)) => e.blank_finish = value,
            Some(State::LineBlock(lb)) => lb.blank_finish = value,
            _ => {}
        }
    }

    pub(crate) fn unindent_warning(&mut self, what: &str) -> Result<()> {
        let line = self.frame.lines.current_lineno();
        let msg = self
            .doc
            .warning(format!("{what} ends without a blank line; unexpected unindent."))
            .line(line)
            .emit()?;
        self.append(msg);
        Ok(())
    }

    pub(crate) fn append(&mut self, node: NodeId) {
        let parent = self.frame.body_parent();
        self.doc.append(parent, node);
    }

    pub(crate) fn append_all(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        let parent = self.frame.body_parent();
        self.doc.extend(parent, nodes);
    }

    /// Parse inline markup in `text`; returns the nodes and the messages to
    /// place after the enclosing element.
    pub(crate) fn inline_text(
        &mut self,
        text: &str,
        lineno: usize,
    ) -> Result<(Vec<NodeId>, Vec<NodeId>)> {
        let parent = self.frame.body_parent();
        self.inliner.parse(self.doc, text, lineno, parent)
    }

    /// New `literal_block` holding `text`.
    pub(crate) fn literal(&mut self, text: &str) -> NodeId {
        self.doc.new_text_element(Kind::LiteralBlock, text, text)
    }

    fn run_hook(&mut self, hook: Hook) -> Result<()> {
        log::trace!("Running finish hook {hook:?}");
        match hook {
            Hook::AppendChildren { parent, children } => {
                self.doc.extend(parent, children);
                Ok(())
            }
            Hook::SubstitutionDefinition(h) => self.finish_substitution_def(h),
            Hook::Directive(h) => crate::parser::directives::finish(self, h),
        }
    }
}

#[cfg(test)]
mod tests {
    mod body;
    mod explicit;
    mod helpers;
    mod lists;
    mod sections;
    mod tables;
}
