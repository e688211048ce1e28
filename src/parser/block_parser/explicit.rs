//! Explicit markup blocks (`.. `) and anonymous targets (`__ `).

use std::sync::LazyLock;

use regex::Regex;

use super::marker_utils::{self, SIMPLENAME, is_simplename};
use super::{BlockParser, Frame, Hook, State};
use crate::error::Result;
use crate::nodes::{Kind, NodeId, fully_normalize_name, whitespace_normalize_name};
use crate::parser::inline_parser::adjust_uri;
use crate::parser::line_source::IndentSpec;
use crate::utils::{escape2null, split_escaped_whitespace, unescape};

static FOOTNOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\.\. +\[([0-9]+|#|#{SIMPLENAME}|\*)\](?: +|$)"))
        .expect("valid footnote regex")
});

static CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\.\. +\[({SIMPLENAME})\](?: +|$)")).expect("valid citation regex")
});

static HYPERLINK_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\. +(_)[^ ]").expect("valid target regex"));

static SUBSTITUTION_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\. +(\|)[^ ]").expect("valid substitution regex"));

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\.\. +({SIMPLENAME}) ?::(?: +|$)")).expect("valid directive regex")
});

static EMBEDDED_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({SIMPLENAME})::(?: +|$)")).expect("valid directive regex")
});

/// Markup that looked like a construct but is malformed; the block becomes
/// a comment plus a warning.
struct MarkupError(String);

type Construct = std::result::Result<(Vec<NodeId>, bool), MarkupError>;

/// A substitution definition waiting for its embedded directive.
#[derive(Debug, Clone)]
pub(crate) struct SubstitutionHook {
    node: NodeId,
    name: String,
    block_text: String,
    lineno: usize,
    parent: NodeId,
}

/// `(optional space) : (spaces or end)` at char index `i`; returns the end index.
fn target_tail(chars: &[char], mut i: usize) -> Option<usize> {
    match (chars.get(i), chars.get(i + 1)) {
        (Some(':'), _) => i += 1,
        (Some(' '), Some(':')) => i += 2,
        _ => return None,
    }
    if i == chars.len() {
        return Some(i);
    }
    if chars[i] != ' ' {
        return None;
    }
    while chars.get(i) == Some(&' ') {
        i += 1;
    }
    Some(i)
}

/// Match the name part of a hyperlink target (`name:`, `` `name`: `` or
/// `_:` for anonymous). Returns the name (`None` if anonymous) and the byte
/// offset just past the colon and its trailing spaces.
fn match_target(text: &str) -> Option<(Option<String>, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let byte = |i: usize| -> usize { chars[..i].iter().map(|c| c.len_utf8()).sum() };
    if chars.first() == Some(&'_') {
        return target_tail(&chars, 1).map(|end| (None, byte(end)));
    }
    let quoted = chars.first() == Some(&'`');
    let start = usize::from(quoted);
    match chars.get(start) {
        None | Some(' ') | Some('`') => return None,
        _ => {}
    }
    for end in start + 1..=chars.len() {
        let last = chars[end - 1];
        if last == '\n' {
            break;
        }
        if matches!(last, ' ' | '\0') {
            continue;
        }
        let mut i = end;
        if quoted {
            if chars.get(i) != Some(&'`') {
                continue;
            }
            i += 1;
        }
        let before = chars[i - 1];
        if before == ':' && (i < 2 || chars[i - 2] != '\0') {
            continue;
        }
        if let Some(tail) = target_tail(&chars, i) {
            let name: String = chars[start..end].iter().collect();
            return Some((Some(name), byte(tail)));
        }
    }
    None
}

/// Match `name|` followed by spaces or end. Returns the name and the byte
/// offset past the spaces.
fn match_substitution(text: &str) -> Option<(String, usize)> {
    let chars: Vec<char> = text.chars().collect();
    if chars.first().is_none_or(|&c| c == ' ') {
        return None;
    }
    for end in 1..chars.len() {
        if matches!(chars[end - 1], ' ' | '\n' | '\0') || chars[end] != '|' {
            continue;
        }
        let mut i = end + 1;
        if i < chars.len() && chars[i] != ' ' {
            continue;
        }
        while chars.get(i) == Some(&' ') {
            i += 1;
        }
        let name: String = chars[..end].iter().collect();
        let offset = chars[..i].iter().map(|c| c.len_utf8()).sum();
        return Some((name, offset));
    }
    None
}

/// The reference name of an indirect target (`name_` or `` `phrase`_ ``).
fn is_reference(reference: &str) -> Option<String> {
    let normalized = whitespace_normalize_name(reference);
    if let Some(name) = normalized.strip_suffix('_')
        && is_simplename(name)
    {
        return Some(unescape(name));
    }
    let phrase = normalized.strip_prefix('`')?.strip_suffix("`_")?;
    let first = phrase.chars().next()?;
    let last = phrase.chars().last()?;
    if first == ' ' || matches!(last, ' ' | '\n' | '\0') {
        return None;
    }
    Some(unescape(phrase))
}

/// What the link block of a target points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TargetReference {
    /// A single reference (`name_`): the target is indirect.
    Refname(String),
    /// Anything else is a URI; escaped whitespace survives as spaces.
    Refuri(String),
}

/// Classify the escape-marked link block `lines`.
pub(crate) fn target_reference(lines: &[String]) -> TargetReference {
    if lines.last().is_some_and(|l| l.trim().ends_with('_')) {
        let reference = lines.iter().map(|l| l.trim()).collect::<Vec<_>>().join(" ");
        if let Some(refname) = is_reference(&reference) {
            return TargetReference::Refname(refname);
        }
    }
    let reference = split_escaped_whitespace(&lines.join(" "))
        .iter()
        .map(|part| unescape(part).split_whitespace().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    TargetReference::Refuri(reference)
}

pub(crate) fn char_offset(line: &str, byte_end: usize) -> usize {
    line[..byte_end].chars().count()
}

impl BlockParser<'_> {
    fn next_line_blank(&self) -> bool {
        self.frame
            .lines
            .peek(1)
            .is_none_or(|l| l.trim().is_empty())
    }

    pub(super) fn explicit_markup(&mut self, line: &str, _end: usize) -> Result<()> {
        let (nodes, blank_finish) = self.explicit_construct(line)?;
        self.append_all(nodes);
        self.frame.states.push(State::Explicit { blank_finish });
        Ok(())
    }

    pub(super) fn anonymous(&mut self, line: &str, end: usize) -> Result<()> {
        let (nodes, blank_finish) = self.anonymous_target(line, end)?;
        self.append_all(nodes);
        self.frame.states.push(State::Explicit { blank_finish });
        Ok(())
    }

    /// Consecutive explicit markup blocks after the first one.
    pub(super) fn explicit_state(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            self.frame.lines.advance(1);
            return Ok(());
        }
        let (nodes, blank_finish) = if marker_utils::explicit_markup(line).is_some() {
            self.explicit_construct(line)?
        } else if let Some(end) = marker_utils::anonymous_target(line) {
            self.anonymous_target(line, end)?
        } else {
            return self.end_state();
        };
        self.append_all(nodes);
        self.set_blank_finish(blank_finish);
        Ok(())
    }

    fn explicit_construct(&mut self, line: &str) -> Result<(Vec<NodeId>, bool)> {
        let start = self.frame.lines.pos();
        let attempt = if let Some(caps) = FOOTNOTE.captures(line) {
            let end = caps.get(0).map_or(line.len(), |m| m.end());
            Some(Ok(self.footnote(line, &caps[1], end)?))
        } else if let Some(caps) = CITATION.captures(line) {
            let end = caps.get(0).map_or(line.len(), |m| m.end());
            Some(Ok(self.citation(line, &caps[1], end)?))
        } else if let Some(m) = HYPERLINK_TARGET.captures(line).and_then(|c| c.get(1)) {
            Some(self.hyperlink_target(line, m.end())?)
        } else if let Some(m) = SUBSTITUTION_DEF.captures(line).and_then(|c| c.get(1)) {
            Some(self.substitution_def(line, m.end())?)
        } else if let Some(caps) = DIRECTIVE.captures(line) {
            let end = caps.get(0).map_or(line.len(), |m| m.end());
            Some(Ok(self.directive(&caps[1], end, None)?))
        } else {
            None
        };
        match attempt {
            Some(Ok(result)) => Ok(result),
            Some(Err(MarkupError(message))) => {
                self.frame.lines.set_pos(start);
                let lineno = self.frame.lines.lineno(start);
                let (mut nodes, blank_finish) = self.comment(line)?;
                let msg = self.doc.warning(message).line(lineno).emit()?;
                nodes.push(msg);
                Ok((nodes, blank_finish))
            }
            None => self.comment(line),
        }
    }

    fn comment(&mut self, line: &str) -> Result<(Vec<NodeId>, bool)> {
        let end = marker_utils::explicit_markup(line).unwrap_or(line.len());
        let lineno = self.frame.lines.current_lineno();
        let first = &line[end..];
        if self.next_line_blank() {
            if first.trim().is_empty() {
                self.frame.lines.advance(1);
                let comment = self.doc.new_element(Kind::Comment);
                self.doc.set_line(comment, lineno);
                return Ok((vec![comment], true));
            }
            if first.starts_with("end of inclusion from \"") {
                self.frame.lines.advance(1);
                self.include_log.pop();
                return Ok((Vec::new(), true));
            }
        }
        let indented = self
            .frame
            .lines
            .get_indented(IndentSpec::first_known(char_offset(line, end)));
        let mut block = indented.block;
        block.strip_trailing_blanks();
        let text = block.text();
        let comment = self.doc.new_text_element(Kind::Comment, &text, &text);
        self.doc.set_line(comment, lineno);
        Ok((vec![comment], indented.blank_finish))
    }

    fn footnote(&mut self, line: &str, label: &str, end: usize) -> Result<(Vec<NodeId>, bool)> {
        let lineno = self.frame.lines.current_lineno();
        let indented = self
            .frame
            .lines
            .get_indented(IndentSpec::first_known(char_offset(line, end)));
        let footnote = self.doc.new_element(Kind::Footnote);
        self.doc.set_rawsource(footnote, indented.block.text());
        self.doc.set_line(footnote, lineno);

        let normalized = fully_normalize_name(label);
        let name = if let Some(rest) = normalized.strip_prefix('#') {
            self.doc.set_attr(footnote, "auto", 1_i64);
            if !rest.is_empty() {
                self.doc.push_attr(footnote, "names", rest);
            }
            self.doc.note_autofootnote(footnote)?;
            rest.to_string()
        } else if normalized == "*" {
            self.doc.set_attr(footnote, "auto", "*");
            self.doc.note_symbol_footnote(footnote)?;
            String::new()
        } else {
            let label_node = self.doc.new_text_element(Kind::Label, "", label);
            self.doc.append(footnote, label_node);
            self.doc.push_attr(footnote, "names", normalized.as_str());
            self.doc.note_footnote(footnote)?;
            normalized.clone()
        };
        if name.is_empty() {
            self.doc.set_id(footnote, Some(footnote))?;
        } else {
            self.doc.note_explicit_target(footnote, Some(footnote))?;
        }

        if indented.block.is_empty() {
            let msg = self.doc.warning("Footnote content expected.").line(lineno).emit()?;
            self.doc.append(footnote, msg);
        } else {
            self.nested_parse(indented.block, footnote);
        }
        Ok((vec![footnote], indented.blank_finish))
    }

    fn citation(&mut self, line: &str, label: &str, end: usize) -> Result<(Vec<NodeId>, bool)> {
        let lineno = self.frame.lines.current_lineno();
        let indented = self
            .frame
            .lines
            .get_indented(IndentSpec::first_known(char_offset(line, end)));
        let citation = self.doc.new_element(Kind::Citation);
        self.doc.set_rawsource(citation, indented.block.text());
        self.doc.set_line(citation, lineno);
        let label_node = self.doc.new_text_element(Kind::Label, "", label);
        self.doc.append(citation, label_node);
        self.doc
            .push_attr(citation, "names", fully_normalize_name(label));
        self.doc.note_citation(citation);
        self.doc.note_explicit_target(citation, Some(citation))?;

        if indented.block.is_empty() {
            let msg = self.doc.warning("Citation content expected.").line(lineno).emit()?;
            self.doc.append(citation, msg);
        } else {
            self.nested_parse(indented.block, citation);
        }
        Ok((vec![citation], indented.blank_finish))
    }

    fn hyperlink_target(&mut self, line: &str, end: usize) -> Result<Construct> {
        let lineno = self.frame.lines.current_lineno();
        let indented = self.frame.lines.get_indented(
            IndentSpec::first_known(char_offset(line, end))
                .until_blank(true)
                .strip_indent(false),
        );
        let block_text = format!("{}{}", &line[..end], indented.block.text());
        let lines: Vec<String> = indented.block.lines.iter().map(|l| escape2null(l)).collect();
        let Some(first) = lines.first() else {
            return Ok(Err(MarkupError("malformed hyperlink target.".into())));
        };
        let mut escaped = first.clone();
        let mut index = 0;
        let (name, match_end) = loop {
            if let Some(found) = match_target(&escaped) {
                break found;
            }
            index += 1;
            match lines.get(index) {
                Some(next) => escaped.push_str(next),
                None => return Ok(Err(MarkupError("malformed hyperlink target.".into()))),
            }
        };
        let mut lines = lines[index..].to_vec();
        let remaining = escaped[match_end..].chars().count();
        let count = lines[0].chars().count();
        let rest: String = lines[0].chars().skip(count.saturating_sub(remaining)).collect();
        lines[0] = rest.trim().to_string();
        let target = self.make_target(&lines, &block_text, lineno, name.as_deref())?;
        Ok(Ok((vec![target], indented.blank_finish)))
    }

    fn anonymous_target(&mut self, line: &str, end: usize) -> Result<(Vec<NodeId>, bool)> {
        let lineno = self.frame.lines.current_lineno();
        let indented = self
            .frame
            .lines
            .get_indented(IndentSpec::first_known(char_offset(line, end)).until_blank(true));
        let block_text = format!("{}{}", &line[..end], indented.block.text());
        let lines: Vec<String> = indented.block.lines.iter().map(|l| escape2null(l)).collect();
        let target = self.make_target(&lines, &block_text, lineno, None)?;
        Ok((vec![target], indented.blank_finish))
    }

    /// Build a target from the link block: indirect when it is a single
    /// reference (`name_`), external otherwise.
    pub(crate) fn make_target(
        &mut self,
        lines: &[String],
        block_text: &str,
        lineno: usize,
        name: Option<&str>,
    ) -> Result<NodeId> {
        let target = self.doc.new_element(Kind::Target);
        self.doc.set_rawsource(target, block_text);
        self.doc.set_line(target, lineno);

        match target_reference(lines) {
            TargetReference::Refname(refname) => {
                self.doc
                    .set_attr(target, "refname", fully_normalize_name(&refname));
                self.add_target(target, name, "")?;
                self.doc.note_indirect_target(target);
            }
            TargetReference::Refuri(reference) => self.add_target(target, name, &reference)?,
        }
        Ok(target)
    }

    fn add_target(&mut self, target: NodeId, name: Option<&str>, refuri: &str) -> Result<()> {
        match name.filter(|n| !n.is_empty()) {
            Some(name) => {
                let name = fully_normalize_name(&unescape(name));
                self.doc.push_attr(target, "names", name);
                if !refuri.is_empty() {
                    self.doc.set_attr(target, "refuri", adjust_uri(refuri));
                    self.doc.note_external_target(target);
                }
                let parent = self.frame.body_parent();
                self.doc.note_explicit_target(target, Some(parent))?;
            }
            None => {
                if !refuri.is_empty() {
                    self.doc.set_attr(target, "refuri", refuri);
                    self.doc.note_external_target(target);
                }
                self.doc.set_attr(target, "anonymous", 1_i64);
                self.doc.note_anonymous_target(target)?;
            }
        }
        Ok(())
    }

    fn substitution_def(&mut self, line: &str, end: usize) -> Result<Construct> {
        let lineno = self.frame.lines.current_lineno();
        let indented = self
            .frame
            .lines
            .get_indented(IndentSpec::first_known(char_offset(line, end)).strip_indent(false));
        let block_text = format!("{}{}", &line[..end], indented.block.text());
        let block = indented.block;
        let Some(first) = block.lines.first() else {
            return Ok(Err(MarkupError("malformed substitution definition.".into())));
        };
        let mut escaped = escape2null(first.trim_end());
        let mut index = 0;
        let (name, match_end) = loop {
            if let Some(found) = match_substitution(&escaped) {
                break found;
            }
            index += 1;
            match block.lines.get(index) {
                Some(next) => {
                    escaped.push(' ');
                    escaped.push_str(&escape2null(next.trim()));
                }
                None => {
                    return Ok(Err(MarkupError(
                        "malformed substitution definition.".into(),
                    )));
                }
            }
        };
        let mut block = block.slice(index, block.len());
        let remaining = escaped[match_end..].chars().count();
        let first = block.lines[0].trim().to_string();
        let count = first.chars().count();
        block.lines[0] = first.chars().skip(count.saturating_sub(remaining)).collect();
        if block.lines[0].is_empty() {
            block.trim_start();
        }
        block.strip_trailing_blanks();

        let name = unescape(&name);
        if block.is_empty() {
            let msg = self
                .doc
                .warning(format!("Substitution definition \"{name}\" missing contents."))
                .literal(block_text.as_str())
                .line(lineno)
                .emit()?;
            return Ok(Ok((vec![msg], indented.blank_finish)));
        }
        block.lines[0] = block.lines[0].trim().to_string();

        let node = self.doc.new_element(Kind::SubstitutionDefinition);
        self.doc.set_rawsource(node, block_text.as_str());
        self.doc.set_line(node, lineno);
        let normalized = whitespace_normalize_name(&name);
        self.doc.push_attr(node, "names", normalized.as_str());
        let hook = SubstitutionHook {
            node,
            name,
            block_text,
            lineno,
            parent: self.frame.body_parent(),
        };
        self.queue(
            Frame::new(block, node)
                .with_state(State::SubstitutionDef { name: normalized })
                .with_hook(Hook::SubstitutionDefinition(hook)),
        );
        Ok(Ok((Vec::new(), indented.blank_finish)))
    }

    /// The body of a substitution definition: one directive, or nothing.
    pub(super) fn substitution_def_state(&mut self, name: &str, line: &str) -> Result<()> {
        if let Some(caps) = EMBEDDED_DIRECTIVE.captures(line) {
            let end = caps.get(0).map_or(line.len(), |m| m.end());
            let (nodes, _) = self.directive(&caps[1], end, Some(name.to_string()))?;
            let parent = self.frame.parent;
            self.doc.extend(parent, nodes);
        }
        let len = self.frame.lines.len();
        self.frame.lines.set_pos(len);
        Ok(())
    }

    /// Keep inline content in the definition, move everything else out,
    /// then validate and register it.
    pub(super) fn finish_substitution_def(&mut self, hook: SubstitutionHook) -> Result<()> {
        let SubstitutionHook {
            node,
            name,
            block_text,
            lineno,
            parent,
        } = hook;
        let children = self.doc.take_children(node);
        let mut inline = Vec::new();
        for child in children {
            if self.doc.is_text(child) || self.doc.kind(child).is_some_and(|k| k.is_inline()) {
                inline.push(child);
            } else {
                self.doc.append(parent, child);
            }
        }
        self.doc.extend(node, inline);

        for element in self.doc.traverse(node) {
            let Some(kind) = self.doc.kind(element) else {
                continue;
            };
            let illegal = !self.doc.list(element, "ids").is_empty()
                || (kind == Kind::Reference && self.doc.has_attr(element, "anonymous"))
                || (kind == Kind::FootnoteReference && self.doc.has_attr(element, "auto"));
            if illegal {
                let pformat = crate::writers::pseudoxml::pformat(self.doc, element);
                let tree = self.literal(pformat.trim_end());
                let source = self.literal(&block_text);
                let msg = self
                    .doc
                    .error(format!(
                        "Substitution definition contains illegal element <{}>:",
                        kind.tag()
                    ))
                    .child(tree)
                    .child(source)
                    .line(lineno)
                    .emit()?;
                self.doc.append(parent, msg);
                return Ok(());
            }
        }

        if self.doc.children(node).is_empty() {
            let msg = self
                .doc
                .warning(format!("Substitution definition \"{name}\" empty or invalid."))
                .literal(block_text)
                .line(lineno)
                .emit()?;
            self.doc.append(parent, msg);
            return Ok(());
        }
        self.doc.note_substitution_def(node, &name, Some(parent))?;
        self.doc.append(parent, node);
        Ok(())
    }
}
