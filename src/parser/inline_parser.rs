//! Inline markup: emphasis, literals, interpreted text, references,
//! targets, footnote and substitution references, standalone URIs.
//!
//! Parsing works on escape-marked text (backslash escapes turned into a NUL
//! marker plus the character). The leftmost start-string is found, its
//! end-string is searched for, and the text before it is checked for
//! standalone URIs and PEP/RFC references. Start-strings without an
//! end-string become `problematic` nodes linked to a warning.

mod punctuation;
mod scan;
mod schemes;

use std::collections::HashMap;

use scan::{Before, Initial, Rules, StartKind, UriMatch};

use super::roles::{Roles, format_number};
use crate::config::Settings;
use crate::error::Result;
use crate::nodes::{Document, Kind, NodeId, fully_normalize_name, whitespace_normalize_name};
use crate::utils::{escape2null, restore_backslashes, split_escaped_whitespace, unescape};

/// Outcome of one construct: the text before it (`..before`), its nodes,
/// and where parsing continues.
struct Step {
    before: usize,
    nodes: Vec<NodeId>,
    rest: usize,
    messages: Vec<NodeId>,
}

impl Step {
    /// Not markup after all; `0..at` is plain text.
    fn plain(at: usize) -> Self {
        Self {
            before: at,
            nodes: Vec::new(),
            rest: at,
            messages: Vec::new(),
        }
    }
}

fn string(chars: &[char]) -> String {
    chars.iter().collect()
}

/// A `problematic` node for `text`, cross-linked with the message `msg`.
pub(crate) fn problematic(
    doc: &mut Document,
    parent: NodeId,
    text: &str,
    rawsource: &str,
    msg: NodeId,
) -> Result<NodeId> {
    let msgid = doc.set_id(msg, Some(parent))?;
    let prb = doc.new_text_element(Kind::Problematic, rawsource, text);
    doc.set_attr(prb, "refid", msgid);
    let prbid = doc.set_id(prb, None)?;
    doc.push_attr(msg, "backrefs", prbid);
    Ok(prb)
}

/// Prefix e-mail addresses with `mailto:`.
pub(crate) fn adjust_uri(uri: &str) -> String {
    let chars: Vec<char> = uri.chars().collect();
    if scan::is_email(&chars) {
        format!("mailto:{uri}")
    } else {
        uri.to_string()
    }
}

/// Embedded `<uri>` or `<alias_>` at the end of phrase reference text:
/// returns the start of the link (leading whitespace included) and the
/// index of its `<`.
fn embedded_link(escaped: &[char]) -> Option<(usize, usize)> {
    let n = escaped.len();
    if n < 3 || escaped[n - 1] != '>' {
        return None;
    }
    let mut k = n - 1;
    let lt = loop {
        if k == 0 {
            return None;
        }
        k -= 1;
        let c = escaped[k];
        if c != '<' && c != '>' {
            continue;
        }
        if k > 0 && escaped[k - 1] == '\0' {
            k -= 1;
            continue;
        }
        if c == '>' {
            return None;
        }
        break k;
    };
    if lt + 2 >= n || escaped[lt + 1].is_whitespace() {
        return None;
    }
    let last = escaped[n - 2];
    if last.is_whitespace() || last == '\0' {
        return None;
    }
    if lt == 0 {
        return Some((0, 0));
    }
    let mut start = lt;
    while start > 0 && matches!(escaped[start - 1], ' ' | '\n') {
        start -= 1;
    }
    (start < lt).then_some((start, lt))
}

pub(crate) struct Inliner {
    rules: Rules,
    pub(crate) roles: Roles,
    trim_footnote_reference_space: bool,
    pep_references: bool,
    rfc_references: bool,
    /// Element that receives messages about duplicate ids.
    parent: NodeId,
    /// Offset of the slice handed to the current construct.
    offset: usize,
    /// End-string searches that found no candidate, by the earliest
    /// position they started from. Later searches for the same end-string
    /// cannot succeed either.
    exhausted: HashMap<&'static str, usize>,
}

impl Inliner {
    pub(crate) fn new(settings: &Settings) -> Self {
        Self {
            rules: Rules {
                character_level: settings.character_level_inline_markup,
            },
            roles: Roles::default(),
            trim_footnote_reference_space: settings.trim_footnote_reference_space,
            pep_references: settings.pep_references,
            rfc_references: settings.rfc_references,
            parent: NodeId(0),
            offset: 0,
            exhausted: HashMap::new(),
        }
    }

    /// Parse `text` into inline nodes. Returns the nodes and the system
    /// messages the caller places after the enclosing element.
    pub(crate) fn parse(
        &mut self,
        doc: &mut Document,
        text: &str,
        lineno: usize,
        parent: NodeId,
    ) -> Result<(Vec<NodeId>, Vec<NodeId>)> {
        self.parent = parent;
        self.exhausted.clear();
        let chars: Vec<char> = escape2null(text).chars().collect();
        let mut cursor = 0;
        let mut processed = Vec::new();
        let mut unprocessed: Vec<char> = Vec::new();
        let mut messages = Vec::new();
        while cursor < chars.len() {
            let remaining = &chars[cursor..];
            let Some(initial) = self.rules.initial(remaining) else {
                break;
            };
            log::trace!("Inline construct {initial:?} at line {lineno}");
            self.offset = cursor;
            let step = self.dispatch(doc, remaining, initial, lineno)?;
            unprocessed.extend_from_slice(&remaining[..step.before]);
            messages.extend(step.messages);
            if !step.nodes.is_empty() {
                let implicit = self.implicit_inline(doc, &unprocessed)?;
                processed.extend(implicit);
                processed.extend(step.nodes);
                unprocessed.clear();
            }
            cursor += step.rest;
        }
        unprocessed.extend_from_slice(&chars[cursor.min(chars.len())..]);
        let implicit = self.implicit_inline(doc, &unprocessed)?;
        processed.extend(implicit);
        Ok((processed, messages))
    }

    fn dispatch(
        &mut self,
        doc: &mut Document,
        chars: &[char],
        initial: Initial,
        lineno: usize,
    ) -> Result<Step> {
        match initial {
            Initial::Start { kind, start, end } => match kind {
                StartKind::Target => self.inline_internal_target(doc, chars, start, end, lineno),
                StartKind::SubstitutionReference => {
                    self.substitution_reference(doc, chars, start, end, lineno)
                }
                _ => Ok(self.inline_obj(doc, chars, kind, start, end, lineno)?.0),
            },
            Initial::Reference {
                start,
                name_end,
                end,
            } => self.reference(doc, chars, start, name_end, end),
            Initial::Footnote {
                start,
                label_end,
                end,
                citation,
            } => self.footnote_reference(doc, chars, start, label_end, end, citation),
            Initial::Backquote { start, role, tick } => {
                self.interpreted_or_phrase_ref(doc, chars, start, role, tick, lineno)
            }
        }
    }

    /// Run an end-string search from `from`, skipping it when an earlier
    /// search for the same end-string found no candidate at all. A search
    /// whose only miss was an empty content right at `from` is not
    /// remembered.
    fn search_end<T>(
        &mut self,
        key: &'static str,
        chars: &[char],
        from: usize,
        delim: &str,
        search: impl FnOnce(&Rules) -> Option<T>,
    ) -> Option<T> {
        let absolute = self.offset + from;
        if self.exhausted.get(key).is_some_and(|&p| absolute >= p) {
            return None;
        }
        let found = search(&self.rules);
        if found.is_none() && chars.get(from) != delim.chars().next().as_ref() {
            let earliest = self.exhausted.entry(key).or_insert(absolute);
            *earliest = (*earliest).min(absolute);
        }
        found
    }

    /// Is the start-string at `start..end` enclosed in matching quotes or
    /// brackets (or at the very end of the text)?
    fn quoted_start(chars: &[char], start: usize, end: usize) -> bool {
        if start == 0 {
            return false;
        }
        match chars.get(end) {
            None => true,
            Some(&after) => punctuation::match_chars(chars[start - 1], after),
        }
    }

    fn kind_of(kind: StartKind) -> Kind {
        match kind {
            StartKind::Strong => Kind::Strong,
            StartKind::Emphasis => Kind::Emphasis,
            StartKind::Literal => Kind::Literal,
            StartKind::Target => Kind::Target,
            StartKind::SubstitutionReference => Kind::SubstitutionReference,
        }
    }

    /// A simple start/end-string construct. Also returns the end-string
    /// that was matched.
    fn inline_obj(
        &mut self,
        doc: &mut Document,
        chars: &[char],
        kind: StartKind,
        start: usize,
        end: usize,
        lineno: usize,
    ) -> Result<(Step, String)> {
        if Self::quoted_start(chars, start, end) {
            return Ok((Step::plain(end), String::new()));
        }
        let (key, delim, before) = match kind {
            StartKind::Strong => ("**", "**", Before::WhitespaceOrEscape),
            StartKind::Emphasis => ("*", "*", Before::WhitespaceOrEscape),
            StartKind::Literal => ("``", "``", Before::Whitespace),
            StartKind::Target => ("_`", "`", Before::WhitespaceOrEscape),
            StartKind::SubstitutionReference => ("|", "|", Before::WhitespaceOrEscape),
        };
        let found = self.search_end(key, chars, end, delim, |rules| match kind {
            StartKind::SubstitutionReference => rules.find_substitution_end(chars, end),
            _ => rules.find_end(chars, end, delim, before),
        });
        if let Some((close, textend)) = found {
            let inner = string(&chars[end..close]);
            let text = if kind == StartKind::Literal {
                restore_backslashes(&inner)
            } else {
                unescape(&inner)
            };
            let rawsource = restore_backslashes(&string(&chars[start..textend]));
            let node = doc.new_text_element(Self::kind_of(kind), &rawsource, &text);
            let step = Step {
                before: start,
                nodes: vec![node],
                rest: textend,
                messages: Vec::new(),
            };
            return Ok((step, string(&chars[close..textend])));
        }
        let msg = doc
            .warning(format!(
                "Inline {} start-string without end-string.",
                kind.name()
            ))
            .line(lineno)
            .category("inline")
            .emit()?;
        let text = restore_backslashes(&string(&chars[start..end]));
        let prb = problematic(doc, self.parent, &text, &text, msg)?;
        let step = Step {
            before: start,
            nodes: vec![prb],
            rest: end,
            messages: vec![msg],
        };
        Ok((step, String::new()))
    }

    fn inline_internal_target(
        &mut self,
        doc: &mut Document,
        chars: &[char],
        start: usize,
        end: usize,
        lineno: usize,
    ) -> Result<Step> {
        let (step, _) = self.inline_obj(doc, chars, StartKind::Target, start, end, lineno)?;
        if let [target] = step.nodes[..]
            && doc.is(target, Kind::Target)
        {
            let name = fully_normalize_name(&doc.astext(target));
            doc.push_attr(target, "names", name);
            doc.note_explicit_target(target, Some(self.parent))?;
        }
        Ok(step)
    }

    fn substitution_reference(
        &mut self,
        doc: &mut Document,
        chars: &[char],
        start: usize,
        end: usize,
        lineno: usize,
    ) -> Result<Step> {
        let (mut step, endstring) =
            self.inline_obj(doc, chars, StartKind::SubstitutionReference, start, end, lineno)?;
        let [subref] = step.nodes[..] else {
            return Ok(step);
        };
        if !doc.is(subref, Kind::SubstitutionReference) {
            return Ok(step);
        }
        let subref_text = doc.astext(subref);
        doc.note_substitution_ref(subref, &subref_text);
        if endstring.ends_with('_') {
            let reference = doc.new_element(Kind::Reference);
            doc.set_rawsource(reference, format!("|{subref_text}{endstring}"));
            if endstring.ends_with("__") {
                doc.set_attr(reference, "anonymous", 1_i64);
                doc.note_anonymous_ref(reference);
            } else {
                doc.set_attr(reference, "refname", fully_normalize_name(&subref_text));
                doc.note_refname(reference);
            }
            doc.append(reference, subref);
            step.nodes = vec![reference];
        }
        Ok(step)
    }

    fn interpreted_or_phrase_ref(
        &mut self,
        doc: &mut Document,
        chars: &[char],
        rolestart: usize,
        prefix: Option<(usize, usize)>,
        tick: usize,
        lineno: usize,
    ) -> Result<Step> {
        let matchend = tick + 1;
        let mut role = prefix.map(|(a, b)| string(&chars[a..b]));
        let mut position = "prefix";
        if role.is_none() && Self::quoted_start(chars, rolestart, matchend) {
            return Ok(Step::plain(matchend));
        }
        let found = self.search_end("`", chars, matchend, "`", |rules| {
            rules.find_interpreted_end(chars, matchend)
        });
        let Some(end) = found else {
            let msg = doc
                .warning("Inline interpreted text or phrase reference start-string without end-string.")
                .line(lineno)
                .category("inline")
                .emit()?;
            let text = restore_backslashes(&string(&chars[tick..matchend]));
            let prb = problematic(doc, self.parent, &text, &text, msg)?;
            return Ok(Step {
                before: tick,
                nodes: vec![prb],
                rest: matchend,
                messages: vec![msg],
            });
        };
        let textend = end.end;
        if let Some((a, b)) = end.role {
            if role.is_some() {
                return self.role_error(
                    doc,
                    chars,
                    rolestart,
                    textend,
                    "Multiple roles in interpreted text (both prefix and suffix present; only one allowed).".to_string(),
                    lineno,
                );
            }
            role = Some(string(&chars[a..b]));
            position = "suffix";
        }
        let escaped = &chars[matchend..end.tick];
        if end.refend > 0 {
            if role.is_some() {
                return self.role_error(
                    doc,
                    chars,
                    rolestart,
                    textend,
                    format!("Mismatch: both interpreted text role {position} and reference suffix."),
                    lineno,
                );
            }
            let rawsource = restore_backslashes(&string(&chars[tick..textend]));
            let (nodes, messages) = self.phrase_ref(doc, &rawsource, escaped)?;
            return Ok(Step {
                before: tick,
                nodes,
                rest: textend,
                messages,
            });
        }
        let rawsource = restore_backslashes(&string(&chars[rolestart..textend]));
        let (nodes, messages) = self.interpreted(
            doc,
            &rawsource,
            &string(escaped),
            role.as_deref().unwrap_or(""),
            lineno,
        )?;
        Ok(Step {
            before: rolestart,
            nodes,
            rest: textend,
            messages,
        })
    }

    fn role_error(
        &mut self,
        doc: &mut Document,
        chars: &[char],
        start: usize,
        end: usize,
        message: String,
        lineno: usize,
    ) -> Result<Step> {
        let msg = doc.warning(message).line(lineno).category("inline").emit()?;
        let text = restore_backslashes(&string(&chars[start..end]));
        let prb = problematic(doc, self.parent, &text, &text, msg)?;
        Ok(Step {
            before: start,
            nodes: vec![prb],
            rest: end,
            messages: vec![msg],
        })
    }

    /// `` `phrase`_ `` and `` `phrase`__ ``, with an optional embedded
    /// `<uri>` or `<alias_>`.
    fn phrase_ref(
        &mut self,
        doc: &mut Document,
        rawsource: &str,
        escaped: &[char],
    ) -> Result<(Vec<NodeId>, Vec<NodeId>)> {
        enum Alias {
            Name(String),
            Uri(String),
        }
        let mut text = string(escaped);
        let mut alias = None;
        let mut target = None;
        if let Some((start, lt)) = embedded_link(escaped) {
            text = string(&escaped[..start]);
            let aliastext = &escaped[lt + 1..escaped.len() - 1];
            let rawaliastext = restore_backslashes(&string(aliastext));
            let underscore_escaped = rawaliastext.ends_with("\\_");
            let node = doc.new_element(Kind::Target);
            doc.set_rawsource(node, restore_backslashes(&string(&escaped[start..])));
            let resolved = if aliastext.last() == Some(&'_')
                && !underscore_escaped
                && self.rules.uri_prefix(aliastext).is_none()
            {
                let name = fully_normalize_name(&unescape(&string(&aliastext[..aliastext.len() - 1])));
                doc.set_attr(node, "refname", name.clone());
                Alias::Name(name)
            } else {
                let parts = split_escaped_whitespace(&string(aliastext));
                let joined = parts
                    .iter()
                    .map(|part| part.split_whitespace().collect::<String>())
                    .collect::<Vec<_>>()
                    .join(" ");
                let uri = adjust_uri(&unescape(&joined));
                doc.set_attr(node, "refuri", uri.clone());
                doc.referenced.insert(node);
                Alias::Uri(uri)
            };
            if text.is_empty() {
                text = match &resolved {
                    Alias::Name(name) | Alias::Uri(name) => name.clone(),
                };
            }
            alias = Some(resolved);
            target = Some(node);
        }
        let unescaped = unescape(&text);
        let refname = fully_normalize_name(&unescaped);
        let reference = doc.new_text_element(Kind::Reference, rawsource, &unescaped);
        doc.set_attr(reference, "name", whitespace_normalize_name(&unescaped));
        let mut nodes = vec![reference];

        if rawsource.ends_with("__") {
            match alias {
                Some(Alias::Name(name)) => {
                    doc.set_attr(reference, "refname", name);
                    doc.note_refname(reference);
                }
                Some(Alias::Uri(uri)) => doc.set_attr(reference, "refuri", uri),
                None => {
                    doc.set_attr(reference, "anonymous", 1_i64);
                    doc.note_anonymous_ref(reference);
                }
            }
        } else if let (Some(target), Some(alias)) = (target, alias) {
            doc.push_attr(target, "names", refname);
            match alias {
                Alias::Name(name) => {
                    doc.set_attr(reference, "refname", name);
                    doc.note_indirect_target(target);
                    doc.note_refname(reference);
                }
                Alias::Uri(uri) => {
                    doc.set_attr(reference, "refuri", uri);
                    doc.note_explicit_target(target, Some(self.parent))?;
                }
            }
            nodes.push(target);
        } else {
            doc.set_attr(reference, "refname", refname);
            doc.note_refname(reference);
        }
        Ok((nodes, Vec::new()))
    }

    fn interpreted(
        &mut self,
        doc: &mut Document,
        rawsource: &str,
        text: &str,
        role: &str,
        lineno: usize,
    ) -> Result<(Vec<NodeId>, Vec<NodeId>)> {
        let (found, mut messages) = self.roles.lookup(doc, role, lineno)?;
        match found {
            Some(found) => {
                let (nodes, more) = found.apply(doc, self.parent, role, rawsource, text, lineno)?;
                messages.extend(more);
                Ok((nodes, messages))
            }
            None => {
                let msg = doc
                    .error(format!("Unknown interpreted text role \"{role}\"."))
                    .line(lineno)
                    .category("inline")
                    .emit()?;
                let prb = problematic(doc, self.parent, rawsource, rawsource, msg)?;
                messages.push(msg);
                Ok((vec![prb], messages))
            }
        }
    }

    /// `name_` and `name__`.
    fn reference(
        &mut self,
        doc: &mut Document,
        chars: &[char],
        start: usize,
        name_end: usize,
        end: usize,
    ) -> Result<Step> {
        let name = string(&chars[start..name_end]);
        let rawsource = string(&chars[start..end]);
        let reference = doc.new_text_element(Kind::Reference, &rawsource, &name);
        doc.set_attr(reference, "name", whitespace_normalize_name(&name));
        if end - name_end == 2 {
            doc.set_attr(reference, "anonymous", 1_i64);
            doc.note_anonymous_ref(reference);
        } else {
            doc.set_attr(reference, "refname", fully_normalize_name(&name));
            doc.note_refname(reference);
        }
        Ok(Step {
            before: start,
            nodes: vec![reference],
            rest: end,
            messages: Vec::new(),
        })
    }

    fn footnote_reference(
        &mut self,
        doc: &mut Document,
        chars: &[char],
        start: usize,
        label_end: usize,
        end: usize,
        citation: bool,
    ) -> Result<Step> {
        let label = string(&chars[start + 1..label_end]);
        let refname = fully_normalize_name(&label);
        let rawsource = format!("[{label}]_");
        let mut before = start;
        let node = if citation {
            let node = doc.new_text_element(Kind::CitationReference, &rawsource, &label);
            doc.set_attr(node, "refname", refname);
            doc.note_citation_ref(node)?;
            node
        } else {
            let node = doc.new_element(Kind::FootnoteReference);
            doc.set_rawsource(node, rawsource);
            if let Some(name) = refname.strip_prefix('#') {
                doc.set_attr(node, "auto", 1_i64);
                doc.note_autofootnote_ref(node)?;
                if !name.is_empty() {
                    doc.set_attr(node, "refname", name);
                    doc.note_footnote_ref(node)?;
                }
            } else if refname == "*" {
                doc.set_attr(node, "auto", "*");
                doc.note_symbol_footnote_ref(node)?;
            } else {
                let text = doc.new_text(label);
                doc.append(node, text);
                doc.set_attr(node, "refname", refname);
                doc.note_footnote_ref(node)?;
            }
            if self.trim_footnote_reference_space {
                while before > 0 && chars[before - 1].is_whitespace() {
                    before -= 1;
                }
            }
            node
        };
        Ok(Step {
            before,
            nodes: vec![node],
            rest: end,
            messages: Vec::new(),
        })
    }

    /// Plain text with standalone URIs and PEP/RFC references linked.
    fn implicit_inline(&mut self, doc: &mut Document, chars: &[char]) -> Result<Vec<NodeId>> {
        if chars.is_empty() {
            return Ok(Vec::new());
        }
        let mut from = 0;
        while let Some(m) = self.rules.search_uri(chars, from) {
            if let Some(node) = self.standalone_uri(doc, chars, m) {
                return self.around(doc, chars, m.start, m.end, node);
            }
            from = m.start + 1;
        }
        if self.pep_references
            && let Some(m) = self.rules.search_pep(chars)
        {
            let number = unescape(&string(&chars[m.number.0..m.number.1]));
            if let Ok(pepnum) = number.parse::<u32>() {
                let refuri = format!(
                    "{}{}",
                    doc.settings.pep_base_url,
                    format_number(&doc.settings.pep_file_url_template, pepnum)
                );
                let node = self.implicit_reference(doc, &chars[m.start..m.end], refuri);
                return self.around(doc, chars, m.start, m.end, node);
            }
        }
        if self.rfc_references
            && let Some(m) = self.rules.search_rfc(chars)
        {
            let number = unescape(&string(&chars[m.number.0..m.number.1]));
            if let Ok(rfcnum) = number.parse::<u32>() {
                let refuri = format!("{}rfc{rfcnum}.html", doc.settings.rfc_base_url);
                let node = self.implicit_reference(doc, &chars[m.start..m.end], refuri);
                return self.around(doc, chars, m.start, m.end, node);
            }
        }
        let text = unescape(&string(chars));
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![doc.new_text(text)])
    }

    /// `node` with the implicit markup of the text on both sides.
    fn around(
        &mut self,
        doc: &mut Document,
        chars: &[char],
        start: usize,
        end: usize,
        node: NodeId,
    ) -> Result<Vec<NodeId>> {
        let mut nodes = self.implicit_inline(doc, &chars[..start])?;
        nodes.push(node);
        nodes.extend(self.implicit_inline(doc, &chars[end..])?);
        Ok(nodes)
    }

    fn implicit_reference(&self, doc: &mut Document, text: &[char], refuri: String) -> NodeId {
        let text = string(text);
        let node = doc.new_text_element(Kind::Reference, &restore_backslashes(&text), &unescape(&text));
        doc.set_attr(node, "refuri", refuri);
        node
    }

    /// A reference for a URI with a known scheme, or an e-mail address.
    fn standalone_uri(&self, doc: &mut Document, chars: &[char], m: UriMatch) -> Option<NodeId> {
        if let Some((a, b)) = m.scheme {
            let scheme = string(&chars[a..b]).to_lowercase();
            if !schemes::is_known(&scheme) {
                log::trace!("Not linking URI with unknown scheme {scheme:?}");
                return None;
            }
        }
        let text = &chars[m.start..m.end];
        let mut refuri = unescape(&string(text));
        if m.scheme.is_none() {
            refuri.insert_str(0, "mailto:");
        }
        Some(self.implicit_reference(doc, text, refuri))
    }
}

#[cfg(test)]
mod tests;
