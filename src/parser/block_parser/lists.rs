//! Bullet, enumerated, field and option lists.

use super::marker_utils::{self, EnumMatch};
use super::{BlockParser, State};
use crate::error::Result;
use crate::nodes::{Kind, NodeId};
use crate::parser::line_source::IndentSpec;
use crate::utils::{from_roman, to_roman};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnumFormat {
    /// `(1)`
    Parens,
    /// `1)`
    Rparen,
    /// `1.`
    Period,
}

impl EnumFormat {
    pub(crate) fn prefix(self) -> &'static str {
        match self {
            EnumFormat::Parens => "(",
            _ => "",
        }
    }

    pub(crate) fn suffix(self) -> &'static str {
        match self {
            EnumFormat::Period => ".",
            _ => ")",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sequence {
    Arabic,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl Sequence {
    const ALL: [Sequence; 5] = [
        Sequence::Arabic,
        Sequence::LowerAlpha,
        Sequence::UpperAlpha,
        Sequence::LowerRoman,
        Sequence::UpperRoman,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Sequence::Arabic => "arabic",
            Sequence::LowerAlpha => "loweralpha",
            Sequence::UpperAlpha => "upperalpha",
            Sequence::LowerRoman => "lowerroman",
            Sequence::UpperRoman => "upperroman",
        }
    }

    fn matches(self, text: &str) -> bool {
        let mut chars = text.chars();
        match self {
            Sequence::Arabic => !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()),
            Sequence::LowerAlpha => {
                chars.next().is_some_and(|c| c.is_ascii_lowercase()) && chars.next().is_none()
            }
            Sequence::UpperAlpha => {
                chars.next().is_some_and(|c| c.is_ascii_uppercase()) && chars.next().is_none()
            }
            Sequence::LowerRoman => !text.is_empty() && text.chars().all(|c| "ivxlcdm".contains(c)),
            Sequence::UpperRoman => !text.is_empty() && text.chars().all(|c| "IVXLCDM".contains(c)),
        }
    }

    fn ordinal(self, text: &str) -> Option<usize> {
        match self {
            Sequence::Arabic => text.parse().ok(),
            Sequence::LowerAlpha => text.bytes().next().map(|b| usize::from(b - b'a') + 1),
            Sequence::UpperAlpha => text.bytes().next().map(|b| usize::from(b - b'A') + 1),
            Sequence::LowerRoman | Sequence::UpperRoman => from_roman(&text.to_ascii_uppercase()),
        }
    }

    fn enumerator(self, ordinal: usize) -> Option<String> {
        match self {
            Sequence::Arabic => Some(ordinal.to_string()),
            Sequence::LowerAlpha | Sequence::UpperAlpha => {
                if ordinal == 0 || ordinal > 26 {
                    return None;
                }
                let base = if self == Sequence::LowerAlpha { b'a' } else { b'A' };
                Some(char::from(base + (ordinal - 1) as u8).to_string())
            }
            Sequence::LowerRoman => to_roman(ordinal).map(|r| r.to_ascii_lowercase()),
            Sequence::UpperRoman => to_roman(ordinal),
        }
    }

    fn is_roman(self) -> bool {
        matches!(self, Sequence::LowerRoman | Sequence::UpperRoman)
    }

    fn roman_counterpart(self) -> Sequence {
        match self {
            Sequence::UpperAlpha | Sequence::UpperRoman => Sequence::UpperRoman,
            _ => Sequence::LowerRoman,
        }
    }
}

/// A parsed enumerator: `None` sequence means auto-numbered (`#`).
#[derive(Debug, Clone, Copy)]
struct Parsed {
    sequence: Option<Sequence>,
    ordinal: Option<usize>,
}

fn parse_enumerator(text: &str, expected: Option<Sequence>) -> Option<Parsed> {
    if text == "#" {
        return Some(Parsed {
            sequence: None,
            ordinal: Some(1),
        });
    }
    let sequence = match expected {
        Some(seq) if seq.matches(text) => seq,
        _ if text == "i" => Sequence::LowerRoman,
        _ if text == "I" => Sequence::UpperRoman,
        _ => Sequence::ALL.into_iter().find(|s| s.matches(text))?,
    };
    Some(Parsed {
        sequence: Some(sequence),
        ordinal: sequence.ordinal(text),
    })
}

#[derive(Debug, Clone)]
pub(crate) struct EnumState {
    pub(crate) list: NodeId,
    pub(crate) format: EnumFormat,
    pub(crate) sequence: Sequence,
    pub(crate) last_ordinal: usize,
    pub(crate) auto: bool,
    pub(crate) blank_finish: bool,
    first_text: String,
    items: usize,
}

fn char_offset(line: &str, byte_end: usize) -> usize {
    line[..byte_end].chars().count()
}

impl BlockParser<'_> {
    /// Consume one list item starting at the current line; the marker ends
    /// at byte `end`.
    fn list_item(&mut self, line: &str, end: usize) -> Result<(NodeId, bool)> {
        let lineno = self.frame.lines.current_lineno();
        let indent = char_offset(line, end);
        let indented = if line[end..].is_empty() {
            self.frame.lines.get_indented(IndentSpec::first_known(indent))
        } else {
            self.frame.lines.get_indented(IndentSpec::known(indent))
        };
        let item = self.doc.new_element(Kind::ListItem);
        self.doc.set_rawsource(item, indented.block.text());
        self.doc.set_line(item, lineno);
        if !indented.block.is_empty() {
            self.nested_parse(indented.block, item);
        }
        Ok((item, indented.blank_finish))
    }

    pub(super) fn bullet(&mut self, line: &str, end: usize) -> Result<()> {
        let list = self.doc.new_element(Kind::BulletList);
        self.doc.set_line(list, self.frame.lines.current_lineno());
        let bullet = line.chars().next().unwrap_or('-');
        self.doc.set_attr(list, "bullet", bullet.to_string());
        self.append(list);
        let (item, blank_finish) = self.list_item(line, end)?;
        self.doc.append(list, item);
        self.frame.states.push(State::BulletList {
            list,
            bullet,
            blank_finish,
        });
        Ok(())
    }

    pub(super) fn bullet_list_state(&mut self, bullet: char, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            self.frame.lines.advance(1);
            return Ok(());
        }
        match marker_utils::bullet(line) {
            Some(end) if line.starts_with(bullet) => {
                let (item, blank_finish) = self.list_item(line, end)?;
                if let Some(State::BulletList { list, .. }) = self.frame.states.last() {
                    let list = *list;
                    self.doc.append(list, item);
                }
                self.set_blank_finish(blank_finish);
                Ok(())
            }
            _ => self.end_state(),
        }
    }

    /// The current line starts an enumerated list item if it is the last
    /// line, or is followed by a blank or indented line, or by the next
    /// enumerator in sequence.
    fn is_enumerated_list_item(&self, parsed: Parsed, format: EnumFormat) -> bool {
        let Some(ordinal) = parsed.ordinal else {
            return false;
        };
        let Some(next) = self.frame.lines.peek(1) else {
            return true;
        };
        if next.trim().is_empty() || next.starts_with(' ') {
            return true;
        }
        let auto = format!("{}#{} ", format.prefix(), format.suffix());
        if next.starts_with(&auto) {
            return true;
        }
        let sequence = parsed.sequence.unwrap_or(Sequence::Arabic);
        match sequence.enumerator(ordinal + 1) {
            Some(e) => next.starts_with(&format!("{}{e}{} ", format.prefix(), format.suffix())),
            None => false,
        }
    }

    pub(super) fn enumerator(&mut self, m: EnumMatch) -> Result<()> {
        let Some(parsed) = parse_enumerator(&m.text, None) else {
            return self.body_text();
        };
        if !self.is_enumerated_list_item(parsed, m.format) {
            return self.body_text();
        }
        let line = self.frame.lines.current().unwrap_or_default().to_string();
        let ordinal = parsed.ordinal.unwrap_or(1);
        let sequence = parsed.sequence.unwrap_or(Sequence::Arabic);

        let list = self.doc.new_element(Kind::EnumeratedList);
        self.doc.set_line(list, self.frame.lines.current_lineno());
        self.doc.set_attr(list, "enumtype", sequence.name());
        self.doc.set_attr(list, "prefix", m.format.prefix());
        self.doc.set_attr(list, "suffix", m.format.suffix());
        self.append(list);
        if ordinal != 1 {
            self.doc.set_attr(list, "start", ordinal);
            let msg = self
                .doc
                .info(format!(
                    "Enumerated list start value not ordinal-1: \"{}\" (ordinal {ordinal})",
                    m.text
                ))
                .emit()?;
            self.append(msg);
        }
        let (item, blank_finish) = self.list_item(&line, m.end)?;
        self.doc.append(list, item);
        self.frame.states.push(State::EnumeratedList(EnumState {
            list,
            format: m.format,
            sequence,
            last_ordinal: ordinal,
            auto: parsed.sequence.is_none(),
            blank_finish,
            first_text: m.text,
            items: 1,
        }));
        Ok(())
    }

    pub(super) fn enumerated_list_state(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            self.frame.lines.advance(1);
            return Ok(());
        }
        let Some(State::EnumeratedList(mut state)) = self.frame.states.last().cloned() else {
            return self.end_state();
        };
        let Some(m) = marker_utils::enumerator(line) else {
            return self.end_state();
        };
        let Some(parsed) = parse_enumerator(&m.text, Some(state.sequence)) else {
            return self.end_state();
        };

        let continues = m.format == state.format
            && match parsed.sequence {
                None => true,
                Some(seq) => {
                    seq == state.sequence
                        && !state.auto
                        && parsed.ordinal == Some(state.last_ordinal + 1)
                }
            }
            && self.is_enumerated_list_item(parsed, m.format);

        let parsed = if continues {
            parsed
        } else if let Some(roman) = self.roman_switch(&state, &m) {
            log::debug!("Enumerated list reinterpreted as {}", roman.name());
            let first = roman.ordinal(&state.first_text).unwrap_or(1);
            state.sequence = roman;
            state.last_ordinal = first;
            self.doc.set_attr(state.list, "enumtype", roman.name());
            if first == 1 {
                self.doc.remove_attr(state.list, "start");
            } else {
                self.doc.set_attr(state.list, "start", first);
            }
            Parsed {
                sequence: Some(roman),
                ordinal: roman.ordinal(&m.text),
            }
        } else {
            return self.end_state();
        };

        if parsed.sequence.is_none() {
            state.auto = true;
        }
        let (item, blank_finish) = self.list_item(line, m.end)?;
        self.doc.append(state.list, item);
        state.blank_finish = blank_finish;
        state.last_ordinal = parsed.ordinal.unwrap_or(state.last_ordinal + 1);
        state.items += 1;
        if let Some(top) = self.frame.states.last_mut() {
            *top = State::EnumeratedList(state);
        }
        Ok(())
    }

    /// A single-letter alphabetic list whose second item only makes sense
    /// as the next Roman numeral (`v.` then `vi.`) becomes a Roman list.
    fn roman_switch(&self, state: &EnumState, m: &EnumMatch) -> Option<Sequence> {
        if state.items != 1 || state.auto || state.sequence.is_roman() || m.format != state.format
        {
            return None;
        }
        if !matches!(state.sequence, Sequence::LowerAlpha | Sequence::UpperAlpha) {
            return None;
        }
        let roman = state.sequence.roman_counterpart();
        if !roman.matches(&state.first_text) || !roman.matches(&m.text) {
            return None;
        }
        let first = roman.ordinal(&state.first_text)?;
        let ordinal = roman.ordinal(&m.text)?;
        let parsed = Parsed {
            sequence: Some(roman),
            ordinal: Some(ordinal),
        };
        (ordinal == first + 1 && self.is_enumerated_list_item(parsed, m.format)).then_some(roman)
    }

    fn field(&mut self, line: &str, end: usize) -> Result<(NodeId, bool)> {
        let name = marker_utils::field_name(&line[..end]).to_string();
        let lineno = self.frame.lines.current_lineno();
        let indented = self
            .frame
            .lines
            .get_indented(IndentSpec::first_known(char_offset(line, end)));
        let field = self.doc.new_element(Kind::Field);
        self.doc.set_line(field, lineno);
        let (name_nodes, name_messages) = self.inline_text(&name, lineno)?;
        let field_name = self.doc.new_element_with(Kind::FieldName, name_nodes);
        self.doc.set_rawsource(field_name, name.as_str());
        self.doc.append(field, field_name);
        let body = self.doc.new_element_with(Kind::FieldBody, name_messages);
        self.doc.set_rawsource(body, indented.block.text());
        self.doc.append(field, body);
        if !indented.block.is_empty() {
            self.nested_parse(indented.block, body);
        }
        Ok((field, indented.blank_finish))
    }

    pub(super) fn field_marker(&mut self, line: &str, end: usize) -> Result<()> {
        let list = self.doc.new_element(Kind::FieldList);
        self.doc.set_line(list, self.frame.lines.current_lineno());
        self.append(list);
        let (field, blank_finish) = self.field(line, end)?;
        self.doc.append(list, field);
        self.frame.states.push(State::FieldList { list, blank_finish });
        Ok(())
    }

    pub(super) fn field_list_state(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            self.frame.lines.advance(1);
            return Ok(());
        }
        let Some(end) = marker_utils::field_marker(line) else {
            return self.end_state();
        };
        let (field, blank_finish) = self.field(line, end)?;
        if let Some(State::FieldList { list, .. }) = self.frame.states.last() {
            let list = *list;
            self.doc.append(list, field);
        }
        self.set_blank_finish(blank_finish);
        Ok(())
    }

    /// Build an option list item, or `None` when the marker has no
    /// description (the line is then ordinary text). The line is left
    /// unconsumed in that case.
    fn option_list_item(
        &mut self,
        line: &str,
        end: usize,
        options: Vec<OptionSpec>,
    ) -> Result<Option<(NodeId, bool)>> {
        let start = self.frame.lines.pos();
        let lineno = self.frame.lines.current_lineno();
        let indented = self
            .frame
            .lines
            .get_indented(IndentSpec::first_known(char_offset(line, end)));
        if indented.block.is_empty() {
            self.frame.lines.set_pos(start);
            return Ok(None);
        }
        let group = self.doc.new_element(Kind::OptionGroup);
        for spec in options {
            let option = self.doc.new_element(Kind::CommandOption);
            self.doc.set_rawsource(option, spec.source.as_str());
            let string = self
                .doc
                .new_text_element(Kind::OptionString, &spec.string, &spec.string);
            self.doc.append(option, string);
            if let Some((argument, delimiter)) = spec.argument {
                let arg = self
                    .doc
                    .new_text_element(Kind::OptionArgument, &argument, &argument);
                self.doc.set_attr(arg, "delimiter", delimiter);
                self.doc.append(option, arg);
            }
            self.doc.append(group, option);
        }
        let description = self.doc.new_element(Kind::Description);
        self.doc.set_rawsource(description, indented.block.text());
        let item = self
            .doc
            .new_element_with(Kind::OptionListItem, vec![group, description]);
        self.doc.set_line(item, lineno);
        self.nested_parse(indented.block, description);
        Ok(Some((item, indented.blank_finish)))
    }

    pub(super) fn option_marker(&mut self, line: &str, end: usize) -> Result<()> {
        let options = match parse_option_marker(&line[..end]) {
            Ok(options) => options,
            Err(detail) => {
                let msg = self
                    .doc
                    .error(format!("Invalid option list marker: {detail}"))
                    .emit()?;
                self.append(msg);
                let indented = self
                    .frame
                    .lines
                    .get_indented(IndentSpec::first_known(char_offset(line, end)));
                self.block_quote(indented.block)?;
                if !indented.blank_finish {
                    self.unindent_warning("Option list")?;
                }
                return Ok(());
            }
        };
        let list_line = self.frame.lines.current_lineno();
        let Some((item, blank_finish)) = self.option_list_item(line, end, options)? else {
            return self.body_text();
        };
        let list = self.doc.new_element(Kind::OptionList);
        self.doc.set_line(list, list_line);
        self.append(list);
        self.doc.append(list, item);
        self.frame.states.push(State::OptionList { list, blank_finish });
        Ok(())
    }

    pub(super) fn option_list_state(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            self.frame.lines.advance(1);
            return Ok(());
        }
        let Some(end) = marker_utils::option_marker(line) else {
            return self.end_state();
        };
        let Ok(options) = parse_option_marker(&line[..end]) else {
            return self.end_state();
        };
        match self.option_list_item(line, end, options)? {
            Some((item, blank_finish)) => {
                if let Some(State::OptionList { list, .. }) = self.frame.states.last() {
                    let list = *list;
                    self.doc.append(list, item);
                }
                self.set_blank_finish(blank_finish);
                Ok(())
            }
            None => self.end_state(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OptionSpec {
    source: String,
    string: String,
    /// Argument text and the delimiter that preceded it.
    argument: Option<(String, String)>,
}

/// Split an option marker such as `-f FILE, --file=FILE` into options.
pub(crate) fn parse_option_marker(marker: &str) -> std::result::Result<Vec<OptionSpec>, String> {
    let mut options = Vec::new();
    for source in marker.trim_end().split(", ") {
        let mut tokens: Vec<String> = source.split_whitespace().map(str::to_string).collect();
        let Some(first) = tokens.first().cloned() else {
            return Err(format!(
                "wrong number of option tokens (=0), should be 1 or 2: \"{source}\""
            ));
        };
        let mut delimiter = " ";
        if let Some((opt, arg)) = first.split_once('=') {
            tokens.splice(0..1, [opt.to_string(), arg.to_string()]);
            delimiter = "=";
        } else if first.chars().count() > 2
            && ((first.starts_with('-') && !first.starts_with("--")) || first.starts_with('+'))
        {
            let split = first
                .char_indices()
                .nth(2)
                .map(|(i, _)| i)
                .unwrap_or(first.len());
            tokens.splice(
                0..1,
                [first[..split].to_string(), first[split..].to_string()],
            );
            delimiter = "";
        }
        if tokens.len() > 1
            && tokens[1].starts_with('<')
            && tokens.last().is_some_and(|t| t.ends_with('>'))
        {
            let joined = tokens[1..].join(" ");
            tokens.truncate(1);
            tokens.push(joined);
        }
        if tokens.is_empty() || tokens.len() > 2 {
            return Err(format!(
                "wrong number of option tokens (={}), should be 1 or 2: \"{source}\"",
                tokens.len()
            ));
        }
        options.push(OptionSpec {
            source: source.to_string(),
            string: tokens[0].clone(),
            argument: tokens.get(1).map(|a| (a.clone(), delimiter.to_string())),
        });
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerator_sequences() {
        let p = parse_enumerator("i", None).unwrap();
        assert_eq!(p.sequence, Some(Sequence::LowerRoman));
        assert_eq!(p.ordinal, Some(1));
        let p = parse_enumerator("v", None).unwrap();
        assert_eq!(p.sequence, Some(Sequence::LowerAlpha));
        assert_eq!(p.ordinal, Some(22));
        let p = parse_enumerator("ii", None).unwrap();
        assert_eq!(p.sequence, Some(Sequence::LowerRoman));
        let p = parse_enumerator("v", Some(Sequence::LowerRoman)).unwrap();
        assert_eq!(p.ordinal, Some(5));
        assert!(parse_enumerator("#", None).unwrap().sequence.is_none());
        assert_eq!(parse_enumerator("IIII", None).unwrap().ordinal, None);
    }

    #[test]
    fn next_enumerators() {
        assert_eq!(Sequence::UpperAlpha.enumerator(2).as_deref(), Some("B"));
        assert_eq!(Sequence::LowerAlpha.enumerator(27), None);
        assert_eq!(Sequence::LowerRoman.enumerator(4).as_deref(), Some("iv"));
    }

    #[test]
    fn option_marker_tokens() {
        let opts = parse_option_marker("-f FILE, --file=FILE  ").unwrap();
        assert_eq!(opts.len(), 2);
        assert_eq!(opts[0].string, "-f");
        assert_eq!(opts[0].argument, Some(("FILE".into(), " ".into())));
        assert_eq!(opts[1].argument, Some(("FILE".into(), "=".into())));

        let opts = parse_option_marker("-fFILE").unwrap();
        assert_eq!(opts[0].string, "-f");
        assert_eq!(opts[0].argument, Some(("FILE".into(), "".into())));

        let opts = parse_option_marker("--out <a b>").unwrap();
        assert_eq!(opts[0].argument, Some(("<a b>".into(), " ".into())));
    }
}
