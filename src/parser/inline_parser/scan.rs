//! Recognizers for inline start-strings, end-strings and implicit links.
//!
//! All positions are indices into a `&[char]` of escape-marked text (see
//! [`crate::utils::escape2null`]): a NUL precedes every escaped character.

use super::punctuation::{is_closer, is_closing_delimiter, is_delimiter, is_opener};

/// Inline markup start-strings that need a matching end-string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StartKind {
    Strong,
    Emphasis,
    Literal,
    Target,
    SubstitutionReference,
}

impl StartKind {
    pub(super) fn name(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Emphasis => "emphasis",
            Self::Literal => "literal",
            Self::Target => "target",
            Self::SubstitutionReference => "substitution_reference",
        }
    }
}

/// The leftmost inline construct found in a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Initial {
    Start {
        kind: StartKind,
        start: usize,
        end: usize,
    },
    /// `name_` or `name__`.
    Reference {
        start: usize,
        name_end: usize,
        end: usize,
    },
    /// `[label]_`; the label spans `start + 1..label_end`.
    Footnote {
        start: usize,
        label_end: usize,
        end: usize,
        citation: bool,
    },
    /// An opening backquote at `tick`, with an optional `:role:` prefix
    /// (name span) starting at `start`.
    Backquote {
        start: usize,
        role: Option<(usize, usize)>,
        tick: usize,
    },
}

/// What an end-string must not be preceded by.
#[derive(Debug, Clone, Copy)]
pub(super) enum Before {
    Whitespace,
    WhitespaceOrEscape,
    /// Whitespace or escape marker, unless that itself is escaped.
    UnescapedWhitespaceOrEscape,
}

/// Closing backquote of interpreted text or a phrase reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct InterpretedEnd {
    pub tick: usize,
    pub role: Option<(usize, usize)>,
    pub refend: usize,
    pub end: usize,
}

/// A standalone URI or e-mail address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct UriMatch {
    pub start: usize,
    pub end: usize,
    /// Span of the scheme, for absolute URIs.
    pub scheme: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct NumberedMatch {
    pub start: usize,
    pub end: usize,
    pub number: (usize, usize),
}

/// Alphanumerics; `_` only counts as a separator inside names.
pub(super) fn is_word(c: char) -> bool {
    c.is_alphanumeric()
}

fn is_uric(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '\0' || "-_.!~*'()[];/:@&=+$,%".contains(c)
}

fn is_urilast(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_~*/=+".contains(c)
}

fn is_emailc(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '\0' || "-_!~*'{|}/#?^`&=+$%".contains(c)
}

/// A final URI character: one that cannot be trailing punctuation, or any
/// URI character directly before a `>`.
fn uri_end_at(chars: &[char], k: usize) -> bool {
    chars.get(k).is_some_and(|&c| {
        is_urilast(c) || (is_uric(c) && chars.get(k + 1) == Some(&'>'))
    })
}

fn run(chars: &[char], from: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut j = from;
    while j < chars.len() && pred(chars[j]) {
        j += 1;
    }
    j
}

fn starts_with(chars: &[char], at: usize, s: &str) -> bool {
    let mut i = at;
    for c in s.chars() {
        if chars.get(i) != Some(&c) {
            return false;
        }
        i += 1;
    }
    true
}

fn not_whitespace_at(chars: &[char], j: usize) -> bool {
    chars.get(j).is_none_or(|c| !c.is_whitespace())
}

/// Every position where a simple name starting at `i` may end, shortest
/// first. Names are alphanumeric runs joined by single `-._+:`.
pub(super) fn simplename_ends(chars: &[char], i: usize) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut j = i;
    while j < chars.len() && is_word(chars[j]) {
        j += 1;
        ends.push(j);
    }
    if ends.is_empty() {
        return ends;
    }
    while j + 1 < chars.len()
        && matches!(chars[j], '-' | '.' | '_' | '+' | ':')
        && is_word(chars[j + 1])
    {
        j += 1;
        while j < chars.len() && is_word(chars[j]) {
            j += 1;
            ends.push(j);
        }
    }
    ends
}

/// Lengths to try for an optional `_`/`__` suffix at `at`, longest first.
fn refend_options(chars: &[char], at: usize) -> Vec<usize> {
    let mut options = Vec::with_capacity(3);
    if starts_with(chars, at, "__") {
        options.push(2);
    }
    if chars.get(at) == Some(&'_') {
        options.push(1);
    }
    options.push(0);
    options
}

/// Context rules for inline markup.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Rules {
    /// Allow markup inside words; only escapes break recognition.
    pub character_level: bool,
}

impl Rules {
    /// May a start-string begin at `i`?
    pub(super) fn start_ok(&self, chars: &[char], i: usize) -> bool {
        if i == 0 {
            return true;
        }
        let prev = chars[i - 1];
        if self.character_level {
            return prev != '\0';
        }
        prev.is_whitespace() || is_opener(prev) || is_delimiter(prev)
    }

    /// May an end-string finish right before `j`?
    pub(super) fn end_ok(&self, chars: &[char], j: usize) -> bool {
        if self.character_level {
            return true;
        }
        chars.get(j).is_none_or(|&c| {
            c.is_whitespace()
                || c == '\0'
                || is_closing_delimiter(c)
                || is_delimiter(c)
                || is_closer(c)
        })
    }

    /// The leftmost start-string, reference or footnote label in `chars`.
    pub(super) fn initial(&self, chars: &[char]) -> Option<Initial> {
        (0..chars.len())
            .filter(|&i| self.start_ok(chars, i))
            .find_map(|i| {
                self.start_string(chars, i)
                    .or_else(|| self.reference(chars, i))
                    .or_else(|| self.footnote(chars, i))
                    .or_else(|| self.backquote(chars, i))
            })
    }

    fn start_string(&self, chars: &[char], i: usize) -> Option<Initial> {
        let (kind, len) = match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => (StartKind::Strong, 2),
            '*' => (StartKind::Emphasis, 1),
            '`' if chars.get(i + 1) == Some(&'`') => (StartKind::Literal, 2),
            '_' if chars.get(i + 1) == Some(&'`') => (StartKind::Target, 2),
            '|' if chars.get(i + 1) != Some(&'|') => (StartKind::SubstitutionReference, 1),
            _ => return None,
        };
        not_whitespace_at(chars, i + len).then_some(Initial::Start {
            kind,
            start: i,
            end: i + len,
        })
    }

    fn reference(&self, chars: &[char], i: usize) -> Option<Initial> {
        simplename_ends(chars, i).into_iter().rev().find_map(|e| {
            refend_options(chars, e)
                .into_iter()
                .filter(|&n| n > 0)
                .find(|&n| self.end_ok(chars, e + n))
                .map(|n| Initial::Reference {
                    start: i,
                    name_end: e,
                    end: e + n,
                })
        })
    }

    fn footnote(&self, chars: &[char], i: usize) -> Option<Initial> {
        if chars[i] != '[' {
            return None;
        }
        let closes = |e: usize| starts_with(chars, e, "]_") && self.end_ok(chars, e + 2);
        let found = |label_end: usize, citation: bool| Initial::Footnote {
            start: i,
            label_end,
            end: label_end + 2,
            citation,
        };
        let digits = run(chars, i + 1, |c| c.is_ascii_digit());
        if digits > i + 1 && closes(digits) {
            return Some(found(digits, false));
        }
        if chars.get(i + 1) == Some(&'#') {
            let mut ends = simplename_ends(chars, i + 2);
            ends.insert(0, i + 2);
            if let Some(e) = ends.into_iter().rev().find(|&e| closes(e)) {
                return Some(found(e, false));
            }
        }
        if chars.get(i + 1) == Some(&'*') && closes(i + 2) {
            return Some(found(i + 2, false));
        }
        simplename_ends(chars, i + 1)
            .into_iter()
            .rev()
            .find(|&e| closes(e))
            .map(|e| found(e, true))
    }

    fn backquote(&self, chars: &[char], i: usize) -> Option<Initial> {
        let opening = |tick: usize| {
            chars.get(tick) == Some(&'`')
                && chars.get(tick + 1) != Some(&'`')
                && not_whitespace_at(chars, tick + 1)
        };
        if chars[i] == ':' {
            let role = simplename_ends(chars, i + 1)
                .into_iter()
                .rev()
                .find(|&e| chars.get(e) == Some(&':') && opening(e + 1));
            if let Some(e) = role {
                return Some(Initial::Backquote {
                    start: i,
                    role: Some((i + 1, e)),
                    tick: e + 1,
                });
            }
        }
        opening(i).then_some(Initial::Backquote {
            start: i,
            role: None,
            tick: i,
        })
    }

    fn before_ok(chars: &[char], from: usize, p: usize, before: Before) -> bool {
        if p == from {
            return true;
        }
        let prev = chars[p - 1];
        match before {
            Before::Whitespace => !prev.is_whitespace(),
            Before::WhitespaceOrEscape => !prev.is_whitespace() && prev != '\0',
            Before::UnescapedWhitespaceOrEscape => {
                let unescaped = p - 1 == from || chars[p - 2] != '\0';
                !((prev.is_whitespace() || prev == '\0') && unescaped)
            }
        }
    }

    /// The end-string `delim` searched from `from`. `None` also when the
    /// first candidate would leave the content empty.
    pub(super) fn find_end(
        &self,
        chars: &[char],
        from: usize,
        delim: &str,
        before: Before,
    ) -> Option<(usize, usize)> {
        let len = delim.chars().count();
        let p = (from..chars.len()).find(|&p| {
            starts_with(chars, p, delim)
                && Self::before_ok(chars, from, p, before)
                && self.end_ok(chars, p + len)
        })?;
        (p > from).then_some((p, p + len))
    }

    /// Closing `|` of a substitution reference, with up to two `_`.
    pub(super) fn find_substitution_end(&self, chars: &[char], from: usize) -> Option<(usize, usize)> {
        let found = (from..chars.len()).find_map(|p| {
            if chars[p] != '|' || !Self::before_ok(chars, from, p, Before::WhitespaceOrEscape) {
                return None;
            }
            refend_options(chars, p + 1)
                .into_iter()
                .find(|&n| self.end_ok(chars, p + 1 + n))
                .map(|n| (p, p + 1 + n))
        })?;
        (found.0 > from).then_some(found)
    }

    /// Closing backquote of interpreted text, with an optional `:role:`
    /// suffix and `_`/`__` reference suffix.
    pub(super) fn find_interpreted_end(&self, chars: &[char], from: usize) -> Option<InterpretedEnd> {
        let found = (from..chars.len()).find_map(|p| {
            if chars[p] != '`'
                || !Self::before_ok(chars, from, p, Before::UnescapedWhitespaceOrEscape)
            {
                return None;
            }
            let q = p + 1;
            if chars.get(q) == Some(&':') {
                for e in simplename_ends(chars, q + 1).into_iter().rev() {
                    if chars.get(e) != Some(&':') {
                        continue;
                    }
                    if let Some(n) = refend_options(chars, e + 1)
                        .into_iter()
                        .find(|&n| self.end_ok(chars, e + 1 + n))
                    {
                        return Some(InterpretedEnd {
                            tick: p,
                            role: Some((q + 1, e)),
                            refend: n,
                            end: e + 1 + n,
                        });
                    }
                }
            }
            refend_options(chars, q)
                .into_iter()
                .find(|&n| self.end_ok(chars, q + n))
                .map(|n| InterpretedEnd {
                    tick: p,
                    role: None,
                    refend: n,
                    end: q + n,
                })
        })?;
        (found.tick > from).then_some(found)
    }

    /// Ends of an absolute URI starting at `i`, in preference order.
    fn absolute_uri(&self, chars: &[char], i: usize) -> Option<UriMatch> {
        if !chars.get(i).is_some_and(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let scheme_end = run(chars, i + 1, |c| c.is_ascii_alphanumeric() || "+.-".contains(c));
        if chars.get(scheme_end) != Some(&':') {
            return None;
        }
        let body = scheme_end + 1;
        let path_end = run(chars, body, is_uric);
        for e in (body + 1..=path_end).rev() {
            if !uri_end_at(chars, e - 1) {
                continue;
            }
            for q in optional_part(chars, e, '?') {
                for f in optional_part(chars, q, '#') {
                    if self.end_ok(chars, f) {
                        return Some(UriMatch {
                            start: i,
                            end: f,
                            scheme: Some((i, scheme_end)),
                        });
                    }
                }
            }
        }
        None
    }

    fn email(&self, chars: &[char], i: usize, accept: impl Fn(usize) -> bool) -> Option<UriMatch> {
        if !chars.get(i).copied().is_some_and(is_emailc) {
            return None;
        }
        let mut at = run(chars, i, is_emailc);
        while chars.get(at) == Some(&'.') && chars.get(at + 1).copied().is_some_and(is_emailc) {
            at = run(chars, at + 1, is_emailc);
        }
        if chars.get(at) != Some(&'@') || chars[at - 1] == '\0' {
            return None;
        }
        let host = at + 1;
        if !chars.get(host).copied().is_some_and(is_emailc) {
            return None;
        }
        let host_end = run(chars, host, |c| is_emailc(c) || c == '.');
        let last = (host_end + 1).min(chars.len());
        (host + 2..=last)
            .rev()
            .filter(|&e| uri_end_at(chars, e - 1))
            .find(|&e| accept(e))
            .map(|end| UriMatch {
                start: i,
                end,
                scheme: None,
            })
    }

    fn uri_at(&self, chars: &[char], i: usize) -> Option<UriMatch> {
        self.absolute_uri(chars, i)
            .or_else(|| self.email(chars, i, |e| self.end_ok(chars, e)))
    }

    /// A standalone URI or address starting exactly at index 0.
    pub(super) fn uri_prefix(&self, chars: &[char]) -> Option<UriMatch> {
        self.uri_at(chars, 0)
    }

    /// Leftmost standalone URI or e-mail address at or after `from`.
    pub(super) fn search_uri(&self, chars: &[char], from: usize) -> Option<UriMatch> {
        (from..chars.len())
            .filter(|&i| self.start_ok(chars, i))
            .find_map(|i| self.uri_at(chars, i))
    }

    /// Leftmost `pep-NNNN` or `PEP NNNN`.
    pub(super) fn search_pep(&self, chars: &[char]) -> Option<NumberedMatch> {
        (0..chars.len())
            .filter(|&i| self.start_ok(chars, i))
            .find_map(|i| {
                if starts_with(chars, i, "pep-") {
                    let digits = run(chars, i + 4, |c| c.is_ascii_digit());
                    if digits == i + 4 {
                        return None;
                    }
                    let number = (i + 4, digits);
                    if digits < chars.len()
                        && starts_with(chars, digits + 1, "txt")
                        && self.end_ok(chars, digits + 4)
                    {
                        return Some(NumberedMatch {
                            start: i,
                            end: digits + 4,
                            number,
                        });
                    }
                    return self.end_ok(chars, digits).then_some(NumberedMatch {
                        start: i,
                        end: digits,
                        number,
                    });
                }
                if starts_with(chars, i, "PEP") {
                    let space = run(chars, i + 3, char::is_whitespace);
                    let digits = run(chars, space, |c| c.is_ascii_digit());
                    if space > i + 3 && digits > space && self.end_ok(chars, digits) {
                        return Some(NumberedMatch {
                            start: i,
                            end: digits,
                            number: (space, digits),
                        });
                    }
                }
                None
            })
    }

    /// Leftmost `RFC NNNN`, `RFC-NNNN` or `RFCNNNN`.
    pub(super) fn search_rfc(&self, chars: &[char]) -> Option<NumberedMatch> {
        (0..chars.len())
            .filter(|&i| self.start_ok(chars, i) && starts_with(chars, i, "RFC"))
            .find_map(|i| {
                let after = i + 3;
                let mut separators = Vec::new();
                if chars.get(after) == Some(&'-') {
                    separators.push(after + 1);
                }
                let space = run(chars, after, char::is_whitespace);
                if space > after {
                    separators.push(space);
                }
                separators.push(after);
                separators.into_iter().find_map(|s| {
                    let digits = run(chars, s, |c| c.is_ascii_digit());
                    (digits > s && self.end_ok(chars, digits)).then_some(NumberedMatch {
                        start: i,
                        end: digits,
                        number: (s, digits),
                    })
                })
            })
    }
}

/// Candidate ends of an optional `marker uric* uri_end` part at `at`,
/// longest first, ending with `at` itself (part absent).
fn optional_part(chars: &[char], at: usize, marker: char) -> Vec<usize> {
    let mut ends = Vec::new();
    if chars.get(at) == Some(&marker) {
        let part_end = run(chars, at + 1, is_uric);
        ends.extend(
            (at + 2..=part_end)
                .rev()
                .filter(|&e| uri_end_at(chars, e - 1)),
        );
    }
    ends.push(at);
    ends
}

/// Is the whole of `chars` an e-mail address?
pub(super) fn is_email(chars: &[char]) -> bool {
    Rules::default()
        .email(chars, 0, |e| e == chars.len())
        .is_some()
}
