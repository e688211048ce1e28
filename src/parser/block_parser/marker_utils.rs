//! Line classifiers for the body transition table.
//!
//! Each returns the byte offset just past the marker (and its trailing
//! spaces) when the line starts the construct.

use std::sync::LazyLock;

use regex::Regex;

use super::lists::EnumFormat;

/// A reference name without whitespace: word characters joined by single
/// `-._+:` punctuation.
pub(crate) const SIMPLENAME: &str = r"[\w&&[^_]]+(?:[-._+:][\w&&[^_]]+)*";

static SIMPLENAME_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{SIMPLENAME}$")).expect("valid simplename regex"));

static OPTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    let optarg = r"(?:[a-zA-Z][a-zA-Z0-9_-]*|<[^<>]+>)";
    let shortopt = format!(r"(?:-|\+)[a-zA-Z0-9](?: ?{optarg})?");
    let longopt = format!(r"(?:--|/)[a-zA-Z0-9][a-zA-Z0-9_-]*(?:[ =]{optarg})?");
    let option = format!("(?:{shortopt}|{longopt})");
    Regex::new(&format!(r"^{option}(?:, {option})*(?:  +| ?$)")).expect("valid option regex")
});

pub(super) static GRID_TABLE_TOP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+-[-+]+-\+ *$").expect("valid grid table regex"));

static SIMPLE_TABLE_TOP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=+( +=+)+ *$").expect("valid simple table regex"));

static ENUMERATOR: LazyLock<Regex> = LazyLock::new(|| {
    let enumerator = r"(?:[0-9]+|[a-z]|[A-Z]|[ivxlcdm]+|[IVXLCDM]+|#)";
    Regex::new(&format!(
        r"^(?:\((?P<parens>{enumerator})\)|(?P<rparen>{enumerator})\)|(?P<period>{enumerator})\.)(?: +|$)"
    ))
    .expect("valid enumerator regex")
});

pub(crate) fn is_simplename(text: &str) -> bool {
    SIMPLENAME_ONLY.is_match(text)
}

/// Printable 7-bit ASCII that is not alphanumeric.
pub(crate) fn is_nonalphanum7bit(c: char) -> bool {
    c.is_ascii_punctuation()
}

fn after_spaces(line: &str, start: usize) -> Option<usize> {
    let rest = &line[start..];
    let trimmed = rest.trim_start_matches(' ');
    if trimmed.len() == rest.len() && !rest.is_empty() {
        return None;
    }
    Some(line.len() - trimmed.len())
}

pub(crate) fn bullet(line: &str) -> Option<usize> {
    let c = line.chars().next()?;
    if !matches!(c, '*' | '+' | '-' | '•' | '‣' | '⁃') {
        return None;
    }
    after_spaces(line, c.len_utf8())
}

#[derive(Debug, Clone)]
pub(crate) struct EnumMatch {
    pub format: EnumFormat,
    /// The enumerator without its punctuation.
    pub text: String,
    pub end: usize,
}

pub(crate) fn enumerator(line: &str) -> Option<EnumMatch> {
    let caps = ENUMERATOR.captures(line)?;
    let (format, text) = if let Some(m) = caps.name("parens") {
        (EnumFormat::Parens, m.as_str())
    } else if let Some(m) = caps.name("rparen") {
        (EnumFormat::Rparen, m.as_str())
    } else {
        (EnumFormat::Period, caps.name("period")?.as_str())
    };
    Some(EnumMatch {
        format,
        text: text.to_string(),
        end: caps.get(0)?.end(),
    })
}

/// `:name:` followed by spaces or end of line. The name may contain
/// escaped characters and colons not followed by a space or backquote.
pub(crate) fn field_marker(line: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    if chars.first()?.1 != ':' {
        return None;
    }
    match chars.get(1) {
        None | Some((_, ':')) | Some((_, ' ')) => return None,
        _ => {}
    }
    let mut i = 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == ':' {
            let next = chars.get(i + 1).map(|&(_, c)| c);
            let closes = matches!(next, None | Some(' ') | Some('`'));
            if closes {
                if chars[i - 1].1 == ' ' || next == Some('`') {
                    return None;
                }
                let end = chars[i].0 + 1;
                return after_spaces(line, end);
            }
        }
        i += 1;
    }
    None
}

/// Text between the colons of a field marker.
pub(crate) fn field_name(marker: &str) -> &str {
    let inner = marker.trim_end().strip_prefix(':').unwrap_or(marker);
    match inner.rfind(':') {
        Some(idx) => &inner[..idx],
        None => inner,
    }
}

pub(crate) fn option_marker(line: &str) -> Option<usize> {
    OPTION_MARKER.find(line).map(|m| m.end())
}

pub(crate) fn is_doctest(line: &str) -> bool {
    line.strip_prefix(">>>")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
}

pub(crate) fn line_block(line: &str) -> Option<usize> {
    line.strip_prefix('|')?;
    after_spaces(line, 1)
}

pub(crate) fn is_grid_table_top(line: &str) -> bool {
    GRID_TABLE_TOP.is_match(line)
}

pub(crate) fn is_simple_table_top(line: &str) -> bool {
    SIMPLE_TABLE_TOP.is_match(line)
}

pub(crate) fn explicit_markup(line: &str) -> Option<usize> {
    line.strip_prefix("..")?;
    after_spaces(line, 2)
}

pub(crate) fn anonymous_target(line: &str) -> Option<usize> {
    line.strip_prefix("__")?;
    after_spaces(line, 2)
}

/// A run of one repeated punctuation character, with optional trailing spaces.
pub(crate) fn is_line(line: &str) -> bool {
    let trimmed = line.trim_end_matches(' ');
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) if is_nonalphanum7bit(first) => chars.all(|c| c == first),
        _ => false,
    }
}

/// The line starts a body construct other than plain text.
pub(crate) fn is_body_markup(line: &str) -> bool {
    bullet(line).is_some()
        || enumerator(line).is_some()
        || field_marker(line).is_some()
        || option_marker(line).is_some()
        || is_doctest(line)
        || line_block(line).is_some()
        || is_grid_table_top(line)
        || is_simple_table_top(line)
        || explicit_markup(line).is_some()
        || anonymous_target(line).is_some()
        || is_line(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullets_need_space_or_end() {
        assert_eq!(bullet("- item"), Some(2));
        assert_eq!(bullet("-"), Some(1));
        assert_eq!(bullet("• x"), Some(4));
        assert_eq!(bullet("-x"), None);
    }

    #[test]
    fn enumerators_in_all_formats() {
        let m = enumerator("(iv) text").unwrap();
        assert_eq!(m.format, EnumFormat::Parens);
        assert_eq!(m.text, "iv");
        assert_eq!(m.end, 5);
        assert_eq!(enumerator("3) x").unwrap().format, EnumFormat::Rparen);
        assert_eq!(enumerator("#.").unwrap().text, "#");
        assert!(enumerator("3.x").is_none());
        assert!(enumerator("ab. x").is_none());
    }

    #[test]
    fn field_markers() {
        assert_eq!(field_marker(":name: body"), Some(7));
        assert_eq!(field_marker(":a:b: c"), Some(6));
        assert_eq!(field_marker(r":a\: b: c"), Some(8));
        assert_eq!(field_marker(":name:"), Some(6));
        assert_eq!(field_marker(": name:"), None);
        assert_eq!(field_marker(":name :"), None);
        assert_eq!(field_marker("::"), None);
        assert_eq!(field_name(":a:b: "), "a:b");
    }

    #[test]
    fn option_markers() {
        assert_eq!(option_marker("-a  desc"), Some(4));
        assert_eq!(option_marker("--long=ARG, -l ARG  x"), Some(20));
        assert_eq!(option_marker("/V"), Some(2));
        assert_eq!(option_marker("-f <file>  x"), Some(11));
        assert_eq!(option_marker("-a desc"), Some(7));
        assert_eq!(option_marker("- a"), None);
    }

    #[test]
    fn tables_and_lines() {
        assert!(is_grid_table_top("+---+--+"));
        assert!(!is_grid_table_top("+-+"));
        assert!(is_simple_table_top("===  ==="));
        assert!(!is_simple_table_top("====="));
        assert!(is_line("-----"));
        assert!(is_line("::"));
        assert!(!is_line("-=-="));
        assert_eq!(line_block("| x"), Some(2));
        assert_eq!(explicit_markup(".. x"), Some(3));
        assert_eq!(explicit_markup("..x"), None);
        assert_eq!(anonymous_target("__ http://x"), Some(3));
        assert!(is_doctest(">>> 1 + 1"));
        assert!(is_body_markup("* item"));
        assert!(is_simplename("a.b-c"));
        assert!(!is_simplename("a..b"));
        assert!(!is_simplename("_a"));
        assert!(!is_body_markup("term"));
    }
}
