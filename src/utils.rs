//! Small text helpers shared by the parser, transforms and directives.

use unicode_width::UnicodeWidthStr;

/// Replace every backslash-escaped character with NUL + the character, so
/// later passes see the character but know it was escaped.
pub fn escape2null(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push('\0');
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Drop NUL escape markers. Escaped whitespace disappears together with
/// its marker.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\0' {
            if matches!(chars.peek(), Some(' ') | Some('\n')) {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Turn NUL markers back into backslashes.
pub fn restore_backslashes(text: &str) -> String {
    text.replace('\0', "\\")
}

/// Split on escaped spaces and newlines (NUL + whitespace).
pub fn split_escaped_whitespace(text: &str) -> Vec<String> {
    text.split("\0 ")
        .flat_map(|part| part.split("\0\n"))
        .map(str::to_string)
        .collect()
}

/// Display width of `text`: East Asian wide characters count twice,
/// combining characters not at all.
pub fn column_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Number of leading spaces.
pub fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Byte offset in `line` of display column `col`, clamped to the line end.
pub fn byte_at_column(line: &str, col: usize) -> usize {
    let mut width = 0;
    for (idx, c) in line.char_indices() {
        if width >= col {
            return idx;
        }
        width += unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
    }
    line.len()
}

/// Slice `line` between display columns `start` and `end`.
pub fn slice_columns(line: &str, start: usize, end: usize) -> &str {
    let a = byte_at_column(line, start);
    let b = byte_at_column(line, end).max(a);
    &line[a..b]
}

const ROMAN: &[(usize, &str)] = &[
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Upper-case Roman numeral for 1..=4999.
pub fn to_roman(mut n: usize) -> Option<String> {
    if n == 0 || n >= 5000 {
        return None;
    }
    let mut out = String::new();
    for (value, numeral) in ROMAN {
        while n >= *value {
            out.push_str(numeral);
            n -= value;
        }
    }
    Some(out)
}

/// Parse a canonical upper-case Roman numeral.
pub fn from_roman(s: &str) -> Option<usize> {
    if s.is_empty() {
        return None;
    }
    let mut rest = s;
    let mut total = 0;
    for (value, numeral) in ROMAN {
        while let Some(stripped) = rest.strip_prefix(numeral) {
            total += value;
            rest = stripped;
        }
    }
    if !rest.is_empty() {
        return None;
    }
    (to_roman(total).as_deref() == Some(s)).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_and_unescape() {
        let nulled = escape2null(r"a\*b\ c\\");
        assert_eq!(nulled, "a\0*b\0 c\0\\");
        assert_eq!(unescape(&nulled), "a*bc\\");
        assert_eq!(restore_backslashes(&nulled), r"a\*b\ c\\");
    }

    #[test]
    fn trailing_backslash() {
        assert_eq!(escape2null("x\\"), "x\0");
        assert_eq!(unescape("x\0"), "x");
    }

    #[test]
    fn split_on_escaped_whitespace() {
        assert_eq!(
            split_escaped_whitespace("a\0 b\0\nc d"),
            vec!["a", "b", "c d"]
        );
    }

    #[test]
    fn wide_characters_count_double() {
        assert_eq!(column_width("abc"), 3);
        assert_eq!(column_width("日本"), 4);
        assert_eq!(slice_columns("日本語", 2, 4), "本");
    }

    #[test]
    fn roman_numerals() {
        assert_eq!(to_roman(1994).as_deref(), Some("MCMXCIV"));
        assert_eq!(from_roman("IV"), Some(4));
        assert_eq!(from_roman("IIII"), None);
        assert_eq!(from_roman("IC"), None);
        assert_eq!(from_roman(""), None);
    }
}
