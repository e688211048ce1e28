//! Character classes deciding where inline markup may start and end.
//!
//! `OPENERS[i]` pairs with `CLOSERS[i]`; a start-string directly enclosed
//! by such a pair is not markup.

const OPENERS: &[char] = &[
    '"', '\'', '(', '<', '[', '{', '\u{0f3a}', '\u{0f3c}', '\u{169b}', '\u{2045}', '\u{207d}',
    '\u{208d}', '\u{2329}', '\u{2768}', '\u{276a}', '\u{276c}', '\u{276e}', '\u{2770}',
    '\u{2772}', '\u{2774}', '\u{27c5}', '\u{27e6}', '\u{27e8}', '\u{27ea}', '\u{2983}',
    '\u{2985}', '\u{3008}', '\u{300a}', '\u{300c}', '\u{300e}', '\u{3010}', '\u{3014}',
    '\u{3016}', '\u{3018}', '\u{301a}', '\u{ff08}', '\u{ff3b}', '\u{ff5b}', '\u{00ab}',
    '\u{2018}', '\u{201c}', '\u{2039}', '\u{00bb}', '\u{2019}', '\u{201d}', '\u{203a}',
    '\u{201a}', '\u{201e}',
];

const CLOSERS: &[char] = &[
    '"', '\'', ')', '>', ']', '}', '\u{0f3b}', '\u{0f3d}', '\u{169c}', '\u{2046}', '\u{207e}',
    '\u{208e}', '\u{232a}', '\u{2769}', '\u{276b}', '\u{276d}', '\u{276f}', '\u{2771}',
    '\u{2773}', '\u{2775}', '\u{27c6}', '\u{27e7}', '\u{27e9}', '\u{27eb}', '\u{2984}',
    '\u{2986}', '\u{3009}', '\u{300b}', '\u{300d}', '\u{300f}', '\u{3011}', '\u{3015}',
    '\u{3017}', '\u{3019}', '\u{301b}', '\u{ff09}', '\u{ff3d}', '\u{ff5d}', '\u{00bb}',
    '\u{2019}', '\u{201d}', '\u{203a}', '\u{00ab}', '\u{2018}', '\u{201c}', '\u{2039}',
    '\u{201b}', '\u{201f}',
];

/// Extra closing quotes accepted for an opening quote, for languages that
/// quote „like this“ or »like this».
fn quote_pair(open: char) -> &'static [char] {
    match open {
        '\u{00bb}' => &['\u{00bb}'],
        '\u{2018}' => &['\u{201a}'],
        '\u{2019}' => &['\u{2019}'],
        '\u{201a}' => &['\u{2018}', '\u{2019}'],
        '\u{201c}' => &['\u{201e}'],
        '\u{201e}' => &['\u{201c}', '\u{201d}'],
        '\u{201d}' => &['\u{201d}'],
        '\u{203a}' => &['\u{203a}'],
        _ => &[],
    }
}

pub(crate) fn is_opener(c: char) -> bool {
    OPENERS.contains(&c)
}

pub(crate) fn is_closer(c: char) -> bool {
    CLOSERS.contains(&c)
}

/// Dashes and other non-bracket punctuation. Only `\ - / :` from ASCII.
pub(crate) fn is_delimiter(c: char) -> bool {
    match c {
        '\\' | '-' | '/' | ':' => true,
        c if c.is_ascii() => false,
        '\u{00a1}' | '\u{00a7}' | '\u{00b6}' | '\u{00b7}' | '\u{00bf}' | '\u{037e}' | '\u{0387}' => {
            true
        }
        '\u{058a}' | '\u{05be}' | '\u{1400}' | '\u{1806}' => true,
        '\u{2010}'..='\u{2027}' | '\u{2030}'..='\u{2038}' | '\u{203b}'..='\u{203e}' => true,
        '\u{2041}'..='\u{2043}' | '\u{2047}'..='\u{2051}' | '\u{2053}'..='\u{205e}' => true,
        '\u{2e00}'..='\u{2e01}' | '\u{2e06}'..='\u{2e08}' | '\u{2e0b}' | '\u{2e0e}'..='\u{2e1b}' => {
            true
        }
        '\u{2e1e}'..='\u{2e1f}' | '\u{2e2a}'..='\u{2e2e}' | '\u{2e30}'..='\u{2e3b}' => true,
        '\u{3001}'..='\u{3003}' | '\u{301c}' | '\u{3030}' | '\u{303d}' | '\u{30a0}' | '\u{30fb}' => {
            true
        }
        '\u{fe10}'..='\u{fe16}' | '\u{fe19}' | '\u{fe30}'..='\u{fe32}' | '\u{fe45}'..='\u{fe46}' => {
            true
        }
        '\u{fe49}'..='\u{fe4c}' | '\u{fe50}'..='\u{fe52}' | '\u{fe54}'..='\u{fe58}' => true,
        '\u{fe5f}'..='\u{fe61}' | '\u{fe63}' | '\u{fe68}' | '\u{fe6a}'..='\u{fe6b}' => true,
        '\u{ff01}'..='\u{ff03}' | '\u{ff05}'..='\u{ff07}' | '\u{ff0a}' | '\u{ff0c}'..='\u{ff0f}' => {
            true
        }
        '\u{ff1a}'..='\u{ff1b}' | '\u{ff1f}'..='\u{ff20}' | '\u{ff3c}' | '\u{ff61}' => true,
        '\u{ff64}'..='\u{ff65}' => true,
        _ => false,
    }
}

/// ASCII punctuation allowed right after an end-string.
pub(crate) fn is_closing_delimiter(c: char) -> bool {
    matches!(c, '\\' | '.' | ',' | ';' | '!' | '?')
}

/// True when `before` and `after` are a matching bracket or quote pair.
pub(crate) fn match_chars(before: char, after: char) -> bool {
    let Some(i) = OPENERS.iter().position(|&c| c == before) else {
        return false;
    };
    CLOSERS[i] == after || quote_pair(before).contains(&after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_aligned() {
        assert_eq!(OPENERS.len(), CLOSERS.len());
    }

    #[test]
    fn brackets_and_quotes_match() {
        assert!(match_chars('(', ')'));
        assert!(match_chars('"', '"'));
        assert!(match_chars('\u{201e}', '\u{201c}'));
        assert!(!match_chars('(', ']'));
        assert!(!match_chars('a', 'a'));
    }

    #[test]
    fn ascii_delimiters() {
        for c in ['-', '/', ':', '\\'] {
            assert!(is_delimiter(c));
        }
        assert!(!is_delimiter('*'));
        assert!(is_delimiter('\u{2014}'));
    }
}
