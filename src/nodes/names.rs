//! Reference-name normalization and id generation.

/// Collapse runs of whitespace to single spaces and trim.
pub fn whitespace_normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-normalize and lowercase.
pub fn fully_normalize_name(name: &str) -> String {
    whitespace_normalize_name(name).to_lowercase()
}

fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'ř' => "r",
        'ś' | 'š' => "s",
        'ť' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'þ' => "th",
        _ => return None,
    };
    Some(folded)
}

/// Convert `text` into an identifier: lowercase ASCII letters, digits and
/// single hyphens, starting with a letter and not ending in a hyphen.
pub fn make_id(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut folded = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if c.is_ascii() {
            folded.push(c);
        } else if let Some(ascii) = fold_char(c) {
            folded.push_str(ascii);
        } else if c.is_whitespace() {
            folded.push(' ');
        }
    }

    let mut id = String::with_capacity(folded.len());
    let mut pending_hyphen = false;
    for c in folded.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen {
                id.push('-');
                pending_hyphen = false;
            }
            id.push(c);
        } else if !id.is_empty() {
            pending_hyphen = true;
        }
    }

    id.trim_start_matches(|c: char| c == '-' || c.is_ascii_digit())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_whitespace_and_case() {
        assert_eq!(whitespace_normalize_name("  A\n  Name "), "A Name");
        assert_eq!(fully_normalize_name("  A\n  Name "), "a name");
    }

    #[test]
    fn make_id_examples() {
        assert_eq!(make_id("Section Title"), "section-title");
        assert_eq!(make_id("  -- 12 Monkeys!"), "monkeys");
        assert_eq!(make_id("a__b..c"), "a-b-c");
        assert_eq!(make_id("Café Crème"), "cafe-creme");
        assert_eq!(make_id("123"), "");
        assert_eq!(make_id("trailing-"), "trailing");
    }
}
