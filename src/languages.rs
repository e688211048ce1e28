//! English name tables for directives, roles and bibliographic fields.

/// Canonical directive name for a (lowercased) localized name.
pub fn directive(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "attention" => "attention",
        "caution" => "caution",
        "danger" => "danger",
        "error" => "error",
        "hint" => "hint",
        "important" => "important",
        "note" => "note",
        "tip" => "tip",
        "warning" => "warning",
        "admonition" => "admonition",
        "sidebar" => "sidebar",
        "topic" => "topic",
        "line-block" => "line-block",
        "parsed-literal" => "parsed-literal",
        "code" | "code-block" | "sourcecode" => "code",
        "math" => "math",
        "rubric" => "rubric",
        "epigraph" => "epigraph",
        "highlights" => "highlights",
        "pull-quote" => "pull-quote",
        "compound" => "compound",
        "container" => "container",
        "table" => "table",
        "csv-table" => "csv-table",
        "list-table" => "list-table",
        "image" => "image",
        "figure" => "figure",
        "include" => "include",
        "raw" => "raw",
        "replace" => "replace",
        "unicode" => "unicode",
        "class" => "class",
        "role" => "role",
        "default-role" => "default-role",
        "title" => "title",
        "contents" => "contents",
        "sectnum" | "section-numbering" => "sectnum",
        "header" => "header",
        "footer" => "footer",
        "target-notes" => "target-notes",
        "restructuredtext-test-directive" => "restructuredtext-test-directive",
        _ => return None,
    };
    Some(canonical)
}

/// Canonical role name for a (lowercased) localized name.
pub fn role(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "abbreviation" | "ab" => "abbreviation",
        "acronym" | "ac" => "acronym",
        "code" => "code",
        "emphasis" => "emphasis",
        "literal" => "literal",
        "math" => "math",
        "pep-reference" | "pep" => "pep-reference",
        "rfc-reference" | "rfc" => "rfc-reference",
        "strong" => "strong",
        "subscript" | "sub" => "subscript",
        "superscript" | "sup" => "superscript",
        "title-reference" | "title" | "t" => "title-reference",
        "raw" => "raw",
        _ => return None,
    };
    Some(canonical)
}

/// Bibliographic field name (lowercased) to the canonical field.
pub fn bibliographic_field(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "author" => "author",
        "authors" => "authors",
        "organization" => "organization",
        "address" => "address",
        "contact" => "contact",
        "version" => "version",
        "revision" => "revision",
        "status" => "status",
        "date" => "date",
        "copyright" => "copyright",
        "dedication" => "dedication",
        "abstract" => "abstract",
        _ => return None,
    };
    Some(canonical)
}

/// Localized label for a canonical name, used for generated titles.
pub fn label(name: &str) -> &str {
    match name {
        "author" => "Author",
        "authors" => "Authors",
        "organization" => "Organization",
        "address" => "Address",
        "contact" => "Contact",
        "version" => "Version",
        "revision" => "Revision",
        "status" => "Status",
        "date" => "Date",
        "copyright" => "Copyright",
        "dedication" => "Dedication",
        "abstract" => "Abstract",
        "attention" => "Attention!",
        "caution" => "Caution!",
        "danger" => "!DANGER!",
        "error" => "Error",
        "hint" => "Hint",
        "important" => "Important",
        "note" => "Note",
        "tip" => "Tip",
        "warning" => "Warning",
        "contents" => "Contents",
        other => other,
    }
}

/// Separators for author lists in the `authors` field.
pub const AUTHOR_SEPARATORS: &[char] = &[';', ','];
