//! Element kinds and their capability flags.
//!
//! Every concrete markup concept is one variant of [`Kind`]. Where a class
//! hierarchy would group kinds ("text elements", "invisible", "admonitions"),
//! `Kind` answers a flag query instead.

macro_rules! kinds {
    ($($variant:ident => $tag:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Kind {
            $($variant,)*
        }

        impl Kind {
            /// All kinds, in declaration order.
            pub const ALL: &'static [Kind] = &[$(Kind::$variant,)*];

            /// The element's tag name as used by the writers.
            pub fn tag(self) -> &'static str {
                match self {
                    $(Kind::$variant => $tag,)*
                }
            }

            pub fn from_tag(tag: &str) -> Option<Kind> {
                match tag {
                    $($tag => Some(Kind::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

kinds! {
    Document => "document",
    Section => "section",
    Topic => "topic",
    Sidebar => "sidebar",
    Transition => "transition",
    Decoration => "decoration",
    Header => "header",
    Footer => "footer",
    Docinfo => "docinfo",
    Author => "author",
    Authors => "authors",
    Organization => "organization",
    Address => "address",
    Contact => "contact",
    Version => "version",
    Revision => "revision",
    Status => "status",
    Date => "date",
    Copyright => "copyright",
    Title => "title",
    Subtitle => "subtitle",
    Rubric => "rubric",
    Paragraph => "paragraph",
    Compound => "compound",
    Container => "container",
    BulletList => "bullet_list",
    EnumeratedList => "enumerated_list",
    ListItem => "list_item",
    DefinitionList => "definition_list",
    DefinitionListItem => "definition_list_item",
    Term => "term",
    Classifier => "classifier",
    Definition => "definition",
    FieldList => "field_list",
    Field => "field",
    FieldName => "field_name",
    FieldBody => "field_body",
    OptionList => "option_list",
    OptionListItem => "option_list_item",
    OptionGroup => "option_group",
    CommandOption => "option",
    OptionString => "option_string",
    OptionArgument => "option_argument",
    Description => "description",
    LiteralBlock => "literal_block",
    DoctestBlock => "doctest_block",
    MathBlock => "math_block",
    LineBlock => "line_block",
    Line => "line",
    BlockQuote => "block_quote",
    Attribution => "attribution",
    Attention => "attention",
    Caution => "caution",
    Danger => "danger",
    Error => "error",
    Hint => "hint",
    Important => "important",
    Note => "note",
    Tip => "tip",
    Warning => "warning",
    Admonition => "admonition",
    Comment => "comment",
    SubstitutionDefinition => "substitution_definition",
    Target => "target",
    Footnote => "footnote",
    Citation => "citation",
    Label => "label",
    Figure => "figure",
    Caption => "caption",
    Legend => "legend",
    Image => "image",
    Table => "table",
    Tgroup => "tgroup",
    Colspec => "colspec",
    Thead => "thead",
    Tbody => "tbody",
    Row => "row",
    Entry => "entry",
    SystemMessage => "system_message",
    Pending => "pending",
    Raw => "raw",
    Emphasis => "emphasis",
    Strong => "strong",
    Literal => "literal",
    Reference => "reference",
    FootnoteReference => "footnote_reference",
    CitationReference => "citation_reference",
    SubstitutionReference => "substitution_reference",
    TitleReference => "title_reference",
    Abbreviation => "abbreviation",
    Acronym => "acronym",
    Superscript => "superscript",
    Subscript => "subscript",
    Math => "math",
    Inline => "inline",
    Problematic => "problematic",
    Generated => "generated",
}

const COMMON_ATTRIBUTES: &[&str] = &["classes", "dupnames", "ids", "names"];

impl Kind {
    /// May appear inside a text element. Image, target and raw may also
    /// appear at block level.
    pub fn is_inline(self) -> bool {
        self.is_inline_only() || matches!(self, Kind::Image | Kind::Target | Kind::Raw)
    }

    /// Inline kinds that never appear at block level.
    pub fn is_inline_only(self) -> bool {
        matches!(
            self,
            Kind::Emphasis
                | Kind::Strong
                | Kind::Literal
                | Kind::Reference
                | Kind::FootnoteReference
                | Kind::CitationReference
                | Kind::SubstitutionReference
                | Kind::TitleReference
                | Kind::Abbreviation
                | Kind::Acronym
                | Kind::Superscript
                | Kind::Subscript
                | Kind::Math
                | Kind::Inline
                | Kind::Problematic
                | Kind::Generated
        )
    }

    /// Elements whose children are text and inline elements.
    pub fn is_text_element(self) -> bool {
        self.is_inline_only()
            || matches!(
                self,
                Kind::Paragraph
                    | Kind::Title
                    | Kind::Subtitle
                    | Kind::Rubric
                    | Kind::Attribution
                    | Kind::Term
                    | Kind::Classifier
                    | Kind::Label
                    | Kind::Caption
                    | Kind::Line
                    | Kind::LiteralBlock
                    | Kind::DoctestBlock
                    | Kind::MathBlock
                    | Kind::Comment
                    | Kind::SubstitutionDefinition
                    | Kind::Target
                    | Kind::Raw
                    | Kind::FieldName
                    | Kind::OptionString
                    | Kind::OptionArgument
                    | Kind::Author
                    | Kind::Organization
                    | Kind::Address
                    | Kind::Contact
                    | Kind::Version
                    | Kind::Revision
                    | Kind::Status
                    | Kind::Date
                    | Kind::Copyright
            )
    }

    /// Text elements whose whitespace is significant.
    pub fn is_fixed_text(self) -> bool {
        matches!(
            self,
            Kind::LiteralBlock
                | Kind::DoctestBlock
                | Kind::MathBlock
                | Kind::Comment
                | Kind::Raw
                | Kind::Address
        )
    }

    pub fn is_invisible(self) -> bool {
        matches!(
            self,
            Kind::Comment | Kind::SubstitutionDefinition | Kind::Target | Kind::Pending
        )
    }

    pub fn is_bibliographic(self) -> bool {
        matches!(
            self,
            Kind::Author
                | Kind::Authors
                | Kind::Organization
                | Kind::Address
                | Kind::Contact
                | Kind::Version
                | Kind::Revision
                | Kind::Status
                | Kind::Date
                | Kind::Copyright
        )
    }

    pub fn is_admonition(self) -> bool {
        matches!(
            self,
            Kind::Attention
                | Kind::Caution
                | Kind::Danger
                | Kind::Error
                | Kind::Hint
                | Kind::Important
                | Kind::Note
                | Kind::Tip
                | Kind::Warning
                | Kind::Admonition
        )
    }

    pub fn is_structural(self) -> bool {
        matches!(self, Kind::Section | Kind::Topic | Kind::Sidebar)
    }

    /// Kinds that may precede the document title and docinfo.
    pub fn is_prebibliographic(self) -> bool {
        matches!(
            self,
            Kind::Title
                | Kind::Subtitle
                | Kind::Comment
                | Kind::Pending
                | Kind::Raw
                | Kind::SubstitutionDefinition
                | Kind::Target
                | Kind::SystemMessage
                | Kind::Decoration
        )
    }

    /// Elements carrying a reference that transforms resolve.
    pub fn is_resolvable(self) -> bool {
        matches!(
            self,
            Kind::Reference | Kind::FootnoteReference | Kind::CitationReference | Kind::Pending
        )
    }

    pub fn is_targetable(self) -> bool {
        matches!(
            self,
            Kind::Section | Kind::Topic | Kind::Footnote | Kind::Citation | Kind::Target
        )
    }

    /// The fixed set of attribute keys valid on this kind.
    pub fn valid_attributes(self) -> Vec<&'static str> {
        let extra: &[&str] = match self {
            Kind::Document => &["source", "title"],
            Kind::BulletList => &["bullet"],
            Kind::EnumeratedList => &["enumtype", "prefix", "start", "suffix"],
            Kind::LiteralBlock | Kind::DoctestBlock | Kind::MathBlock | Kind::Comment => {
                &["xml:space"]
            }
            Kind::Address => &["xml:space"],
            Kind::Raw => &["format", "xml:space"],
            Kind::Target => &["anonymous", "refid", "refname", "refuri"],
            Kind::Reference => &["anonymous", "name", "refid", "refname", "refuri"],
            Kind::FootnoteReference => &["auto", "refid", "refname"],
            Kind::CitationReference => &["refid", "refname"],
            Kind::Footnote => &["auto", "backrefs"],
            Kind::Citation => &["backrefs"],
            Kind::SubstitutionDefinition => &["ltrim", "rtrim"],
            Kind::SubstitutionReference => &["refname"],
            Kind::Image => &["align", "alt", "height", "scale", "target", "uri", "width"],
            Kind::Figure => &["align", "width"],
            Kind::Table => &["align", "colsep", "frame", "pgwide", "rowsep", "width"],
            Kind::Tgroup => &["cols"],
            Kind::Colspec => &["colwidth", "stub"],
            Kind::Entry => &["morecols", "morerows"],
            Kind::SystemMessage => &["backrefs", "level", "line", "source", "type"],
            Kind::Problematic => &["refid"],
            Kind::Title => &["auto", "refid"],
            Kind::Generated => &["suffix"],
            Kind::Abbreviation | Kind::Acronym => &["explanation"],
            _ => &[],
        };
        let mut keys: Vec<&'static str> = COMMON_ATTRIBUTES.to_vec();
        keys.extend_from_slice(extra);
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_tag(kind.tag()), Some(*kind));
        }
        assert_eq!(Kind::from_tag("nonsense"), None);
    }

    #[test]
    fn tag_names_are_snake_case() {
        assert_eq!(Kind::BulletList.tag(), "bullet_list");
        assert_eq!(Kind::CommandOption.tag(), "option");
        assert_eq!(Kind::SystemMessage.to_string(), "system_message");
    }

    #[test]
    fn capability_flags() {
        assert!(Kind::Emphasis.is_inline());
        assert!(Kind::Emphasis.is_text_element());
        assert!(Kind::Image.is_inline());
        assert!(!Kind::Image.is_inline_only());
        assert!(Kind::Paragraph.is_text_element());
        assert!(!Kind::Paragraph.is_inline());
        assert!(Kind::Target.is_invisible());
        assert!(Kind::LiteralBlock.is_fixed_text());
        assert!(Kind::Note.is_admonition());
        assert!(Kind::Author.is_bibliographic());
        assert!(Kind::Section.is_structural());
        assert!(!Kind::BulletList.is_text_element());
    }

    #[test]
    fn valid_attributes_include_common_keys() {
        let attrs = Kind::Reference.valid_attributes();
        for key in ["ids", "names", "classes", "dupnames", "refuri", "refname"] {
            assert!(attrs.contains(&key), "missing {key}");
        }
        assert!(!Kind::Paragraph.valid_attributes().contains(&"refuri"));
    }
}
