//! `image` and `figure`.

use super::options::{self, Conversion, OptionValue};
use super::{DirectiveHook, Invocation, OptionSpec, Outcome};
use crate::error::Result;
use crate::nodes::{Kind, NodeId, fully_normalize_name, whitespace_normalize_name};
use crate::parser::block_parser::BlockParser;
use crate::parser::block_parser::explicit::{TargetReference, target_reference};
use crate::utils::escape2null;

const ALIGN_H: &[&str] = &["left", "center", "right"];
const ALIGN_V: &[&str] = &["top", "middle", "bottom"];
const ALIGN_ALL: &[&str] = &["top", "middle", "bottom", "left", "center", "right"];

pub(super) const IMAGE_OPTIONS: OptionSpec = &[
    ("alt", Conversion::Unchanged),
    ("height", Conversion::Length),
    ("width", Conversion::LengthOrPercentage),
    ("scale", Conversion::Percentage),
    ("align", Conversion::Choice(ALIGN_ALL)),
    ("target", Conversion::Required),
    ("loading", Conversion::Choice(&["embed", "link", "lazy"])),
    ("class", Conversion::ClassList),
    ("name", Conversion::Unchanged),
];

pub(super) const FIGURE_OPTIONS: OptionSpec = &[
    ("alt", Conversion::Unchanged),
    ("height", Conversion::Length),
    ("width", Conversion::LengthOrPercentage),
    ("scale", Conversion::Percentage),
    ("align", Conversion::Choice(ALIGN_H)),
    ("target", Conversion::Required),
    ("loading", Conversion::Choice(&["embed", "link", "lazy"])),
    ("class", Conversion::ClassList),
    ("name", Conversion::Unchanged),
    ("figwidth", Conversion::Required),
    ("figclass", Conversion::ClassList),
];

/// Attributes copied from options to the `image` node.
const IMAGE_ATTRIBUTES: &[&str] = &["alt", "height", "width", "scale", "align", "loading"];

#[derive(Debug, Clone)]
pub(crate) struct FigureHook {
    figure: NodeId,
    holder: NodeId,
    block_text: String,
    lineno: usize,
}

fn quoted(values: &[&str]) -> String {
    values.join("\", \"")
}

impl BlockParser<'_> {
    pub(super) fn image(&mut self, inv: &Invocation) -> Outcome {
        self.image_nodes(inv, true)
    }

    /// The image (wrapped in a reference with `:target:`), preceded by any
    /// messages.
    fn image_nodes(&mut self, inv: &Invocation, check_align: bool) -> Outcome {
        if check_align && let Some(align) = inv.options.text("align") {
            if inv.substitution {
                if !ALIGN_V.contains(&align) {
                    return Err(inv.error(format!(
                        "Error in \"{}\" directive: \"{align}\" is not a valid value for the \
                         \"align\" option within a substitution definition.  Valid values for \
                         \"align\" are: \"{}\".",
                        inv.name,
                        quoted(ALIGN_V)
                    )));
                }
            } else if !ALIGN_H.contains(&align) {
                return Err(inv.error(format!(
                    "Error in \"{}\" directive: \"{align}\" is not a valid value for the \
                     \"align\" option.  Valid values for \"align\" are: \"{}\".",
                    inv.name,
                    quoted(ALIGN_H)
                )));
            }
        }

        let reference = options::uri(inv.argument(0).unwrap_or_default());
        let mut reference_node = None;
        if let Some(target) = inv.options.text("target") {
            let lines: Vec<String> = escape2null(target).lines().map(String::from).collect();
            let node = self.doc.new_element(Kind::Reference);
            match target_reference(&lines) {
                TargetReference::Refuri(uri) => self.doc.set_attr(node, "refuri", uri),
                TargetReference::Refname(name) => {
                    self.doc.set_attr(node, "refname", fully_normalize_name(&name));
                    self.doc.set_attr(node, "name", whitespace_normalize_name(&name));
                    self.doc.note_refname(node);
                }
            }
            reference_node = Some(node);
        }

        let image = self.doc.new_element(Kind::Image);
        self.doc.set_rawsource(image, inv.block_text.as_str());
        self.doc.set_line(image, inv.lineno);
        self.doc.set_attr(image, "uri", reference);
        for &key in IMAGE_ATTRIBUTES {
            if !check_align && key == "align" {
                continue;
            }
            match inv.options.iter().find(|(name, _)| *name == key) {
                Some((_, OptionValue::Text(text))) => self.doc.set_attr(image, key, text.clone()),
                Some((_, OptionValue::Int(n))) => self.doc.set_attr(image, key, *n),
                _ => {}
            }
        }
        self.add_classes(image, inv.options.classes("class"));
        self.add_name(image, inv)?;
        match reference_node {
            Some(reference) => {
                self.doc.append(reference, image);
                Ok(vec![reference])
            }
            None => Ok(vec![image]),
        }
    }

    pub(super) fn figure(&mut self, inv: &Invocation) -> Outcome {
        let figwidth = match inv.options.text("figwidth") {
            Some("image") | None => None,
            Some(width) => Some(
                match options::convert(Conversion::LengthOrPercentage, Some(width)) {
                    Ok(OptionValue::Text(width)) => width,
                    _ => {
                        return Err(inv.error(format!(
                            "Error in \"{}\" directive:\ninvalid option value: (option: \
                             \"figwidth\"; value: {})",
                            inv.name,
                            options::py_repr(width)
                        )));
                    }
                },
            ),
        };
        let image = self.image_nodes(inv, false)?;
        let figure = self.doc.new_element_with(Kind::Figure, image);
        self.doc.set_line(figure, inv.lineno);
        if let Some(width) = figwidth {
            self.doc.set_attr(figure, "width", width);
        }
        self.add_classes(figure, inv.options.classes("figclass"));
        if let Some(align) = inv.options.text("align") {
            self.doc.set_attr(figure, "align", align);
        }
        if !inv.content.is_empty() {
            let holder = self.doc.new_element(Kind::Container);
            self.parse_content_then(
                &inv.content,
                holder,
                DirectiveHook::Figure(FigureHook {
                    figure,
                    holder,
                    block_text: inv.block_text.clone(),
                    lineno: inv.lineno,
                }),
            );
        }
        Ok(vec![figure])
    }
}

/// First paragraph of the content becomes the caption, the rest the legend.
pub(super) fn finish_figure(parser: &mut BlockParser<'_>, hook: FigureHook) -> Result<()> {
    let FigureHook {
        figure,
        holder,
        block_text,
        lineno,
    } = hook;
    let children = parser.doc.take_children(holder);
    let Some((&first, rest)) = children.split_first() else {
        return Ok(());
    };
    if parser.doc.is(first, Kind::Paragraph) {
        let inline = parser.doc.take_children(first);
        let caption = parser.doc.new_element_with(Kind::Caption, inline);
        let rawsource = parser.doc.rawsource(first).to_string();
        parser.doc.set_rawsource(caption, rawsource);
        if let Some(line) = parser.doc.line(first) {
            parser.doc.set_line(caption, line);
        }
        parser.doc.append(figure, caption);
    } else if !(parser.doc.is(first, Kind::Comment) && parser.doc.children(first).is_empty()) {
        let literal = parser.literal(&block_text);
        let error = parser
            .doc
            .error("Figure caption must be a paragraph or empty comment.")
            .child(literal)
            .line(lineno)
            .emit()?;
        if let Some(parent) = parser.doc.parent(figure)
            && let Some(index) = parser.doc.index_in_parent(figure)
        {
            parser.doc.insert(parent, index + 1, error);
        }
        return Ok(());
    }
    if !rest.is_empty() {
        let legend = parser.doc.new_element_with(Kind::Legend, rest.to_vec());
        parser.doc.append(figure, legend);
    }
    Ok(())
}
