//! `include`, `raw`, `replace`, `unicode`, `class`, `role`,
//! `default-role`, `title` and the test directive.

use std::sync::LazyLock;

use regex::Regex;

use super::body::{number_lines, parse_line_start};
use super::options::{self, Conversion, OptionValue, Options, class_option, py_repr};
use super::{DirectiveHook, Failure, Invocation, OptionSpec, Outcome, Spec, parse_directive_block};
use crate::error::Result;
use crate::nodes::{Attributes, Kind, NodeId, PendingTransform};
use crate::parser::block_parser::BlockParser;
use crate::parser::line_source::{Block, string_to_lines};
use crate::parser::roles::{BaseRole, Role};

pub(super) const INCLUDE_OPTIONS: OptionSpec = &[
    ("literal", Conversion::Flag),
    ("code", Conversion::Unchanged),
    ("encoding", Conversion::Required),
    ("tab-width", Conversion::Int),
    ("start-line", Conversion::Int),
    ("end-line", Conversion::Int),
    ("start-after", Conversion::Required),
    ("end-before", Conversion::Required),
    ("number-lines", Conversion::Unchanged),
    ("class", Conversion::ClassList),
    ("name", Conversion::Unchanged),
];

pub(super) const RAW_OPTIONS: OptionSpec = &[
    ("file", Conversion::Path),
    ("url", Conversion::Uri),
    ("encoding", Conversion::Required),
    ("class", Conversion::ClassList),
];

pub(super) const UNICODE_OPTIONS: OptionSpec = &[
    ("trim", Conversion::Flag),
    ("ltrim", Conversion::Flag),
    ("rtrim", Conversion::Flag),
];

const CLASS_ONLY: OptionSpec = &[("class", Conversion::ClassList)];
const CODE_ROLE_OPTIONS: OptionSpec = &[
    ("class", Conversion::ClassList),
    ("language", Conversion::Unchanged),
];
const RAW_ROLE_OPTIONS: OptionSpec = &[
    ("class", Conversion::ClassList),
    ("format", Conversion::Unchanged),
];

static UNICODE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^| |\n)\.\. ").expect("valid unicode comment regex"));

static ROLE_ARGUMENT: LazyLock<Regex> = LazyLock::new(|| {
    let simplename = r"(?:[[:alnum:]]+(?:[-._+:][[:alnum:]]+)*)";
    Regex::new(&format!(r"^({simplename})\s*(\(\s*({simplename})\s*\)\s*)?$"))
        .expect("valid role argument regex")
});

/// A `replace` directive waiting for its paragraph.
#[derive(Debug, Clone)]
pub(crate) struct ReplaceHook {
    holder: NodeId,
    target: NodeId,
    name: String,
    lineno: usize,
}

/// A `class` directive waiting for the elements it applies to.
#[derive(Debug, Clone)]
pub(crate) struct ClassHook {
    holder: NodeId,
    parent: NodeId,
    classes: Vec<String>,
}

fn substitution_only(inv: &Invocation) -> std::result::Result<(), Failure> {
    if inv.substitution {
        return Ok(());
    }
    Err(inv.error(format!(
        "Invalid context: the \"{}\" directive can only be used within a substitution definition.",
        inv.name
    )))
}

/// `text[start_line..end_line]` by lines, Python slice style.
fn clip_lines(text: &str, start: Option<i64>, end: Option<i64>) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let len = lines.len() as i64;
    let index = |n: i64| -> usize {
        let n = if n < 0 { (len + n).max(0) } else { n.min(len) };
        n as usize
    };
    let from = start.map_or(0, index);
    let to = end.map_or(lines.len(), index);
    if from >= to {
        return String::new();
    }
    lines[from..to].concat()
}

impl BlockParser<'_> {
    pub(super) fn include(&mut self, inv: &Invocation) -> Outcome {
        if !self.doc.settings.file_insertion_enabled {
            return Err(inv.warning(format!("\"{}\" directive disabled.", inv.name)));
        }
        let argument = options::path(inv.argument(0).unwrap_or_default());
        let path = self.resolve_path(&argument);
        let display = path.display().to_string();
        let rawtext = std::fs::read_to_string(&path).map_err(|err| {
            inv.severe(format!(
                "Problems with \"{}\" directive path:\n{err}.",
                inv.name
            ))
        })?;
        log::debug!("Including {display}");

        let start_line = inv.options.int("start-line");
        let end_line = inv.options.int("end-line");
        let mut rawtext = if start_line.is_some() || end_line.is_some() {
            clip_lines(&rawtext, start_line, end_line)
        } else {
            rawtext
        };
        if let Some(after) = inv.options.text("start-after") {
            let Some(index) = rawtext.find(after) else {
                return Err(inv.severe(format!(
                    "Problem with \"start-after\" option of \"{}\" directive:\nText not found.",
                    inv.name
                )));
            };
            rawtext = rawtext[index + after.len()..].to_string();
        }
        if let Some(before) = inv.options.text("end-before") {
            let Some(index) = rawtext.find(before) else {
                return Err(inv.severe(format!(
                    "Problem with \"end-before\" option of \"{}\" directive:\nText not found.",
                    inv.name
                )));
            };
            rawtext.truncate(index);
        }

        let tab_width = inv
            .options
            .int("tab-width")
            .map_or(self.doc.settings.tab_width, |n| n.max(1) as usize);
        let include_lines = string_to_lines(&rawtext, tab_width);

        if inv.options.contains("literal") {
            let node = self.doc.new_element(Kind::LiteralBlock);
            self.doc.set_rawsource(node, rawtext.as_str());
            self.doc.set_line(node, 1);
            self.doc.set_attr(node, "source", display);
            self.add_classes(node, inv.options.classes("class"));
            self.add_name(node, inv)?;
            match inv.options.text("number-lines") {
                Some(start) => {
                    let start = parse_line_start(start).map_err(|m| inv.error(m))?;
                    number_lines(self.doc, node, &include_lines, start);
                }
                None => {
                    let text = self.doc.new_text(include_lines.join("\n"));
                    self.doc.append(node, text);
                }
            }
            return Ok(vec![node]);
        }

        if let Some(language) = inv.options.text("code") {
            let mut code_options = Options::default();
            for key in ["class", "name", "number-lines"] {
                if let Some(value) = inv.options.get(key) {
                    code_options.insert(key, value.clone());
                }
            }
            let code = Invocation {
                arguments: vec![language.to_string()],
                options: code_options,
                content: Block::from_lines(include_lines, 1),
                ..inv.clone()
            };
            let nodes = self.code(&code)?;
            for &node in &nodes {
                self.doc.set_attr(node, "source", display.as_str());
            }
            return Ok(nodes);
        }

        if self.include_log.contains(&path) {
            let chain: Vec<String> = std::iter::once(display.clone())
                .chain(self.include_log.iter().rev().map(|p| p.display().to_string()))
                .chain(std::iter::once(self.doc.settings.source_name().to_string()))
                .collect();
            return Err(inv.warning(format!(
                "circular inclusion in \"{}\" directive:\n{}",
                inv.name,
                chain.join(" < ")
            )));
        }

        let mut lines = include_lines;
        lines.push(String::new());
        lines.push(format!(".. end of inclusion from \"{display}\""));
        self.frame.lines.insert(Block::from_lines(lines, 1));
        self.include_log.push(path);
        Ok(Vec::new())
    }

    pub(super) fn raw_directive(&mut self, inv: &Invocation) -> Outcome {
        let external = inv.options.contains("file") || inv.options.contains("url");
        if !self.doc.settings.raw_enabled
            || (!self.doc.settings.file_insertion_enabled && external)
        {
            return Err(inv.warning(format!("\"{}\" directive disabled.", inv.name)));
        }
        let format = inv
            .argument(0)
            .unwrap_or_default()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let mut source = None;
        let text = if !inv.content.is_empty() {
            if external {
                return Err(inv.error(format!(
                    "\"{}\" directive may not both specify an external file and have content.",
                    inv.name
                )));
            }
            inv.content_text()
        } else if let Some(file) = inv.options.text("file") {
            if inv.options.contains("url") {
                return Err(inv.error(format!(
                    "The \"file\" and \"url\" options may not be simultaneously specified for \
                     the \"{}\" directive.",
                    inv.name
                )));
            }
            let path = self.resolve_path(file);
            let text = std::fs::read_to_string(&path).map_err(|err| {
                inv.severe(format!(
                    "Problems with \"{}\" directive path:\n{err}.",
                    inv.name
                ))
            })?;
            source = Some(path.display().to_string());
            text
        } else if let Some(url) = inv.options.text("url") {
            return Err(inv.severe(format!(
                "Problems with \"{}\" directive URL \"{url}\":\nURL access is not supported.",
                inv.name
            )));
        } else {
            inv.assert_has_content()?;
            String::new()
        };
        let node = self.doc.new_text_element(Kind::Raw, "", &text);
        self.doc.set_attr(node, "format", format);
        self.doc.set_line(node, inv.lineno);
        if let Some(source) = source {
            self.doc.set_attr(node, "source", source);
        }
        self.add_classes(node, inv.options.classes("class"));
        Ok(vec![node])
    }

    pub(super) fn replace(&mut self, inv: &Invocation) -> Outcome {
        substitution_only(inv)?;
        inv.assert_has_content()?;
        let holder = self.doc.new_element(Kind::Container);
        let target = self.frame.parent;
        self.parse_content_then(
            &inv.content,
            holder,
            DirectiveHook::Replace(ReplaceHook {
                holder,
                target,
                name: inv.name.clone(),
                lineno: inv.lineno,
            }),
        );
        Ok(Vec::new())
    }

    pub(super) fn unicode(&mut self, inv: &Invocation) -> Outcome {
        substitution_only(inv)?;
        let definition = self.frame.parent;
        if inv.options.contains("trim") {
            self.doc.set_attr(definition, "ltrim", 1_i64);
            self.doc.set_attr(definition, "rtrim", 1_i64);
        }
        if inv.options.contains("ltrim") {
            self.doc.set_attr(definition, "ltrim", 1_i64);
        }
        if inv.options.contains("rtrim") {
            self.doc.set_attr(definition, "rtrim", 1_i64);
        }
        let argument = inv.argument(0).unwrap_or_default();
        let codes = UNICODE_COMMENT
            .split(argument)
            .next()
            .unwrap_or_default();
        let mut output = Vec::new();
        for code in codes.split_whitespace() {
            let decoded = options::unicode_code(code).map_err(|err| {
                inv.error(format!("Invalid character code: {code}\nValueError: {err}"))
            })?;
            output.push(self.doc.new_text(decoded));
        }
        Ok(output)
    }

    pub(super) fn class_directive(&mut self, inv: &Invocation) -> Outcome {
        let argument = inv.argument(0).unwrap_or_default();
        let classes = class_option(argument).map_err(|_| {
            inv.error(format!(
                "Invalid class attribute value for \"{}\" directive: \"{argument}\".",
                inv.name
            ))
        })?;
        if !inv.content.is_empty() {
            let holder = self.doc.new_element(Kind::Container);
            let parent = self.frame.body_parent();
            self.parse_content_then(
                &inv.content,
                holder,
                DirectiveHook::Class(ClassHook {
                    holder,
                    parent,
                    classes,
                }),
            );
            return Ok(Vec::new());
        }
        let mut details = Attributes::new();
        details.set("class", classes);
        details.set("directive", inv.name.as_str());
        let pending = self.doc.new_pending(PendingTransform::ClassAttribute, details);
        self.doc.set_rawsource(pending, inv.block_text.as_str());
        Ok(vec![pending])
    }

    pub(super) fn role_directive(&mut self, inv: &Invocation) -> Outcome {
        if inv.content.is_empty() || inv.content_offset() > inv.lineno {
            return Err(inv.error(format!(
                "\"{}\" directive requires arguments on the first line.",
                inv.name
            )));
        }
        let args = inv.content.lines[0].as_str();
        let Some(caps) = ROLE_ARGUMENT.captures(args) else {
            return Err(inv.error(format!(
                "\"{}\" directive arguments not valid role names: \"{args}\".",
                inv.name
            )));
        };
        let new_name = caps[1].to_string();
        let mut messages = Vec::new();
        let base = match caps.get(3) {
            Some(base_name) => {
                let (role, more) =
                    self.inliner
                        .roles
                        .lookup(self.doc, base_name.as_str(), inv.lineno)?;
                messages.extend(more);
                match role {
                    Some(role) => role,
                    None => {
                        let literal = self.literal(&inv.block_text);
                        let error = self
                            .doc
                            .error(format!(
                                "Unknown interpreted text role \"{}\".",
                                base_name.as_str()
                            ))
                            .child(literal)
                            .line(inv.lineno)
                            .emit()?;
                        messages.push(error);
                        return Ok(messages);
                    }
                }
            }
            None => Role::new(BaseRole::Generic(Kind::Inline)),
        };

        let option_spec = match base.base {
            BaseRole::Code => CODE_ROLE_OPTIONS,
            BaseRole::Raw => RAW_ROLE_OPTIONS,
            _ => CLASS_ONLY,
        };
        let spec = Spec::new(0, 0, false).options(option_spec);
        let rest = inv.content.slice(1, inv.content.len());
        let mut role_options = match parse_directive_block(&spec, rest, Options::default()) {
            Ok((_, role_options, _)) => role_options,
            Err(detail) => {
                let literal = self.literal(&inv.block_text);
                let error = self
                    .doc
                    .error(format!("Error in \"{}\" directive:\n{detail}.", inv.name))
                    .child(literal)
                    .line(inv.lineno)
                    .emit()?;
                messages.push(error);
                return Ok(messages);
            }
        };
        if !role_options.contains("class") {
            match class_option(&new_name) {
                Ok(classes) => role_options.insert("class", OptionValue::Classes(classes)),
                Err(detail) => {
                    let literal = self.literal(&inv.block_text);
                    let error = self
                        .doc
                        .error(format!(
                            "Invalid argument for \"{}\" directive:\n{detail}.",
                            inv.name
                        ))
                        .child(literal)
                        .line(inv.lineno)
                        .emit()?;
                    messages.push(error);
                    return Ok(messages);
                }
            }
        }
        let role = Role {
            classes: role_options.classes("class").to_vec(),
            language: role_options
                .text("language")
                .map(String::from)
                .or(base.language.clone()),
            format: role_options
                .text("format")
                .map(String::from)
                .or(base.format.clone()),
            base: base.base,
        };
        log::debug!("Registering role {new_name:?}");
        self.inliner.roles.register(&new_name, role);
        Ok(messages)
    }

    pub(super) fn default_role(&mut self, inv: &Invocation) -> Outcome {
        let Some(name) = inv.argument(0) else {
            self.inliner.roles.set_default(None);
            return Ok(Vec::new());
        };
        let (role, mut messages) = self.inliner.roles.lookup(self.doc, name, inv.lineno)?;
        match role {
            Some(role) => self.inliner.roles.set_default(Some(role)),
            None => {
                let literal = self.literal(&inv.block_text);
                let error = self
                    .doc
                    .error(format!("Unknown interpreted text role \"{name}\"."))
                    .child(literal)
                    .line(inv.lineno)
                    .emit()?;
                messages.push(error);
            }
        }
        Ok(messages)
    }

    pub(super) fn title_directive(&mut self, inv: &Invocation) -> Outcome {
        let root = self.doc.root();
        self.doc
            .set_attr(root, "title", inv.argument(0).unwrap_or_default());
        Ok(Vec::new())
    }

    pub(super) fn test_directive(&mut self, inv: &Invocation) -> Outcome {
        let arguments = inv
            .arguments
            .iter()
            .map(|a| py_repr(a))
            .collect::<Vec<_>>()
            .join(", ");
        let options = inv
            .options
            .iter()
            .map(|(k, v)| format!("{}: {}", py_repr(k), v.repr()))
            .collect::<Vec<_>>()
            .join(", ");
        let head = format!(
            "Directive processed. Type=\"{}\", arguments=[{arguments}], options={{{options}}}, content:",
            inv.name
        );
        let info = if inv.content.is_empty() {
            self.doc
                .info(format!("{head} None"))
                .line(inv.lineno)
                .emit()?
        } else {
            let text = inv.content_text();
            let literal = self.literal(&text);
            self.doc.info(head).child(literal).line(inv.lineno).emit()?
        };
        Ok(vec![info])
    }
}

pub(super) fn finish_replace(parser: &mut BlockParser<'_>, hook: ReplaceHook) -> Result<()> {
    let ReplaceHook {
        holder,
        target,
        name,
        lineno,
    } = hook;
    let mut paragraph = None;
    let mut messages = Vec::new();
    for element in parser.doc.take_children(holder) {
        if paragraph.is_none() && parser.doc.is(element, Kind::Paragraph) {
            paragraph = Some(element);
        } else if parser.doc.is(element, Kind::SystemMessage) {
            parser.doc.set_attr(element, "backrefs", Vec::<String>::new());
            messages.push(element);
        } else {
            let error = parser
                .doc
                .error(format!(
                    "Error in \"{name}\" directive: may contain a single paragraph only."
                ))
                .line(lineno)
                .emit()?;
            parser.doc.append(target, error);
            return Ok(());
        }
    }
    parser.doc.extend(target, messages);
    if let Some(paragraph) = paragraph {
        let children = parser.doc.take_children(paragraph);
        parser.doc.extend(target, children);
    }
    Ok(())
}

pub(super) fn finish_class(parser: &mut BlockParser<'_>, hook: ClassHook) -> Result<()> {
    let ClassHook {
        holder,
        parent,
        classes,
    } = hook;
    let children = parser.doc.take_children(holder);
    for &child in &children {
        if !parser.doc.is_text(child) {
            parser.add_classes(child, &classes);
        }
    }
    parser.doc.extend(parent, children);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_lines_follows_slice_semantics() {
        let text = "a\nb\nc\nd\n";
        assert_eq!(clip_lines(text, Some(1), Some(3)), "b\nc\n");
        assert_eq!(clip_lines(text, Some(-2), None), "c\nd\n");
        assert_eq!(clip_lines(text, None, Some(-3)), "a\n");
        assert_eq!(clip_lines(text, Some(3), Some(1)), "");
    }

    #[test]
    fn role_argument_forms() {
        let caps = ROLE_ARGUMENT.captures("custom(emphasis)").unwrap();
        assert_eq!(&caps[1], "custom");
        assert_eq!(&caps[3], "emphasis");
        let caps = ROLE_ARGUMENT.captures("plain").unwrap();
        assert!(caps.get(3).is_none());
        assert!(ROLE_ARGUMENT.captures("two words").is_none());
    }

    #[test]
    fn unicode_argument_stops_at_comment() {
        let codes = UNICODE_COMMENT.split("U+2122 .. trademark sign").next().unwrap();
        assert_eq!(codes.trim(), "U+2122");
    }
}
