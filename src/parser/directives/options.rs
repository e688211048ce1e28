//! Directive option blocks: a field list right after the arguments, each
//! value run through a converter.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::nodes::make_id;
use crate::parser::block_parser::marker_utils;
use crate::utils::{escape2null, split_escaped_whitespace, unescape};

const LENGTH_UNITS: &[&str] = &["em", "ex", "px", "in", "cm", "mm", "pt", "pc"];

static MEASURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9.]+) *(em|ex|px|in|cm|mm|pt|pc|%)?$").expect("valid measure regex")
});

static UNICODE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:0x|x|\\x|U\+?|\\u)([0-9a-f]+)$|^&#x([0-9a-f]+);$")
        .expect("valid unicode code regex")
});

/// How the text of one option is checked and converted.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Conversion {
    /// No value allowed.
    Flag,
    /// Any text; a missing value becomes empty.
    Unchanged,
    /// Any non-missing text.
    Required,
    /// Lines joined with surrounding whitespace removed.
    Path,
    Uri,
    NonNegativeInt,
    /// A non-negative integer, optionally followed by `%`.
    Percentage,
    Int,
    ClassList,
    /// A length with an optional unit.
    Length,
    /// A length or a percentage.
    LengthOrPercentage,
    Choice(&'static [&'static str]),
    /// `auto`, `grid`, or a list of positive integers.
    Widths,
    /// One character, `tab`, `space`, or a Unicode code.
    Character,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OptionValue {
    Flag,
    Text(String),
    Int(i64),
    Ints(Vec<usize>),
    Classes(Vec<String>),
}

impl OptionValue {
    /// Python-style repr, used by the test directive.
    pub(crate) fn repr(&self) -> String {
        match self {
            OptionValue::Flag => "None".to_string(),
            OptionValue::Text(text) => py_repr(text),
            OptionValue::Int(n) => n.to_string(),
            OptionValue::Ints(items) => format!(
                "[{}]",
                items.iter().map(usize::to_string).collect::<Vec<_>>().join(", ")
            ),
            OptionValue::Classes(items) => format!(
                "[{}]",
                items.iter().map(|s| py_repr(s)).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

pub(crate) fn py_repr(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Option name and conversion pairs accepted by a directive.
pub(crate) type OptionSpec = &'static [(&'static str, Conversion)];

/// Converted options, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Options(BTreeMap<String, OptionValue>);

impl Options {
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: OptionValue) {
        self.0.insert(name.into(), value);
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    pub(crate) fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(OptionValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn int(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(OptionValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub(crate) fn classes(&self, name: &str) -> &[String] {
        match self.0.get(name) {
            Some(OptionValue::Classes(items)) => items,
            _ => &[],
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Split `arg_block` at the first field-marker line: the lines before are
/// arguments, the rest must be a field list of options.
pub(crate) fn split_options(arg_block: &[String]) -> (Vec<String>, Vec<String>) {
    match arg_block
        .iter()
        .position(|line| marker_utils::field_marker(line).is_some())
    {
        Some(i) => (arg_block[..i].to_vec(), arg_block[i..].to_vec()),
        None => (arg_block.to_vec(), Vec::new()),
    }
}

/// One raw field: its name and body text (`None` when empty).
fn parse_fields(block: &[String]) -> Result<Vec<(String, Option<String>)>, String> {
    let mut fields: Vec<(String, Vec<String>)> = Vec::new();
    for line in block {
        if let Some(end) = marker_utils::field_marker(line) {
            let marker = line[..end].trim_end();
            let name = marker[1..marker.len() - 1].to_string();
            let first = line[end..].trim().to_string();
            fields.push((name, vec![first]));
        } else if line.starts_with(' ') || line.trim().is_empty() {
            let Some((_, body)) = fields.last_mut() else {
                return Err("invalid option block".to_string());
            };
            body.push(line.to_string());
        } else {
            return Err("invalid option block".to_string());
        }
    }
    fields
        .into_iter()
        .map(|(name, body)| {
            if name.split_whitespace().count() > 1 {
                return Err("extension option field name may not contain multiple words".into());
            }
            let name = name.to_lowercase();
            let first = &body[0];
            let rest = &body[1..];
            let indent = rest
                .iter()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.len() - l.trim_start().len())
                .min()
                .unwrap_or(0);
            let mut lines: Vec<String> = Vec::new();
            if !first.is_empty() {
                lines.push(first.clone());
            }
            lines.extend(rest.iter().map(|l| l.get(indent..).unwrap_or("").trim_end().to_string()));
            while lines.last().is_some_and(|l| l.is_empty()) {
                lines.pop();
            }
            while lines.first().is_some_and(|l| l.is_empty()) {
                lines.remove(0);
            }
            if lines.iter().any(|l| l.is_empty()) {
                return Err(format!(
                    "extension option field body may contain\na single paragraph only (option \"{name}\")"
                ));
            }
            let value = (!lines.is_empty()).then(|| lines.join("\n"));
            Ok((name, value))
        })
        .collect()
}

/// Parse the option field list against `spec`, on top of `presets`.
pub(crate) fn parse_options(
    spec: OptionSpec,
    block: &[String],
    presets: Options,
) -> Result<Options, String> {
    let mut options = presets;
    let mut seen = Vec::new();
    for (name, value) in parse_fields(block)? {
        let Some((_, conversion)) = spec.iter().find(|(n, _)| *n == name) else {
            return Err(format!("unknown option: \"{name}\""));
        };
        if seen.contains(&name) {
            return Err(format!("invalid option data: duplicate option \"{name}\""));
        }
        let converted = convert(*conversion, value.as_deref()).map_err(|detail| {
            let shown = value.as_deref().map_or("None".to_string(), py_repr);
            format!("invalid option value: (option: \"{name}\"; value: {shown})\n{detail}")
        })?;
        options.insert(name.clone(), converted);
        seen.push(name);
    }
    Ok(options)
}

fn required(value: Option<&str>) -> Result<&str, String> {
    value.ok_or_else(|| "argument required but none supplied".to_string())
}

pub(crate) fn convert(conversion: Conversion, value: Option<&str>) -> Result<OptionValue, String> {
    Ok(match conversion {
        Conversion::Flag => {
            if let Some(text) = value.filter(|v| !v.trim().is_empty()) {
                return Err(format!("no argument is allowed; \"{text}\" supplied"));
            }
            OptionValue::Flag
        }
        Conversion::Unchanged => OptionValue::Text(value.unwrap_or_default().to_string()),
        Conversion::Required => OptionValue::Text(required(value)?.to_string()),
        Conversion::Path => OptionValue::Text(path(required(value)?)),
        Conversion::Uri => OptionValue::Text(uri(required(value)?)),
        Conversion::NonNegativeInt => {
            let n = int(required(value)?)?;
            if n < 0 {
                return Err("negative value; must be positive or zero".into());
            }
            OptionValue::Int(n)
        }
        Conversion::Percentage => {
            let n = int(required(value)?.trim().trim_end_matches('%').trim_end())?;
            if n < 0 {
                return Err("negative value; must be positive or zero".into());
            }
            OptionValue::Int(n)
        }
        Conversion::Int => OptionValue::Int(int(required(value)?)?),
        Conversion::ClassList => OptionValue::Classes(class_option(required(value)?)?),
        Conversion::Length => OptionValue::Text(measure(required(value)?, false)?),
        Conversion::LengthOrPercentage => OptionValue::Text(measure(required(value)?, true)?),
        Conversion::Choice(values) => OptionValue::Text(choice(value, values)?),
        Conversion::Widths => {
            let text = required(value)?;
            match text.trim().to_lowercase().as_str() {
                "auto" | "grid" => OptionValue::Text(text.trim().to_lowercase()),
                _ => OptionValue::Ints(positive_int_list(text)?),
            }
        }
        Conversion::Character => OptionValue::Text(character(required(value)?)?.to_string()),
    })
}

pub(crate) fn path(text: &str) -> String {
    text.lines().map(str::trim).collect()
}

/// Join a possibly wrapped URI; escaped whitespace is kept.
pub(crate) fn uri(text: &str) -> String {
    split_escaped_whitespace(&escape2null(text))
        .iter()
        .map(|part| unescape(part).split_whitespace().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

fn int(text: &str) -> Result<i64, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("invalid literal for int() with base 10: {}", py_repr(text)))
}

fn positive_int_list(text: &str) -> Result<Vec<usize>, String> {
    let parts: Vec<&str> = if text.contains(',') {
        text.split(',').collect()
    } else {
        text.split_whitespace().collect()
    };
    parts
        .into_iter()
        .map(|part| {
            let n = int(part)?;
            if n < 1 {
                return Err("negative or zero value; must be positive".to_string());
            }
            Ok(n as usize)
        })
        .collect()
}

/// Class names from whitespace-separated words, each turned into an id.
pub(crate) fn class_option(text: &str) -> Result<Vec<String>, String> {
    text.split_whitespace()
        .map(|name| {
            let id = make_id(name);
            if id.is_empty() {
                Err(format!("cannot make \"{name}\" into a class name"))
            } else {
                Ok(id)
            }
        })
        .collect()
}

fn measure(text: &str, percentage: bool) -> Result<String, String> {
    let trimmed = text.trim();
    if let Some(caps) = MEASURE.captures(trimmed)
        && caps[1].parse::<f64>().is_ok()
    {
        let unit = caps.get(2).map_or("", |m| m.as_str());
        if unit != "%" || percentage {
            return Ok(format!("{}{unit}", &caps[1]));
        }
    }
    let mut units: Vec<String> = LENGTH_UNITS.iter().map(|u| format!("\"{u}\"")).collect();
    if percentage {
        units.push("\"%\"".to_string());
    }
    units.push("\"\"".to_string());
    Err(format!(
        "not a positive measure of one of the following units:\n{}",
        units.join(" ")
    ))
}

fn format_values(values: &[&str]) -> String {
    match values.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!(
            "{}, or \"{last}\"",
            rest.iter().map(|v| format!("\"{v}\"")).collect::<Vec<_>>().join(", ")
        ),
        Some((last, _)) => format!("\"{last}\""),
        None => String::new(),
    }
}

pub(crate) fn choice(value: Option<&str>, values: &[&str]) -> Result<String, String> {
    let Some(text) = value else {
        return Err(format!(
            "must supply an argument; choose from {}",
            format_values(values)
        ));
    };
    let normalized = text.trim().to_lowercase();
    if values.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(format!("\"{text}\" unknown; choose from {}", format_values(values)))
    }
}

/// Decode a character code (`0x263A`, `U+263A`, `&#x263A;`, decimal) or
/// return the text as-is.
pub(crate) fn unicode_code(code: &str) -> Result<String, String> {
    let code = code.trim();
    let number = if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) {
        code.parse::<u32>().map_err(|e| format!("code too large ({e})"))?
    } else if let Some(caps) = UNICODE_CODE.captures(code) {
        let hex = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        u32::from_str_radix(hex, 16).map_err(|e| format!("code too large ({e})"))?
    } else {
        return Ok(code.to_string());
    };
    char::from_u32(number)
        .map(String::from)
        .ok_or_else(|| format!("code too large ({number:#x} is not a valid character)"))
}

fn character(text: &str) -> Result<char, String> {
    match text.trim() {
        "tab" => return Ok('\t'),
        "space" => return Ok(' '),
        _ => {}
    }
    let decoded = unicode_code(text)?;
    let mut chars = decoded.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!(
            "{} invalid; must be a single character or a Unicode code",
            py_repr(&decoded)
        )),
    }
}
