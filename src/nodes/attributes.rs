//! Element attribute maps.

use std::collections::BTreeMap;
use std::fmt;

/// Attribute keys whose values are always lists of tokens.
pub const LIST_ATTRIBUTES: &[&str] = &["backrefs", "classes", "dupnames", "ids", "names"];

/// Attribute keys whose values are always integers.
pub const INT_ATTRIBUTES: &[&str] = &[
    "anonymous",
    "colwidth",
    "cols",
    "level",
    "line",
    "ltrim",
    "morecols",
    "morerows",
    "rtrim",
    "scale",
    "start",
    "stub",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    List(Vec<String>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            AttrValue::Str(s) => s.parse().ok(),
            AttrValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            AttrValue::List(items) => items,
            _ => &[],
        }
    }

    /// Parse a serialized value back into the type the key expects.
    pub fn parse_for(key: &str, raw: &str) -> AttrValue {
        if LIST_ATTRIBUTES.contains(&key) {
            AttrValue::List(split_list_value(raw))
        } else if INT_ATTRIBUTES.contains(&key)
            && let Ok(n) = raw.parse()
        {
            AttrValue::Int(n)
        } else if key == "auto"
            && let Ok(n) = raw.parse()
        {
            AttrValue::Int(n)
        } else {
            AttrValue::Str(raw.to_string())
        }
    }
}

impl fmt::Display for AttrValue {
    /// Serialized form: list items are space separated with inner spaces
    /// and backslashes escaped.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => f.write_str(s),
            AttrValue::Int(n) => write!(f, "{n}"),
            AttrValue::List(items) => {
                let joined: Vec<String> = items
                    .iter()
                    .map(|item| item.replace('\\', r"\\").replace(' ', r"\ "))
                    .collect();
                f.write_str(&joined.join(" "))
            }
        }
    }
}

/// Inverse of the list serialization in [`AttrValue`]'s `Display`.
pub fn split_list_value(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ' ' => {
                if !current.is_empty() {
                    items.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

impl From<usize> for AttrValue {
    fn from(n: usize) -> Self {
        AttrValue::Int(n as i64)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(items: Vec<String>) -> Self {
        AttrValue::List(items)
    }
}

/// Lexically ordered attribute map of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(AttrValue::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(AttrValue::as_int)
    }

    /// List value for `key`; empty when unset.
    pub fn list(&self, key: &str) -> &[String] {
        self.0.get(key).map(AttrValue::as_list).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.0.remove(key)
    }

    /// Append `item` to the list attribute `key`, creating it if needed.
    pub fn push(&mut self, key: &str, item: impl Into<String>) {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| AttrValue::List(Vec::new()));
        match entry {
            AttrValue::List(items) => items.push(item.into()),
            other => *other = AttrValue::List(vec![item.into()]),
        }
    }

    /// Mutable access to a list attribute, creating it if needed.
    pub fn list_mut(&mut self, key: &str) -> &mut Vec<String> {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| AttrValue::List(Vec::new()));
        if !matches!(entry, AttrValue::List(_)) {
            *entry = AttrValue::List(Vec::new());
        }
        match entry {
            AttrValue::List(items) => items,
            _ => unreachable!("list attribute was just normalized"),
        }
    }

    /// Iterate the attributes that carry a value; empty lists are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0
            .iter()
            .filter(|(_, v)| !matches!(v, AttrValue::List(items) if items.is_empty()))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_values_escape_spaces() {
        let value = AttrValue::List(vec!["a b".to_string(), "c".to_string()]);
        assert_eq!(value.to_string(), r"a\ b c");
        assert_eq!(split_list_value(r"a\ b c"), vec!["a b", "c"]);
    }

    #[test]
    fn push_creates_list() {
        let mut attrs = Attributes::new();
        attrs.push("names", "intro");
        attrs.push("names", "start");
        assert_eq!(attrs.list("names"), ["intro", "start"]);
        assert!(attrs.list("ids").is_empty());
    }

    #[test]
    fn empty_lists_are_not_iterated() {
        let mut attrs = Attributes::new();
        attrs.list_mut("ids");
        attrs.set("bullet", "-");
        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["bullet"]);
    }

    #[test]
    fn parse_for_uses_key_types() {
        assert_eq!(AttrValue::parse_for("level", "3"), AttrValue::Int(3));
        assert_eq!(AttrValue::parse_for("auto", "*"), AttrValue::Str("*".into()));
        assert_eq!(
            AttrValue::parse_for("ids", "a b"),
            AttrValue::List(vec!["a".into(), "b".into()])
        );
    }
}
