//! Interpreted-text roles.
//!
//! Standard roles are looked up by canonical name through the language
//! table. The `role` directive derives new roles from them (adding classes
//! or a format) and `default-role` changes what bare `` `text` `` means.
//! The registry lives on the parser, so each document starts clean.

use std::collections::HashMap;

use super::inline_parser::problematic;
use crate::error::Result;
use crate::languages;
use crate::nodes::{Document, Kind, NodeId};
use crate::utils::{restore_backslashes, unescape};

/// What a role produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BaseRole {
    /// An element of this kind holding the text.
    Generic(Kind),
    Code,
    Math,
    Pep,
    Rfc,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Role {
    pub(crate) base: BaseRole,
    pub(crate) classes: Vec<String>,
    pub(crate) language: Option<String>,
    pub(crate) format: Option<String>,
}

impl Role {
    pub(crate) fn new(base: BaseRole) -> Self {
        Self {
            base,
            classes: Vec::new(),
            language: None,
            format: None,
        }
    }

    /// The role registered under a canonical name.
    pub(crate) fn standard(canonical: &str) -> Option<Self> {
        let base = match canonical {
            "emphasis" => BaseRole::Generic(Kind::Emphasis),
            "strong" => BaseRole::Generic(Kind::Strong),
            "literal" => BaseRole::Generic(Kind::Literal),
            "subscript" => BaseRole::Generic(Kind::Subscript),
            "superscript" => BaseRole::Generic(Kind::Superscript),
            "title-reference" => BaseRole::Generic(Kind::TitleReference),
            "abbreviation" => BaseRole::Generic(Kind::Abbreviation),
            "acronym" => BaseRole::Generic(Kind::Acronym),
            "code" => BaseRole::Code,
            "math" => BaseRole::Math,
            "pep-reference" => BaseRole::Pep,
            "rfc-reference" => BaseRole::Rfc,
            "raw" => BaseRole::Raw,
            _ => return None,
        };
        Some(Self::new(base))
    }

    fn with_classes(&self, doc: &mut Document, node: NodeId) -> NodeId {
        for class in &self.classes {
            doc.push_attr(node, "classes", class.clone());
        }
        node
    }

    /// Build the nodes for one use of the role. `text` is escape-marked;
    /// `rawtext` is the whole markup including the role name.
    pub(crate) fn apply(
        &self,
        doc: &mut Document,
        parent: NodeId,
        name: &str,
        rawtext: &str,
        text: &str,
        lineno: usize,
    ) -> Result<(Vec<NodeId>, Vec<NodeId>)> {
        let node = match &self.base {
            BaseRole::Generic(kind) => {
                let node = doc.new_text_element(*kind, rawtext, &unescape(text));
                self.with_classes(doc, node)
            }
            BaseRole::Code => {
                let node = doc.new_text_element(Kind::Literal, rawtext, &unescape(text));
                doc.push_attr(node, "classes", "code");
                self.with_classes(doc, node);
                if let Some(language) = &self.language
                    && !doc.list(node, "classes").contains(language)
                {
                    doc.push_attr(node, "classes", language.clone());
                }
                node
            }
            BaseRole::Math => {
                let node = doc.new_text_element(Kind::Math, rawtext, &restore_backslashes(text));
                self.with_classes(doc, node)
            }
            BaseRole::Pep => {
                let number = unescape(text);
                let Some(pepnum) = number.parse::<u32>().ok().filter(|n| *n <= 9999) else {
                    return self.invalid(
                        doc,
                        parent,
                        rawtext,
                        format!("PEP number must be a number from 0 to 9999; \"{number}\" is invalid."),
                        lineno,
                    );
                };
                let refuri = format!(
                    "{}{}",
                    doc.settings.pep_base_url,
                    format_number(&doc.settings.pep_file_url_template, pepnum)
                );
                let node = doc.new_text_element(Kind::Reference, rawtext, &format!("PEP {number}"));
                doc.set_attr(node, "refuri", refuri);
                self.with_classes(doc, node)
            }
            BaseRole::Rfc => {
                let unescaped = unescape(text);
                let (number, section) = match unescaped.split_once('#') {
                    Some((number, section)) => (number, Some(section)),
                    None => (unescaped.as_str(), None),
                };
                let Some(rfcnum) = number.parse::<u32>().ok().filter(|n| *n >= 1) else {
                    return self.invalid(
                        doc,
                        parent,
                        rawtext,
                        format!(
                            "RFC number must be a number greater than or equal to 1; \"{unescaped}\" is invalid."
                        ),
                        lineno,
                    );
                };
                let mut refuri = format!("{}rfc{rfcnum}.html", doc.settings.rfc_base_url);
                if let Some(section) = section {
                    refuri.push('#');
                    refuri.push_str(section);
                }
                let node = doc.new_text_element(Kind::Reference, rawtext, &format!("RFC {rfcnum}"));
                doc.set_attr(node, "refuri", refuri);
                self.with_classes(doc, node)
            }
            BaseRole::Raw => {
                if !doc.settings.raw_enabled {
                    let msg = doc
                        .warning("raw (and derived) roles disabled")
                        .line(lineno)
                        .emit()?;
                    let prb = problematic(doc, parent, rawtext, rawtext, msg)?;
                    return Ok((vec![prb], vec![msg]));
                }
                let Some(format) = &self.format else {
                    return self.invalid(
                        doc,
                        parent,
                        rawtext,
                        format!(
                            "No format (Writer name) is associated with this role: \"{name}\".\n\
                             The \"raw\" role cannot be used directly.\n\
                             Instead, use the \"role\" directive to create a new role with an associated format."
                        ),
                        lineno,
                    );
                };
                let node = doc.new_text_element(Kind::Raw, rawtext, &restore_backslashes(text));
                doc.set_attr(node, "format", format.clone());
                self.with_classes(doc, node)
            }
        };
        Ok((vec![node], Vec::new()))
    }

    fn invalid(
        &self,
        doc: &mut Document,
        parent: NodeId,
        rawtext: &str,
        message: String,
        lineno: usize,
    ) -> Result<(Vec<NodeId>, Vec<NodeId>)> {
        let msg = doc.error(message).line(lineno).category("inline").emit()?;
        let prb = problematic(doc, parent, rawtext, rawtext, msg)?;
        Ok((vec![prb], vec![msg]))
    }
}

/// Expand a printf-style `%d` / `%04d` in `template`.
pub(crate) fn format_number(template: &str, n: u32) -> String {
    let Some(pos) = template.find('%') else {
        return format!("{template}{n}");
    };
    let spec = &template[pos + 1..];
    let Some(d) = spec.find('d') else {
        return template.to_string();
    };
    let width = spec[..d].trim_start_matches('0').parse::<usize>().unwrap_or(0);
    let zero = spec.starts_with('0');
    let number = if zero {
        format!("{n:0width$}")
    } else {
        format!("{n:width$}")
    };
    format!("{}{}{}", &template[..pos], number, &spec[d + 1..])
}

/// Roles known to one parse: standard roles resolved so far, roles made by
/// the `role` directive, and the default role.
#[derive(Debug, Clone, Default)]
pub(crate) struct Roles {
    local: HashMap<String, Role>,
    default: Option<Role>,
}

impl Roles {
    pub(crate) fn register(&mut self, name: &str, role: Role) {
        self.local.insert(name.to_lowercase(), role);
    }

    /// Set the role of bare interpreted text; `None` restores
    /// `title-reference`.
    pub(crate) fn set_default(&mut self, role: Option<Role>) {
        self.default = role;
    }

    /// Find the role called `name`. Unknown names yield `None` plus an
    /// info message; the caller reports the error.
    pub(crate) fn lookup(
        &mut self,
        doc: &mut Document,
        name: &str,
        lineno: usize,
    ) -> Result<(Option<Role>, Vec<NodeId>)> {
        let normname = name.to_lowercase();
        if normname.is_empty() {
            let role = self
                .default
                .clone()
                .unwrap_or_else(|| Role::new(BaseRole::Generic(Kind::TitleReference)));
            return Ok((Some(role), Vec::new()));
        }
        if let Some(role) = self.local.get(&normname) {
            return Ok((Some(role.clone()), Vec::new()));
        }
        let mut messages = Vec::new();
        let canonical = match languages::role(&normname) {
            Some(canonical) => canonical.to_string(),
            None => {
                let msg = doc
                    .info(format!(
                        "No role entry for \"{name}\" in language \"{}\".\n\
                         Trying \"{name}\" as canonical role name.",
                        doc.settings.language_code
                    ))
                    .line(lineno)
                    .emit()?;
                messages.push(msg);
                normname.clone()
            }
        };
        let role = Role::standard(&canonical);
        if let Some(role) = &role {
            log::trace!("Registering role {normname:?} as {canonical:?}");
            self.local.insert(normname, role.clone());
        }
        Ok((role, messages))
    }
}
