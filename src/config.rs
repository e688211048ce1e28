use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// How footnote references are rendered by writers that care.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FootnoteReferences {
    #[default]
    Brackets,
    Superscript,
}

/// Reporting thresholds for one diagnostic category.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CategoryLevels {
    pub report_level: Option<u8>,
    pub halt_level: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Reporter
    /// Minimum level written to the warning stream.
    pub report_level: u8,
    /// Level at or above which processing halts.
    pub halt_level: u8,
    pub debug: bool,
    /// `None` writes to stderr, `"-"` discards, anything else is a file path.
    pub warning_stream: Option<String>,
    /// Per-category overrides, keyed by category name
    /// (`structure`, `reference`, `inline`, `directive`).
    pub categories: BTreeMap<String, CategoryLevels>,

    // Parser
    pub language_code: String,
    pub tab_width: usize,
    pub trim_footnote_reference_space: bool,
    pub file_insertion_enabled: bool,
    pub raw_enabled: bool,
    pub pep_references: bool,
    pub pep_base_url: String,
    pub pep_file_url_template: String,
    pub rfc_references: bool,
    pub rfc_base_url: String,
    pub character_level_inline_markup: bool,
    /// Base directory for `include` paths; defaults to the input file's directory.
    pub input_dir: Option<PathBuf>,
    pub source: Option<String>,

    // Transforms
    pub doctitle_xform: bool,
    pub docinfo_xform: bool,
    pub sectsubtitle_xform: bool,
    pub sectnum_xform: bool,
    pub footnote_references: FootnoteReferences,
    pub auto_id_prefix: String,
    pub id_prefix: String,
    pub strip_comments: bool,
    pub strip_classes: Vec<String>,
    pub strip_elements_with_classes: Vec<String>,
    pub toc_backlinks: String,
    /// Add a "Generated by" note to the document footer.
    pub generator: bool,
    /// Link to the source in the document footer.
    pub source_url: Option<String>,

    // Writers
    pub expose_internals: Vec<String>,
    pub newlines: bool,
    pub indents: bool,
    pub xml_declaration: bool,
    pub doctype_declaration: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            report_level: 2,
            halt_level: 4,
            debug: false,
            warning_stream: None,
            categories: BTreeMap::new(),
            language_code: "en".to_string(),
            tab_width: 8,
            trim_footnote_reference_space: false,
            file_insertion_enabled: true,
            raw_enabled: true,
            pep_references: false,
            pep_base_url: "https://peps.python.org/".to_string(),
            pep_file_url_template: "pep-%04d".to_string(),
            rfc_references: false,
            rfc_base_url: "https://tools.ietf.org/html/".to_string(),
            character_level_inline_markup: false,
            input_dir: None,
            source: None,
            doctitle_xform: true,
            docinfo_xform: true,
            sectsubtitle_xform: false,
            sectnum_xform: true,
            footnote_references: FootnoteReferences::Brackets,
            auto_id_prefix: "id".to_string(),
            id_prefix: String::new(),
            strip_comments: false,
            strip_classes: Vec::new(),
            strip_elements_with_classes: Vec::new(),
            toc_backlinks: "entry".to_string(),
            generator: false,
            source_url: None,
            expose_internals: Vec::new(),
            newlines: true,
            indents: true,
            xml_declaration: true,
            doctype_declaration: true,
        }
    }
}

impl Settings {
    /// Source name used in diagnostics.
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or("<string>")
    }

    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }
}

#[derive(Default, Clone)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn report_level(mut self, level: u8) -> Self {
        self.settings.report_level = level;
        self
    }

    pub fn halt_level(mut self, level: u8) -> Self {
        self.settings.halt_level = level;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.settings.debug = debug;
        self
    }

    pub fn warning_stream(mut self, stream: impl Into<String>) -> Self {
        self.settings.warning_stream = Some(stream.into());
        self
    }

    pub fn category(mut self, name: impl Into<String>, levels: CategoryLevels) -> Self {
        self.settings.categories.insert(name.into(), levels);
        self
    }

    pub fn tab_width(mut self, width: usize) -> Self {
        self.settings.tab_width = width;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.settings.source = Some(source.into());
        self
    }

    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.input_dir = Some(dir.into());
        self
    }

    pub fn doctitle_xform(mut self, enabled: bool) -> Self {
        self.settings.doctitle_xform = enabled;
        self
    }

    pub fn docinfo_xform(mut self, enabled: bool) -> Self {
        self.settings.docinfo_xform = enabled;
        self
    }

    pub fn sectsubtitle_xform(mut self, enabled: bool) -> Self {
        self.settings.sectsubtitle_xform = enabled;
        self
    }

    pub fn file_insertion_enabled(mut self, enabled: bool) -> Self {
        self.settings.file_insertion_enabled = enabled;
        self
    }

    pub fn raw_enabled(mut self, enabled: bool) -> Self {
        self.settings.raw_enabled = enabled;
        self
    }

    pub fn pep_references(mut self, enabled: bool) -> Self {
        self.settings.pep_references = enabled;
        self
    }

    pub fn rfc_references(mut self, enabled: bool) -> Self {
        self.settings.rfc_references = enabled;
        self
    }

    pub fn trim_footnote_reference_space(mut self, enabled: bool) -> Self {
        self.settings.trim_footnote_reference_space = enabled;
        self
    }

    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.id_prefix = prefix.into();
        self
    }

    pub fn auto_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.auto_id_prefix = prefix.into();
        self
    }

    pub fn strip_comments(mut self, enabled: bool) -> Self {
        self.settings.strip_comments = enabled;
        self
    }

    pub fn strip_classes(mut self, classes: Vec<String>) -> Self {
        self.settings.strip_classes = classes;
        self
    }

    pub fn strip_elements_with_classes(mut self, classes: Vec<String>) -> Self {
        self.settings.strip_elements_with_classes = classes;
        self
    }

    pub fn sectnum_xform(mut self, enabled: bool) -> Self {
        self.settings.sectnum_xform = enabled;
        self
    }

    pub fn toc_backlinks(mut self, backlinks: impl Into<String>) -> Self {
        self.settings.toc_backlinks = backlinks.into();
        self
    }

    pub fn generator(mut self, enabled: bool) -> Self {
        self.settings.generator = enabled;
        self
    }

    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.settings.source_url = Some(url.into());
        self
    }

    pub fn expose_internals(mut self, names: Vec<String>) -> Self {
        self.settings.expose_internals = names;
        self
    }

    pub fn newlines(mut self, enabled: bool) -> Self {
        self.settings.newlines = enabled;
        self
    }

    pub fn indents(mut self, enabled: bool) -> Self {
        self.settings.indents = enabled;
        self
    }

    pub fn xml_declaration(mut self, enabled: bool) -> Self {
        self.settings.xml_declaration = enabled;
        self
    }

    pub fn doctype_declaration(mut self, enabled: bool) -> Self {
        self.settings.doctype_declaration = enabled;
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}

const CANDIDATE_NAMES: &[&str] = &[".restruct.toml", "restruct.toml"];

fn parse_settings_str(s: &str, path: &Path) -> Result<Settings> {
    toml::from_str::<Settings>(s).map_err(|source| Error::Config {
        path: path.to_path_buf(),
        source,
    })
}

fn read_settings(path: &Path) -> Result<Settings> {
    log::debug!("Reading config from: {}", path.display());
    let s = fs::read_to_string(path)?;
    let settings = parse_settings_str(&s, path)?;
    log::info!("Loaded config from: {}", path.display());
    Ok(settings)
}

fn find_in_tree(start_dir: &Path) -> Option<PathBuf> {
    for dir in start_dir.ancestors() {
        for name in CANDIDATE_NAMES {
            let p = dir.join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }
    None
}

fn xdg_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let p = Path::new(&xdg).join("restruct").join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }
    if let Ok(home) = env::var("HOME") {
        let p = Path::new(&home)
            .join(".config")
            .join("restruct")
            .join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }
    None
}

/// Load settings with precedence:
/// 1) explicit path (error if unreadable/invalid)
/// 2) walk up from start_dir: .restruct.toml, restruct.toml
/// 3) XDG: $XDG_CONFIG_HOME/restruct/config.toml or ~/.config/restruct/config.toml
/// 4) default settings
pub fn load(explicit: Option<&Path>, start_dir: &Path) -> Result<(Settings, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let settings = read_settings(path)?;
        return Ok((settings, Some(path.to_path_buf())));
    }

    if let Some(p) = find_in_tree(start_dir) {
        match read_settings(&p) {
            Ok(settings) => return Ok((settings, Some(p))),
            Err(e) => log::warn!("Ignoring config {}: {e}", p.display()),
        }
    }

    if let Some(p) = xdg_config_path()
        && let Ok(settings) = read_settings(&p)
    {
        return Ok((settings, Some(p)));
    }

    log::debug!("No config file found, using defaults");
    Ok((Settings::default(), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = toml::from_str::<Settings>("report_level = 1\n").unwrap();
        assert_eq!(settings.report_level, 1);
        assert_eq!(settings.halt_level, 4);
        assert_eq!(settings.tab_width, 8);
        assert!(settings.doctitle_xform);
        assert_eq!(settings.auto_id_prefix, "id");
    }

    #[test]
    fn categories_deserialize() {
        let toml_str = r#"
            [categories.reference]
            report_level = 4
            halt_level = 5
        "#;
        let settings = toml::from_str::<Settings>(toml_str).unwrap();
        let levels = settings.categories["reference"];
        assert_eq!(levels.report_level, Some(4));
        assert_eq!(levels.halt_level, Some(5));
    }

    #[test]
    fn footnote_reference_style_is_kebab_case() {
        let settings =
            toml::from_str::<Settings>("footnote_references = \"superscript\"\n").unwrap();
        assert_eq!(settings.footnote_references, FootnoteReferences::Superscript);
    }

    #[test]
    fn load_walks_up_from_start_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("restruct.toml"), "tab_width = 4\n").unwrap();

        let (settings, path) = load(None, &nested).unwrap();
        assert_eq!(settings.tab_width, 4);
        assert_eq!(path, Some(dir.path().join("restruct.toml")));
    }

    #[test]
    fn hidden_name_is_preferred() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("restruct.toml"), "tab_width = 4\n").unwrap();
        fs::write(dir.path().join(".restruct.toml"), "tab_width = 2\n").unwrap();

        let (settings, _) = load(None, dir.path()).unwrap();
        assert_eq!(settings.tab_width, 2);
    }

    #[test]
    fn invalid_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "report_level = \"loud\"\n").unwrap();

        let err = load(Some(&path), dir.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn builder_sets_fields() {
        let settings = Settings::builder()
            .report_level(5)
            .doctitle_xform(false)
            .source("input.rst")
            .build();
        assert_eq!(settings.report_level, 5);
        assert!(!settings.doctitle_xform);
        assert_eq!(settings.source_name(), "input.rst");
    }
}
