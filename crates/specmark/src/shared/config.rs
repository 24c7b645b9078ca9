//! Parser configuration.

use std::collections::{BTreeMap, BTreeSet};

use super::error::ConfigError;

/// Tags whose content is never scanned for shorthands or macros.
pub const DEFAULT_OPAQUE_TAGS: &[&str] = &["pre", "xmp", "script", "style"];

/// Text macros, looked up case-insensitively.
///
/// Names are stored as given, so `a` and `A` are separate entries; a call
/// resolves to the lowercase spelling first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MacroTable {
    entries: BTreeMap<String, String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `name`, replacing only an earlier definition with the same spelling.
    pub fn insert(&mut self, name: &str, replacement: impl Into<String>) {
        self.entries.insert(name.to_string(), replacement.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let lower = name.to_ascii_lowercase();
        if let Some(text) = self.entries.get(&lower) {
            return Some(text.as_str());
        }
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, text)| text.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for MacroTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = MacroTable::new();
        for (name, text) in iter {
            table.insert(name.as_ref(), text);
        }
        table
    }
}

/// Configuration for one parse invocation.
///
/// Dialect flags select which shorthand recognizers run. All of them are off
/// by default; `macros_in_autolinks` additionally expands `[NAME]` calls
/// inside autolink data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseConfig {
    pub markdown: bool,
    pub css: bool,
    pub algorithm: bool,
    pub biblio: bool,
    pub cddl: bool,
    pub dfn: bool,
    pub idl: bool,
    pub header: bool,
    pub markdown_escapes: bool,
    pub markup: bool,
    pub repository_links: bool,
    pub macros_in_autolinks: bool,
    pub macros: MacroTable,
    /// Label appended to diagnostic locations (`"3:4 of <context>"`).
    pub context: Option<String>,
    pub opaque_tags: BTreeSet<String>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            markdown: false,
            css: false,
            algorithm: false,
            biblio: false,
            cddl: false,
            dfn: false,
            idl: false,
            header: false,
            markdown_escapes: false,
            markup: false,
            repository_links: false,
            macros_in_autolinks: false,
            macros: MacroTable::new(),
            context: None,
            opaque_tags: DEFAULT_OPAQUE_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl ParseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every dialect on, as a fully-featured document would have it.
    pub fn all_shorthands() -> Self {
        Self {
            markdown: true,
            css: true,
            algorithm: true,
            biblio: true,
            cddl: true,
            dfn: true,
            idl: true,
            header: true,
            markdown_escapes: true,
            markup: true,
            repository_links: true,
            macros_in_autolinks: false,
            ..Self::default()
        }
    }

    pub fn with_macro(mut self, name: &str, replacement: impl Into<String>) -> Self {
        self.macros.insert(name, replacement);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_opaque_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.opaque_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Applies a metadata-style switch list such as `"css no, markdown yes"`.
    ///
    /// Entries are comma separated; each is a dialect name followed by
    /// `yes`/`no`/`on`/`off`/`true`/`false`.
    pub fn with_shorthands(mut self, spec: &str) -> Result<Self, ConfigError> {
        for entry in spec.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                if spec.trim().is_empty() {
                    break;
                }
                return Err(ConfigError::EmptyEntry);
            }
            let mut words = entry.split_whitespace();
            let name = words.next().ok_or(ConfigError::EmptyEntry)?;
            let value = words.collect::<Vec<_>>().join(" ");
            let on = match value.to_ascii_lowercase().as_str() {
                "yes" | "on" | "true" => true,
                "no" | "off" | "false" => false,
                _ => {
                    return Err(ConfigError::BadSwitch {
                        name: name.to_string(),
                        value,
                    });
                }
            };
            *self.flag_mut(name)? = on;
        }
        Ok(self)
    }

    fn flag_mut(&mut self, name: &str) -> Result<&mut bool, ConfigError> {
        let flag = match name.to_ascii_lowercase().as_str() {
            "markdown" => &mut self.markdown,
            "css" => &mut self.css,
            "algorithm" => &mut self.algorithm,
            "biblio" => &mut self.biblio,
            "cddl" => &mut self.cddl,
            "dfn" => &mut self.dfn,
            "idl" => &mut self.idl,
            "http" | "header" => &mut self.header,
            "markdown-escapes" => &mut self.markdown_escapes,
            "markup" => &mut self.markup,
            "repository-links" => &mut self.repository_links,
            "macros-in-autolinks" => &mut self.macros_in_autolinks,
            _ => return Err(ConfigError::UnknownShorthand(name.to_string())),
        };
        Ok(flag)
    }

    pub fn is_opaque_tag(&self, tag: &str) -> bool {
        self.opaque_tags.contains(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_lookup_ignores_case() {
        let table: MacroTable = [("Title", "My Spec")].into_iter().collect();
        assert_eq!(table.get("title"), Some("My Spec"));
        assert_eq!(table.get("TITLE"), Some("My Spec"));
        assert!(!table.contains("status"));
    }

    #[test]
    fn spellings_are_kept_apart() {
        let mut table = MacroTable::new();
        table.insert("a", "one");
        table.insert("A", "two");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("A"), Some("one"));
        assert_eq!(table.get("a"), Some("one"));

        table.insert("a", "three");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("A"), Some("three"));
    }

    #[test]
    fn default_opaque_set() {
        let config = ParseConfig::default();
        for tag in DEFAULT_OPAQUE_TAGS {
            assert!(config.is_opaque_tag(tag));
        }
        assert!(!config.is_opaque_tag("div"));
        assert!(!config.markdown && !config.css);
    }

    #[test]
    fn shorthand_switches() {
        let config = ParseConfig::default()
            .with_shorthands("css yes, markdown on, biblio no, markdown-escapes true")
            .unwrap();
        assert!(config.css);
        assert!(config.markdown);
        assert!(!config.biblio);
        assert!(config.markdown_escapes);

        let off = ParseConfig::all_shorthands()
            .with_shorthands("idl off")
            .unwrap();
        assert!(!off.idl);
        assert!(off.dfn);
        assert!(off.algorithm);

        let repo = ParseConfig::default()
            .with_shorthands("algorithm yes, repository-links yes")
            .unwrap();
        assert!(repo.algorithm);
        assert!(repo.repository_links);
    }

    #[test]
    fn shorthand_errors() {
        assert_eq!(
            ParseConfig::default().with_shorthands("sparkles yes"),
            Err(ConfigError::UnknownShorthand("sparkles".to_string()))
        );
        assert_eq!(
            ParseConfig::default().with_shorthands("css maybe"),
            Err(ConfigError::BadSwitch {
                name: "css".to_string(),
                value: "maybe".to_string()
            })
        );
        assert_eq!(
            ParseConfig::default().with_shorthands("css yes,,markdown no"),
            Err(ConfigError::EmptyEntry)
        );
        assert!(ParseConfig::default().with_shorthands("  ").is_ok());
    }
}
