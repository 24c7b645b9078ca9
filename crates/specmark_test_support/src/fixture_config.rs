//! `config.toml` for golden fixtures.

use std::collections::BTreeMap;

use serde::Deserialize;
use specmark::{ConfigError, ParseConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FixtureConfig {
    pub markdown: bool,
    pub css: bool,
    pub biblio: bool,
    pub markdown_escapes: bool,
    pub macros_in_autolinks: bool,
    /// Metadata-style switch list applied after the flags above.
    pub shorthands: Option<String>,
    pub context: Option<String>,
    pub opaque_tags: Option<Vec<String>>,
    pub macros: BTreeMap<String, String>,
}

impl FixtureConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_parse_config(&self) -> Result<ParseConfig, ConfigError> {
        let mut config = ParseConfig {
            markdown: self.markdown,
            css: self.css,
            biblio: self.biblio,
            markdown_escapes: self.markdown_escapes,
            macros_in_autolinks: self.macros_in_autolinks,
            context: self.context.clone(),
            ..ParseConfig::default()
        };
        if let Some(tags) = &self.opaque_tags {
            config = config.with_opaque_tags(tags.iter().cloned());
        }
        for (name, text) in &self.macros {
            config.macros.insert(name, text.as_str());
        }
        match &self.shorthands {
            Some(switches) => config.with_shorthands(switches),
            None => Ok(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_flags_and_macros() {
        let text = r#"
css = true
shorthands = "markdown yes"
opaque-tags = ["pre"]

[macros]
title = "My Spec"
"#;
        let config = FixtureConfig::from_toml(text)
            .unwrap()
            .to_parse_config()
            .unwrap();
        assert!(config.css);
        assert!(config.markdown);
        assert!(config.is_opaque_tag("pre"));
        assert!(!config.is_opaque_tag("xmp"));
        assert_eq!(config.macros.get("title"), Some("My Spec"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(FixtureConfig::from_toml("sparkles = true").is_err());
    }

    #[test]
    fn bad_switches_surface_as_config_errors() {
        let config = FixtureConfig::from_toml(r#"shorthands = "css maybe""#).unwrap();
        assert!(config.to_parse_config().is_err());
    }
}
