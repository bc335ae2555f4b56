use serde::{Deserialize, Serialize};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// File-driven mailer configuration.
///
/// ```toml
/// [templates]
/// dir = "emails"
/// default_locale = "en"
/// default_layout = "main"
///
/// [mailgun]
/// key = "key-..."
/// domain = "mg.example.com"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub templates: Templates,
    pub mailgun: Option<Mailgun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Templates {
    pub dir: Option<PathBuf>,
    pub default_locale: String,
    pub default_layout: Option<String>,
}

impl Default for Templates {
    fn default() -> Self {
        Templates {
            dir: None,
            default_locale: crate::mailer::DEFAULT_LOCALE.to_string(),
            default_layout: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mailgun {
    pub key: String,
    pub domain: String,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = Config::from_toml(
            r#"
            [templates]
            dir = "emails"
            default_locale = "sv"
            default_layout = "main"

            [mailgun]
            key = "key-123"
            domain = "mg.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.templates.dir, Some(PathBuf::from("emails")));
        assert_eq!(config.templates.default_locale, "sv");
        assert_eq!(config.templates.default_layout.as_deref(), Some("main"));
        assert_eq!(config.mailgun.unwrap().domain, "mg.example.com");
    }

    #[test]
    fn defaults_apply_when_sections_missing() {
        let config = Config::from_toml("").unwrap();

        assert!(config.templates.dir.is_none());
        assert_eq!(config.templates.default_locale, "en");
        assert!(config.templates.default_layout.is_none());
        assert!(config.mailgun.is_none());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            Config::from_toml("[templates"),
            Err(Error::Config(_))
        ));
    }
}
