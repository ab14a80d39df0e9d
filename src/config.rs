//! Layer settings.
//!
//! Settings come from an optional YAML file and may be overridden by
//! environment variables:
//!
//! - `KIMAI_LOCALE_DIR`: directory holding `<code>.json` catalogs
//! - `KIMAI_STORAGE_DIR`: directory of the persisted state
//! - `KIMAI_LOADING_MODE`: `flag` (default) or `counter`
//! - `KIMAI_PROXY_URL`: proxy for all requests

use crate::classifier::{ErrorRule, ErrorRuleSpec};
use crate::client::signals::LoadingMode;
use crate::error::ErrorContext;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub locale_dir: Option<PathBuf>,
    pub storage_dir: Option<PathBuf>,
    pub loading_mode: LoadingMode,
    pub proxy_url: Option<String>,
    /// Replaces the built-in rule table when present.
    pub error_rules: Option<Vec<ErrorRuleSpec>>,
}

impl Settings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Apply `KIMAI_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `KIMAI_*` overrides from an arbitrary lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup("KIMAI_LOCALE_DIR") {
            self.locale_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("KIMAI_STORAGE_DIR") {
            self.storage_dir = Some(PathBuf::from(dir));
        }
        if let Some(mode) = lookup("KIMAI_LOADING_MODE") {
            self.loading_mode = mode.parse::<LoadingMode>().map_err(|e: String| {
                Error::configuration_with_context(
                    e,
                    ErrorContext::new()
                        .with_field_path("KIMAI_LOADING_MODE")
                        .with_source("settings"),
                )
            })?;
        }
        if let Some(proxy) = lookup("KIMAI_PROXY_URL") {
            self.proxy_url = Some(proxy);
        }
        Ok(self)
    }

    /// Compile the configured rule table, keeping its order.
    pub fn compiled_rules(&self) -> Result<Option<Vec<ErrorRule>>> {
        let Some(specs) = &self.error_rules else {
            return Ok(None);
        };
        specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                spec.compile().map_err(|e| {
                    Error::configuration_with_context(
                        e.to_string(),
                        ErrorContext::new()
                            .with_field_path(format!("error_rules[{}]", i))
                            .with_source("settings"),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const YAML: &str = r#"
locale_dir: ./locale
loading_mode: counter
error_rules:
  - method: get
    pattern: ^tags$
    message: Failed to load the tags!
  - method: DELETE
    pattern: ^tags/\d+$
    message: Failed to delete the tag!
"#;

    #[test]
    fn test_parse_yaml() {
        let settings = Settings::from_yaml_str(YAML).unwrap();
        assert_eq!(settings.locale_dir, Some(PathBuf::from("./locale")));
        assert_eq!(settings.loading_mode, LoadingMode::Counter);
        assert_eq!(settings.storage_dir, None);

        let rules = settings.compiled_rules().unwrap().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].method(), "GET");
        assert!(rules[1].matches("tags/3", "DELETE"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let settings = Settings::from_yaml_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.compiled_rules().unwrap().is_none());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("KIMAI_LOADING_MODE", "counter"),
            ("KIMAI_PROXY_URL", "http://proxy.local:3128"),
            ("KIMAI_STORAGE_DIR", "/var/lib/kimai"),
        ]
        .into_iter()
        .collect();
        let settings = Settings::default()
            .with_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.loading_mode, LoadingMode::Counter);
        assert_eq!(settings.proxy_url.as_deref(), Some("http://proxy.local:3128"));
        assert_eq!(settings.storage_dir, Some(PathBuf::from("/var/lib/kimai")));
    }

    #[test]
    fn test_bad_loading_mode_override() {
        let err = Settings::default()
            .with_overrides(|name| (name == "KIMAI_LOADING_MODE").then(|| "spinner".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_bad_rule_reports_index() {
        let settings = Settings {
            error_rules: Some(vec![
                ErrorRuleSpec {
                    method: "GET".into(),
                    pattern: "^ok$".into(),
                    message: "ok".into(),
                },
                ErrorRuleSpec {
                    method: "GET".into(),
                    pattern: "^(broken$".into(),
                    message: "broken".into(),
                },
            ]),
            ..Settings::default()
        };
        let err = settings.compiled_rules().unwrap_err();
        assert_eq!(
            err.context().unwrap().field_path.as_deref(),
            Some("error_rules[1]")
        );
    }
}
