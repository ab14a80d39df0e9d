//! Failed-request classification.
//!
//! Maps the method and path of a failed request to a translated message.
//! Rules are evaluated in table order and the first rule whose method and
//! path pattern both match wins; later rules are never consulted. The table
//! author is responsible for ordering overlapping patterns.

use crate::error::ErrorContext;
use crate::i18n::Translate;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Message used when no rule matches.
pub const FALLBACK_MESSAGE: &str = "An error occured during the request! (:url)";

/// Rule key syntax: `"METHOD <spaces> pattern"`.
static RULE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z]+) +(.*)$").expect("valid rule key regex"));

/// Rules for the endpoints the application calls, in precedence order.
const DEFAULT_RULES: &[(&str, &str, &str)] = &[
    ("DELETE", r"^timesheets/\d+$", "Failed to delete the timesheet!"),
    ("PATCH", r"^timesheets/\d+/stop$", "Failed to stop the active timesheet!"),
    ("PATCH", r"^timesheets/\d+$", "Failed to modify the active timesheet!"),
    ("GET", r"^timesheets/active$", "Failed to fetch the active timesheet!"),
    ("GET", r"^timesheets$", "Failed to load the timesheets!"),
    ("POST", r"^timesheets$", "Failed to start recording!"),
    ("GET", r"^projects$", "Failed to load the projects!"),
    ("GET", r"^activities$", "Failed to load the activities!"),
    ("GET", r"^customers/\d+$", "Failed to load the details of the customer!"),
    ("GET", r"^customers$", "Failed to load customers!"),
];

/// One (method, path pattern, message) entry of the rule table.
#[derive(Debug, Clone)]
pub struct ErrorRule {
    method: String,
    pattern: Regex,
    message: String,
}

impl ErrorRule {
    pub fn new(method: &str, pattern: &str, message: impl Into<String>) -> Result<Self> {
        let compiled = Regex::new(pattern).map_err(|e| {
            Error::configuration_with_context(
                "invalid error rule pattern",
                ErrorContext::new()
                    .with_details(format!("{}: {}", pattern, e))
                    .with_source("error_classifier"),
            )
        })?;
        Ok(Self {
            method: method.trim().to_uppercase(),
            pattern: compiled,
            message: message.into(),
        })
    }

    /// Build a rule from a `"METHOD  pattern"` key.
    pub fn parse(key: &str, message: impl Into<String>) -> Result<Self> {
        let caps = RULE_KEY.captures(key).ok_or_else(|| {
            Error::configuration_with_context(
                "malformed error rule key",
                ErrorContext::new()
                    .with_details(key.to_string())
                    .with_source("error_classifier"),
            )
        })?;
        Self::new(&caps[1], &caps[2], message)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `method` must already be upper-cased.
    pub fn matches(&self, path: &str, method: &str) -> bool {
        self.method == method && self.pattern.is_match(path)
    }
}

/// Serialized form of a rule, as found in settings files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRuleSpec {
    pub method: String,
    pub pattern: String,
    pub message: String,
}

impl ErrorRuleSpec {
    pub fn compile(&self) -> Result<ErrorRule> {
        ErrorRule::new(&self.method, &self.pattern, self.message.clone())
    }
}

/// The built-in rule table.
pub fn default_rules() -> Result<Vec<ErrorRule>> {
    DEFAULT_RULES
        .iter()
        .map(|(method, pattern, message)| ErrorRule::new(method, pattern, *message))
        .collect()
}

/// Ordered rule table plus the translator used for its messages.
pub struct ErrorClassifier {
    rules: Vec<ErrorRule>,
    translator: Arc<dyn Translate>,
}

impl ErrorClassifier {
    pub fn new(rules: Vec<ErrorRule>, translator: Arc<dyn Translate>) -> Self {
        Self { rules, translator }
    }

    /// Classifier over [`default_rules`].
    pub fn with_default_rules(translator: Arc<dyn Translate>) -> Result<Self> {
        Ok(Self::new(default_rules()?, translator))
    }

    pub fn rules(&self) -> &[ErrorRule] {
        &self.rules
    }

    /// Translated failure message for a request.
    ///
    /// Only the first `:url` of the translated message is replaced.
    pub fn classify(&self, path: &str, method: &str) -> String {
        let method = method.to_uppercase();
        let template = match self.rules.iter().find(|rule| rule.matches(path, &method)) {
            Some(rule) => self.translator.translate(&rule.message, &[]),
            None => {
                debug!(%method, %path, "no error rule matched");
                self.translator.translate(FALLBACK_MESSAGE, &[])
            }
        };
        template.replacen(":url", path, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{TranslationCatalog, Translator};
    use crate::store::{MemoryStore, Mutation, StateStore};
    use std::collections::HashMap;

    struct Passthrough;

    impl Translate for Passthrough {
        fn translate(&self, key: &str, _vars: &[(&str, &str)]) -> String {
            key.to_string()
        }
    }

    fn classifier() -> ErrorClassifier {
        ErrorClassifier::with_default_rules(Arc::new(Passthrough)).unwrap()
    }

    #[test]
    fn test_default_table_order() {
        let c = classifier();
        assert_eq!(c.rules().len(), 10);
        assert_eq!(c.rules()[0].method(), "DELETE");
        assert_eq!(c.rules()[1].pattern(), r"^timesheets/\d+/stop$");
        assert_eq!(c.rules()[9].message(), "Failed to load customers!");
    }

    #[test]
    fn test_delete_timesheet() {
        assert_eq!(
            classifier().classify("timesheets/42", "DELETE"),
            "Failed to delete the timesheet!"
        );
    }

    #[test]
    fn test_same_path_different_verb() {
        let c = classifier();
        assert_eq!(
            c.classify("timesheets/42", "PATCH"),
            "Failed to modify the active timesheet!"
        );
        assert_eq!(
            c.classify("timesheets/42/stop", "patch"),
            "Failed to stop the active timesheet!"
        );
    }

    #[test]
    fn test_fallback_substitutes_path_once() {
        assert_eq!(
            classifier().classify("unknown/thing", "GET"),
            "An error occured during the request! (unknown/thing)"
        );
        // A path that itself contains `:url` is inserted literally.
        assert_eq!(
            classifier().classify("odd/:url", "PUT"),
            "An error occured during the request! (odd/:url)"
        );
    }

    #[test]
    fn test_method_must_match() {
        assert_eq!(
            classifier().classify("projects", "POST"),
            "An error occured during the request! (projects)"
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            ErrorRule::new("GET", r"^customers", "broad").unwrap(),
            ErrorRule::new("GET", r"^customers/\d+$", "narrow").unwrap(),
        ];
        let c = ErrorClassifier::new(rules, Arc::new(Passthrough));
        assert_eq!(c.classify("customers/7", "GET"), "broad");
    }

    #[test]
    fn test_translated_template_with_url() {
        let store = Arc::new(MemoryStore::new());
        store.commit(Mutation::SetLanguage("en".into()));
        let mut en = HashMap::new();
        en.insert(
            "Failed to load the details of the customer!".to_string(),
            "Failed to load the details of the customer! (:url)".to_string(),
        );
        let catalog = TranslationCatalog::new().with_language("en", en);
        let translator = Arc::new(Translator::new(Arc::new(catalog), store));
        let c = ErrorClassifier::with_default_rules(translator).unwrap();

        assert_eq!(
            c.classify("customers/7", "GET"),
            "Failed to load the details of the customer! (customers/7)"
        );
    }

    #[test]
    fn test_parse_legacy_key() {
        let rule = ErrorRule::parse(r"PATCH  ^timesheets/\d+/stop$", "stop").unwrap();
        assert_eq!(rule.method(), "PATCH");
        assert_eq!(rule.pattern(), r"^timesheets/\d+/stop$");
        assert!(rule.matches("timesheets/1/stop", "PATCH"));

        assert!(ErrorRule::parse("no-pattern", "x").is_err());
        assert!(ErrorRule::parse(r"patch  ^timesheets/\d+$", "x").is_err());
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let err = ErrorRule::new("GET", r"^timesheets/(\d+$", "x").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
