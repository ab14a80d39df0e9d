//! Message translation.
//!
//! Templates are looked up by their English source text and may contain
//! `:name` placeholders. Substitution is plain text replacement with no
//! escaping, so variable names must be chosen so that no value contains
//! `:other` for another variable of the same call.

use crate::store::StateStore;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Capability to translate a message key.
pub trait Translate: Send + Sync {
    fn translate(&self, key: &str, vars: &[(&str, &str)]) -> String;
}

/// Per-language message catalogs: code -> (key -> template).
#[derive(Debug, Clone, Default)]
pub struct TranslationCatalog {
    languages: HashMap<String, HashMap<String, String>>,
}

impl TranslationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the catalog of one language.
    pub fn insert_language(&mut self, code: impl Into<String>, messages: HashMap<String, String>) {
        self.languages.insert(code.into(), messages);
    }

    pub fn with_language(mut self, code: impl Into<String>, messages: HashMap<String, String>) -> Self {
        self.insert_language(code, messages);
        self
    }

    /// Parse a catalog from a JSON object of key -> template.
    pub fn insert_json(&mut self, code: impl Into<String>, json: &str) -> crate::Result<()> {
        let messages: HashMap<String, String> = serde_json::from_str(json)?;
        self.insert_language(code, messages);
        Ok(())
    }

    pub fn lookup(&self, code: &str, key: &str) -> Option<&str> {
        self.languages
            .get(code)
            .and_then(|messages| messages.get(key))
            .map(String::as_str)
    }

    pub fn has_language(&self, code: &str) -> bool {
        self.languages.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

/// Loads `<dir>/<code>.json` catalogs.
pub struct CatalogLoader {
    base_path: PathBuf,
}

impl CatalogLoader {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Load one catalog per language code.
    ///
    /// Missing or malformed files are skipped; that language then falls
    /// back to untranslated keys.
    pub fn load<'a>(&self, codes: impl IntoIterator<Item = &'a String>) -> TranslationCatalog {
        let mut catalog = TranslationCatalog::new();
        for code in codes {
            let path = self.base_path.join(format!("{}.json", code));
            let loaded = fs::read_to_string(&path)
                .map_err(crate::Error::from)
                .and_then(|json| catalog.insert_json(code.as_str(), &json));
            if let Err(e) = loaded {
                debug!(language = %code, path = %path.display(), error = %e, "catalog not loaded");
            }
        }
        info!(languages = catalog.len(), "translation catalogs loaded");
        catalog
    }
}

/// Translator bound to the store's active language.
pub struct Translator {
    catalog: Arc<TranslationCatalog>,
    store: Arc<dyn StateStore>,
}

impl Translator {
    pub fn new(catalog: Arc<TranslationCatalog>, store: Arc<dyn StateStore>) -> Self {
        Self { catalog, store }
    }
}

impl Translate for Translator {
    fn translate(&self, key: &str, vars: &[(&str, &str)]) -> String {
        let language = self.store.state().language;
        let template = self.catalog.lookup(&language, key).unwrap_or(key);
        interpolate(template, vars)
    }
}

/// Replace every `:name` occurrence for each variable, in order.
pub fn interpolate(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_owned();
    for (name, value) in vars {
        let placeholder = format!(":{}", name);
        result = result.replace(&placeholder, value);
    }
    result
}
