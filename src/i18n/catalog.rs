use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use super::Language;
use crate::error::{Error, Result};

/// Language-keyed nested string documents.
///
/// ```json
/// { "en-us": { "title": "Hi", "intro": { "description": "..." } },
///   "pt-br": { "title": "Oi", "intro": { "description": "..." } } }
/// ```
#[derive(Debug, Clone)]
pub struct TextCatalog {
    documents: HashMap<Language, Value>,
}

impl TextCatalog {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, Value> = serde_json::from_str(json)?;
        let mut documents = HashMap::with_capacity(raw.len());
        for (code, doc) in raw {
            let language: Language = code.parse()?;
            if !doc.is_object() {
                return Err(Error::Configuration(format!("catalog entry '{code}' is not an object")));
            }
            documents.insert(language, doc);
        }
        if !documents.contains_key(&Language::EnUs) {
            return Err(Error::Configuration("catalog has no en-us document".into()));
        }
        Ok(Self { documents })
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Look up a dotted key path such as `"intro.title"`.
    pub fn resolve(&self, language: Language, path: &str) -> Result<&str> {
        let missing = || Error::MissingText { language, path: path.to_string() };
        let mut node = self.documents.get(&language).ok_or_else(missing)?;
        for key in path.split('.') {
            node = node.get(key).ok_or_else(missing)?;
        }
        node.as_str().ok_or_else(missing)
    }

    /// Every language must provide every string the `en-us` document has.
    pub fn validate(&self) -> Result<()> {
        let mut paths = Vec::new();
        if let Some(reference) = self.documents.get(&Language::EnUs) {
            collect_leaf_paths(reference, String::new(), &mut paths);
        }
        for language in self.documents.keys() {
            for path in &paths {
                self.resolve(*language, path)?;
            }
        }
        Ok(())
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.documents.keys().copied()
    }
}

fn collect_leaf_paths(node: &Value, prefix: String, out: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                collect_leaf_paths(child, path, out);
            }
        }
        _ => out.push(prefix),
    }
}

/// A string bound to a catalog key path, kept in sync with a language.
#[derive(Debug, Clone)]
pub struct LocalizedText {
    catalog: Rc<TextCatalog>,
    path: String,
    language: Language,
    text: String,
}

impl LocalizedText {
    pub fn new(catalog: Rc<TextCatalog>, path: impl Into<String>, language: Language) -> Result<Self> {
        let path = path.into();
        let text = catalog.resolve(language, &path)?.to_string();
        Ok(Self { catalog, path, language, text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Re-resolve for `language`. On error the previous text is kept.
    pub fn on_language_change(&mut self, language: Language) -> Result<()> {
        self.text = self.catalog.resolve(language, &self.path)?.to_string();
        self.language = language;
        Ok(())
    }
}
