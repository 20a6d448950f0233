//! Host-owned lookup of languages by name.
//!
//! The engine itself never consults a registry; hosts that pick a grammar by
//! name (a file extension, an injection tag) keep one and pass the resolved
//! [`Language`] to the parser.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::table::Language;

#[derive(Debug, Default)]
pub struct LanguageRegistry {
    languages: RwLock<FxHashMap<SmolStr, Language>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `language` under `name`, returning whatever it replaced.
    pub fn register(&self, name: impl Into<SmolStr>, language: Language) -> Option<Language> {
        self.languages.write().insert(name.into(), language)
    }

    pub fn get(&self, name: &str) -> Option<Language> {
        self.languages.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Language> {
        self.languages.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.languages.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<SmolStr> {
        let mut names: Vec<_> = self.languages.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.languages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.read().is_empty()
    }
}
