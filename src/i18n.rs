//! Translatable URLs
//!
//! With URL translation enabled, URLs recorded by the audit layer are kept
//! as translation markers and only resolved against a catalog when they are
//! rendered for a reader.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::config::Config;

/// Lookup of translated URLs by their untranslated form
pub trait UrlCatalog {
    fn lookup(&self, msgid: &str) -> Option<&str>;
}

impl UrlCatalog for HashMap<String, String> {
    fn lookup(&self, msgid: &str) -> Option<&str> {
        self.get(msgid).map(String::as_str)
    }
}

impl UrlCatalog for BTreeMap<String, String> {
    fn lookup(&self, msgid: &str) -> Option<&str> {
        self.get(msgid).map(String::as_str)
    }
}

/// URL waiting to be translated
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TranslatableUrl {
    msgid: String,
}

impl TranslatableUrl {
    pub fn new(msgid: impl Into<String>) -> Self {
        Self {
            msgid: msgid.into(),
        }
    }

    pub fn msgid(&self) -> &str {
        &self.msgid
    }

    /// Resolve against `catalog`, falling back to the untranslated URL
    pub fn translate<C: UrlCatalog + ?Sized>(&self, catalog: &C) -> String {
        catalog.lookup(&self.msgid).unwrap_or(self.msgid.as_str()).to_string()
    }
}

/// Result of [`i18n_url`]
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum LocalizedUrl {
    Plain(String),
    Translatable(TranslatableUrl),
}

impl LocalizedUrl {
    pub fn is_translatable(&self) -> bool {
        matches!(self, LocalizedUrl::Translatable(_))
    }

    /// Render the URL; plain URLs ignore the catalog
    pub fn resolve<C: UrlCatalog + ?Sized>(&self, catalog: &C) -> String {
        match self {
            LocalizedUrl::Plain(url) => url.clone(),
            LocalizedUrl::Translatable(url) => url.translate(catalog),
        }
    }
}

impl fmt::Display for LocalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalizedUrl::Plain(url) => f.write_str(url),
            LocalizedUrl::Translatable(url) => f.write_str(url.msgid()),
        }
    }
}

/// Wrap `url` for translation when `config.translate_urls` is set
pub fn i18n_url(url: impl Into<String>, config: &Config) -> LocalizedUrl {
    let url = url.into();
    if config.translate_urls {
        LocalizedUrl::Translatable(TranslatableUrl::new(url))
    } else {
        LocalizedUrl::Plain(url)
    }
}
