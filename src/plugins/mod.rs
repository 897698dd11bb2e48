//! # Stock Plugins
//!
//! Plugins shipped with the engine, and the catalog that resolves them by name
//! for configuration files and the CLI.
//!
//! ## Module Structure
//!
//! - **`position`**: byte offsets on every node (`data.position`)
//! - **`stats`**: word/sentence/paragraph counts on the root (`data.stats`)
//! - **`redact`**: masks words matching a regular expression
//! - **`case`**: upper- and lower-casing of words
//!
//! Every catalog entry is a factory from options to a fresh `Plugin`. The
//! processor caches default-option instances by name so that attaching the
//! same name twice is a no-op.

use std::collections::BTreeMap;

use crate::{
    errors::RetextError,
    model::WORD_NODE,
    plugin::Plugin,
    tree::{visit, NodeRef},
};

pub mod case;
pub mod position;
pub mod redact;
pub mod stats;

/// Options for a catalog plugin, as written in configuration.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Builds a plugin from its options.
pub type Factory = fn(&Options) -> Result<Plugin, RetextError>;

#[derive(Debug, Clone, Copy)]
struct CatalogEntry {
    factory: Factory,
    summary: &'static str,
}

/// Name → factory table for plugins that can be attached by name.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl PluginCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The catalog of stock plugins.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        catalog
            .register(position::NAME, "annotate nodes with byte offsets", position::plugin)
            .register(stats::NAME, "count words, sentences and paragraphs", stats::plugin)
            .register(redact::NAME, "mask words matching a pattern", redact::plugin)
            .register(case::UPPERCASE, "upper-case every word", case::uppercase)
            .register(case::LOWERCASE, "lower-case every word", case::lowercase);
        catalog
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        summary: &'static str,
        factory: Factory,
    ) -> &mut Self {
        self.entries
            .insert(name.into(), CatalogEntry { factory, summary });
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Creates a new instance of the named plugin.
    pub fn create(&self, name: &str, options: &Options) -> Result<Plugin, RetextError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| RetextError::InvalidPlugin {
                reason: format!("`{name}` does not name a known plugin"),
            })?;
        (entry.factory)(options)
    }

    pub fn create_default(&self, name: &str) -> Result<Plugin, RetextError> {
        self.create(name, &Options::new())
    }

    /// `(name, summary)` pairs, sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &'static str)> + '_ {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.summary))
    }
}

/// Rewrites every word for which `rewrite` returns a new spelling. Returns the
/// rewritten word nodes.
pub(crate) fn rewrite_words<F>(tree: &NodeRef, mut rewrite: F) -> Result<Vec<NodeRef>, RetextError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut rewritten = Vec::new();
    let mut failure = None;
    visit(tree, Some(WORD_NODE), &mut |word: &NodeRef| {
        let replacement = word.borrow().text().and_then(&mut rewrite);
        if let Some(replacement) = replacement {
            match word.borrow_mut().set_text(replacement) {
                Ok(()) => rewritten.push(word.clone()),
                Err(error) => {
                    failure.get_or_insert(error);
                }
            }
        }
    });
    match failure {
        Some(error) => Err(error),
        None => Ok(rewritten),
    }
}

/// Reads an optional string option.
pub(crate) fn string_option<'a>(
    plugin: &str,
    options: &'a Options,
    key: &str,
) -> Result<Option<&'a str>, RetextError> {
    match options.get(key) {
        None => Ok(None),
        Some(serde_json::Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(RetextError::config(format!(
            "{plugin}: option `{key}` must be a string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_lists_stock_plugins() {
        let catalog = PluginCatalog::standard();
        let names: Vec<&str> = catalog.entries().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["lowercase", "position", "redact", "stats", "uppercase"]
        );
    }

    #[test]
    fn unknown_name_is_an_invalid_plugin() {
        let error = PluginCatalog::standard()
            .create_default("spellcheck")
            .unwrap_err();
        assert!(error.is_guard());
    }

    #[test]
    fn each_create_is_a_new_identity() {
        let catalog = PluginCatalog::standard();
        let a = catalog.create_default("stats").unwrap();
        let b = catalog.create_default("stats").unwrap();
        assert!(!a.same_as(&b));
    }

    #[test]
    fn non_string_option_is_rejected() {
        let mut options = Options::new();
        options.insert("pattern".into(), serde_json::json!(3));
        let error = string_option("redact", &options, "pattern").unwrap_err();
        assert!(matches!(error, RetextError::Config { .. }));
    }
}
