use crate::diagnostics::DEFAULT_SNIPPET_WIDTH;
use serde::Deserialize;
use std::collections::BTreeMap;

/// What the inheritance merge does when a base or derived element has
/// several children with the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTags {
    /// Fail with a `DuplicateTags` error. (Default)
    #[default]
    Reject,
    /// Keep only the last child of each name. The others are dropped.
    LastWins,
}

/// Settings read from a JSON file. Every field may be omitted.
///
/// ```json
/// { "namespaces": { "ak": "http://ki.ujep.cz/ns/akreditace" },
///   "snippet_width": 120, "duplicate_tags": "last_wins", "destyle": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformerConfig {
    /// Prefix bindings available to every query.
    pub namespaces: BTreeMap<String, String>,
    /// Width of the node snippets in error messages.
    pub snippet_width: usize,
    pub duplicate_tags: DuplicateTags,
    /// Strip `<style>` elements and `style` attributes from the output.
    pub destyle: bool,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            namespaces: BTreeMap::new(),
            snippet_width: DEFAULT_SNIPPET_WIDTH,
            duplicate_tags: DuplicateTags::default(),
            destyle: false,
        }
    }
}

impl TransformerConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
