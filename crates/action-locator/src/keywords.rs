//! Keyword table for clickable targets
//!
//! Rules are checked in order against the normalized target (lower-cased,
//! quotes stripped); the first rule whose `contains` substring occurs wins.

use serde::{Deserialize, Serialize};
use surface_driver::Query;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Lower-case substring looked for in the target
    pub contains: String,
    pub query: Query,
}

impl KeywordRule {
    pub fn new(contains: impl Into<String>, query: Query) -> Self {
        Self {
            contains: contains.into().to_lowercase(),
            query,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTable {
    rules: Vec<KeywordRule>,
}

impl KeywordTable {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn push(&mut self, rule: KeywordRule) {
        self.rules.push(rule);
    }

    pub fn lookup(&self, target: &str) -> Option<&Query> {
        let normalized = normalize_target(target);
        self.rules
            .iter()
            .find(|rule| {
                let needle = rule.contains.trim().to_lowercase();
                !needle.is_empty() && normalized.contains(&needle)
            })
            .map(|rule| &rule.query)
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::new(vec![
            KeywordRule::new("add to cart", Query::text_within("button", "Add to cart")),
            KeywordRule::new("remove", Query::text_within("button", "Remove")),
            KeywordRule::new("cart", Query::css("a.shopping_cart_link")),
        ])
    }
}

/// Lower-case the target and strip quote characters
pub fn normalize_target(target: &str) -> String {
    target
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`'))
        .collect::<String>()
        .trim()
        .to_lowercase()
}
