//! App identity detection
//!
//! The identity names the dataset directory and the session file of a run.
//! It comes from the first `open` target of the plan.

use serde::{Deserialize, Serialize};
use softlight_core_types::{ActionKind, Plan};

/// Identity used when no rule matches
pub const GENERIC_APP: &str = "generic";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRule {
    /// Substring looked for in the lower-cased URL
    pub host_contains: String,
    pub app: String,
}

impl AppRule {
    pub fn new(host_contains: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            host_contains: host_contains.into(),
            app: app.into(),
        }
    }

    pub fn defaults() -> Vec<AppRule> {
        vec![
            AppRule::new("saucedemo", "saucedemo"),
            AppRule::new("todomvc", "todomvc"),
        ]
    }
}

/// Identity of the first rule matching `url`, in rule order
pub fn app_for_url(rules: &[AppRule], url: &str) -> String {
    let url = url.to_lowercase();
    rules
        .iter()
        .find(|rule| {
            let needle = rule.host_contains.trim().to_lowercase();
            !needle.is_empty() && url.contains(&needle)
        })
        .map(|rule| rule.app.clone())
        .unwrap_or_else(|| GENERIC_APP.to_string())
}

/// Identity derived from the plan's first `open` step
pub fn detect_app(rules: &[AppRule], plan: &Plan) -> String {
    plan.iter()
        .find(|action| action.kind() == ActionKind::Open)
        .and_then(|action| action.target())
        .map(|url| app_for_url(rules, url))
        .unwrap_or_else(|| GENERIC_APP.to_string())
}
