//! Action schema

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::PlanError;

/// Closed set of DSL action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Open,
    FindAndClick,
    Fill,
    Press,
    Expect,
    WaitFor,
    MarkCompleted,
    DeleteTodo,
    ClearCompleted,
}

impl ActionKind {
    /// All kinds in declaration order
    pub const ALL: [ActionKind; 9] = [
        ActionKind::Open,
        ActionKind::FindAndClick,
        ActionKind::Fill,
        ActionKind::Press,
        ActionKind::Expect,
        ActionKind::WaitFor,
        ActionKind::MarkCompleted,
        ActionKind::DeleteTodo,
        ActionKind::ClearCompleted,
    ];

    /// DSL name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Open => "open",
            ActionKind::FindAndClick => "find_and_click",
            ActionKind::Fill => "fill",
            ActionKind::Press => "press",
            ActionKind::Expect => "expect",
            ActionKind::WaitFor => "wait_for",
            ActionKind::MarkCompleted => "mark_completed",
            ActionKind::DeleteTodo => "delete_todo",
            ActionKind::ClearCompleted => "clear_completed",
        }
    }

    /// Whether construction must reject a missing target
    pub fn requires_target(&self) -> bool {
        !matches!(self, ActionKind::WaitFor | ActionKind::ClearCompleted)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One declarative step of a plan.
///
/// Fields are private: an `Action` is immutable once built, and every
/// constructor path (including deserialization) goes through
/// [`Action::try_new`], which trims the target and enforces the per-kind
/// target requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAction", into = "RawAction")]
pub struct Action {
    kind: ActionKind,
    target: Option<String>,
    value: Option<String>,
    extras: BTreeMap<String, Value>,
}

impl Action {
    /// Build a validated action
    pub fn try_new(
        kind: ActionKind,
        target: Option<String>,
        value: Option<String>,
        extras: BTreeMap<String, Value>,
    ) -> Result<Self, PlanError> {
        let target = target
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if kind.requires_target() && target.is_none() {
            return Err(PlanError::MissingTarget(kind));
        }
        Ok(Self {
            kind,
            target,
            value,
            extras,
        })
    }

    /// Convenience constructor for actions without extras
    pub fn new(kind: ActionKind, target: Option<&str>, value: Option<&str>) -> Result<Self, PlanError> {
        Self::try_new(
            kind,
            target.map(str::to_string),
            value.map(str::to_string),
            BTreeMap::new(),
        )
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Target or the empty string
    pub fn target_or_empty(&self) -> &str {
        self.target.as_deref().unwrap_or("")
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn extras(&self) -> &BTreeMap<String, Value> {
        &self.extras
    }

    /// Extra entry interpreted as a millisecond count (e.g. `timeout_ms`)
    pub fn extra_millis(&self, key: &str) -> Option<u64> {
        self.extras.get(key).and_then(Value::as_u64)
    }

    /// Label used to name the capture taken after this action runs.
    pub fn label(&self) -> String {
        let target = self.target_or_empty();
        match self.kind {
            ActionKind::Open => "open".to_string(),
            ActionKind::FindAndClick => format!("click_{target}"),
            ActionKind::Fill => format!("fill_{target}"),
            ActionKind::Press => format!("press_{}", target.to_lowercase()),
            ActionKind::Expect => format!("expect_{target}"),
            ActionKind::WaitFor => "wait_for".to_string(),
            ActionKind::MarkCompleted => format!("mark_{target}"),
            ActionKind::DeleteTodo => format!("delete_{target}"),
            ActionKind::ClearCompleted => "clear_completed".to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.kind, self.target_or_empty())?;
        if let Some(value) = &self.value {
            write!(f, " '{value}'")?;
        }
        Ok(())
    }
}

/// Wire shape of an action.
///
/// `action` is the historical DSL key; `kind` is accepted as an alias.
/// Scalar targets and values (numbers, booleans) are coerced to strings since
/// planners routinely emit `value: 42`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAction {
    #[serde(alias = "kind")]
    action: ActionKind,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    target: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    value: Option<String>,
    #[serde(default, alias = "extra", skip_serializing_if = "Option::is_none")]
    extras: Option<BTreeMap<String, Value>>,
}

impl TryFrom<RawAction> for Action {
    type Error = PlanError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        Action::try_new(
            raw.action,
            raw.target,
            raw.value,
            raw.extras.unwrap_or_default(),
        )
    }
}

impl From<Action> for RawAction {
    fn from(action: Action) -> Self {
        RawAction {
            action: action.kind,
            target: action.target,
            value: action.value,
            extras: if action.extras.is_empty() {
                None
            } else {
                Some(action.extras)
            },
        }
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a scalar, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_trimmed() {
        let action = Action::new(ActionKind::FindAndClick, Some("  Login  "), None).unwrap();
        assert_eq!(action.target(), Some("Login"));
    }

    #[test]
    fn missing_target_is_rejected_for_interactive_kinds() {
        let err = Action::new(ActionKind::Fill, Some("   "), Some("x")).unwrap_err();
        assert_eq!(err, PlanError::MissingTarget(ActionKind::Fill));
        assert!(Action::new(ActionKind::WaitFor, None, None).is_ok());
        assert!(Action::new(ActionKind::ClearCompleted, None, None).is_ok());
    }

    #[test]
    fn unknown_kind_is_rejected_at_parse_time() {
        let err = serde_json::from_str::<Action>(r#"{"action":"teleport","target":"x"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn kind_alias_and_scalar_values_are_accepted() {
        let action: Action =
            serde_json::from_str(r##"{"kind":"fill","target":"#qty","value":3}"##).unwrap();
        assert_eq!(action.kind(), ActionKind::Fill);
        assert_eq!(action.target(), Some("#qty"));
        assert_eq!(action.value(), Some("3"));
    }

    #[test]
    fn extras_accept_legacy_key() {
        let action: Action = serde_json::from_str(
            r#"{"action":"wait_for","extra":{"timeout_ms":250}}"#,
        )
        .unwrap();
        assert_eq!(action.extra_millis("timeout_ms"), Some(250));
    }

    #[test]
    fn labels_follow_kind() {
        let press = Action::new(ActionKind::Press, Some("Enter"), None).unwrap();
        assert_eq!(press.label(), "press_enter");
        let click = Action::new(ActionKind::FindAndClick, Some("#start"), None).unwrap();
        assert_eq!(click.label(), "click_#start");
        let wait = Action::new(ActionKind::WaitFor, Some("spinner"), None).unwrap();
        assert_eq!(wait.label(), "wait_for");
    }

    #[test]
    fn every_kind_has_a_distinct_name() {
        let mut names: Vec<_> = ActionKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ActionKind::ALL.len());
    }
}
