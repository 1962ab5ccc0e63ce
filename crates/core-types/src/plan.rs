//! Plan model and text parsing

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;

use crate::action::Action;
use crate::errors::PlanError;

/// Ordered sequence of actions. Insertion order is execution order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    steps: Vec<Action>,
}

impl Plan {
    pub fn new(steps: Vec<Action>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Action] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.steps.iter()
    }

    /// Parse planner output into a non-empty plan.
    ///
    /// Accepts YAML or JSON (YAML being a superset), optionally wrapped in a
    /// markdown code fence. A single mapping becomes a one-step plan and a
    /// mapping holding a `steps` or `plan` list is unwrapped.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        let cleaned = strip_code_fences(text);
        if cleaned.is_empty() {
            return Err(PlanError::Empty);
        }
        let document: YamlValue =
            serde_yaml::from_str(&cleaned).map_err(|err| PlanError::Parse(err.to_string()))?;
        let steps = match normalize_document(document) {
            YamlValue::Null => return Err(PlanError::Empty),
            YamlValue::Sequence(items) => items,
            other => {
                return Err(PlanError::Parse(format!(
                    "expected a list of actions, found {}",
                    describe(&other)
                )))
            }
        };

        let mut actions = Vec::with_capacity(steps.len());
        for (index, step) in steps.into_iter().enumerate() {
            let action: Action = serde_yaml::from_value(step)
                .map_err(|err| PlanError::Parse(format!("step {}: {err}", index + 1)))?;
            actions.push(action);
        }
        if actions.is_empty() {
            return Err(PlanError::Empty);
        }
        Ok(Self::new(actions))
    }

    /// Render the plan as a YAML list
    pub fn to_yaml(&self) -> Result<String, PlanError> {
        serde_yaml::to_string(self).map_err(|err| PlanError::Serialize(err.to_string()))
    }
}

impl From<Vec<Action>> for Plan {
    fn from(steps: Vec<Action>) -> Self {
        Self::new(steps)
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Remove a surrounding markdown fence (```yaml ... ```), keeping the body.
///
/// When prose surrounds the fence only the first fenced block is kept.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let fence = "```";
    let Some(start) = trimmed.find(fence) else {
        return trimmed.to_string();
    };
    let after_fence = &trimmed[start + fence.len()..];
    let body = after_fence.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_');
    let body = match body.find(fence) {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim().to_string()
}

fn normalize_document(document: YamlValue) -> YamlValue {
    match document {
        YamlValue::Mapping(map) => {
            for key in ["steps", "plan"] {
                if let Some(YamlValue::Sequence(items)) = map.get(key) {
                    return YamlValue::Sequence(items.clone());
                }
            }
            YamlValue::Sequence(vec![YamlValue::Mapping(map)])
        }
        other => other,
    }
}

fn describe(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a list",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}
