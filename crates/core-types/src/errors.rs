use thiserror::Error;

use crate::action::ActionKind;

/// Errors raised while building or parsing plans.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    /// The action kind requires a target but none was given
    #[error("action '{0}' requires a target")]
    MissingTarget(ActionKind),

    /// The plan text could not be parsed into actions
    #[error("failed to parse plan: {0}")]
    Parse(String),

    /// The plan text parsed but contained no actions
    #[error("plan contains no actions")]
    Empty,

    /// The plan could not be rendered back to text
    #[error("failed to serialize plan: {0}")]
    Serialize(String),
}
