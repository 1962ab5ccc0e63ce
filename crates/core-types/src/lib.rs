//! Shared primitives for the Softlight execution engine.
//!
//! An [`Action`] is one declarative DSL step and a [`Plan`] is the ordered
//! list of actions the engine interprets. Both are validated at construction
//! so the engine never sees an unknown action kind.

pub mod action;
pub mod errors;
pub mod plan;

pub use action::{Action, ActionKind};
pub use errors::PlanError;
pub use plan::{strip_code_fences, Plan};
