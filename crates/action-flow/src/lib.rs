//! Plan execution engine
//!
//! Interprets a [`Plan`](softlight_core_types::Plan) against a live
//! [`SurfaceDriver`](surface_driver::SurfaceDriver):
//! - each action kind is dispatched to a handler from a [`HandlerRegistry`]
//! - every executed step, failed ones included, leaves a capture record
//! - a failed step is sent to the repair oracle and a corrected plan resumes
//!   at the failed index, bounded by the repair budget

pub mod config;
pub mod errors;
pub mod executor;
pub mod handlers;
pub mod oracle;
pub mod registry;
pub mod repair;
pub mod types;

pub use config::{EngineConfig, ExpectPolicy};
pub use errors::{EngineError, OracleError, StepError};
pub use executor::PlanExecutor;
pub use oracle::{PlanningOracle, RepairOracle, RepairRequest, ScriptedOracle};
pub use registry::{ActionHandler, HandlerRegistry, StepEnv};
pub use repair::RepairProtocol;
pub use types::{
    AbortReason, EngineState, RunContext, RunResult, RunStatus, StepOutcome, StepReport,
};
