//! Core types for plan execution

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use softlight_core_types::{ActionKind, Plan};
use softlight_snapshot_store::{CaptureRecord, CaptureStore};
use surface_driver::SurfaceDriver;

use crate::errors::EngineError;

/// How a step that did not error ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,

    /// Deliberate no-op (empty fill value, unregistered kind)
    Skipped(String),

    /// Expectation could not be confirmed; advisory only
    Unverified(String),
}

impl StepOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            StepOutcome::Completed => "completed",
            StepOutcome::Skipped(_) => "skipped",
            StepOutcome::Unverified(_) => "unverified",
        }
    }
}

/// One executed step as seen by the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// 1-based step number
    pub step: usize,
    pub kind: ActionKind,
    pub label: String,
    /// Plan revision the step ran under (0 = initial plan)
    pub revision: u32,
    pub outcome: Result<StepOutcome, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => f.write_str("success"),
            RunStatus::Aborted => f.write_str("aborted"),
        }
    }
}

/// Why a run stopped before the end of its plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Repair counter already at the budget; the oracle was not consulted
    RepairBudgetExhausted { max_repairs: u32 },
    NoRepairOracle,
    OracleFailed(String),
    OracleTimedOut,
    EmptyResponse,
    MalformedPlan(String),
    /// Corrected plan equal to the failing one
    IdenticalPlan,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::RepairBudgetExhausted { max_repairs } => {
                write!(f, "repair budget of {max_repairs} exhausted")
            }
            AbortReason::NoRepairOracle => f.write_str("no repair oracle configured"),
            AbortReason::OracleFailed(err) => write!(f, "repair oracle failed: {err}"),
            AbortReason::OracleTimedOut => f.write_str("repair oracle timed out"),
            AbortReason::EmptyResponse => f.write_str("repair oracle returned nothing"),
            AbortReason::MalformedPlan(err) => write!(f, "repaired plan rejected: {err}"),
            AbortReason::IdenticalPlan => f.write_str("repair returned the identical plan"),
        }
    }
}

/// Engine state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Repairing,
    Terminated(RunStatus),
}

/// Everything one run needs besides the plan
pub struct RunContext {
    pub app: String,
    pub surface: Arc<dyn SurfaceDriver>,
    pub store: CaptureStore,
    pub max_repairs: u32,
}

impl RunContext {
    pub fn new(
        app: impl Into<String>,
        surface: Arc<dyn SurfaceDriver>,
        store: CaptureStore,
        max_repairs: u32,
    ) -> Self {
        Self {
            app: app.into(),
            surface,
            store,
            max_repairs,
        }
    }

    /// Context with a fresh capture run under `<dataset_dir>/<app>/`
    pub fn create(
        app: impl Into<String>,
        surface: Arc<dyn SurfaceDriver>,
        dataset_dir: &Path,
        max_repairs: u32,
    ) -> Result<Self, EngineError> {
        let app = app.into();
        let store = CaptureStore::create(dataset_dir, &app)?;
        Ok(Self::new(app, surface, store, max_repairs))
    }
}

/// Final state of a run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub status: RunStatus,
    pub abort_reason: Option<AbortReason>,
    /// Capture records in the order they were taken
    pub records: Vec<CaptureRecord>,
    pub steps: Vec<StepReport>,
    /// Plan substitutions performed
    pub repairs: u32,
    /// Plan in force when the run ended
    pub plan: Plan,
    pub run_dir: PathBuf,
    pub summary_path: Option<PathBuf>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn unverified(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|report| matches!(report.outcome, Ok(StepOutcome::Unverified(_))))
    }
}
