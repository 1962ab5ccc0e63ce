//! Plan executor: the step loop, capture after every step, bounded repair

use std::sync::Arc;

use action_locator::ElementResolver;
use softlight_core_types::{Action, Plan};
use softlight_snapshot_store::{CaptureRecord, CaptureStatus, CaptureStore};
use surface_driver::SurfaceDriver;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::errors::StepError;
use crate::oracle::{RepairOracle, RepairRequest};
use crate::registry::{HandlerRegistry, StepEnv};
use crate::repair::RepairProtocol;
use crate::types::{
    AbortReason, EngineState, RunContext, RunResult, RunStatus, StepOutcome, StepReport,
};

/// Interprets plans one step at a time.
///
/// The executor owns the cursor and the plan in force. A failed step is
/// captured, then handed to the repair protocol; an accepted repair replaces
/// the whole plan and the same cursor position runs again. Completed steps
/// before the cursor are never re-executed.
pub struct PlanExecutor {
    registry: HandlerRegistry,
    resolver: Arc<dyn ElementResolver>,
    repair: RepairProtocol,
    config: EngineConfig,
}

struct Failure {
    step: usize,
    action: Action,
    error: StepError,
}

impl PlanExecutor {
    pub fn new(
        config: EngineConfig,
        resolver: Arc<dyn ElementResolver>,
        oracle: Option<Arc<dyn RepairOracle>>,
    ) -> Self {
        let repair = RepairProtocol::new(oracle, config.oracle_timeout());
        Self {
            registry: HandlerRegistry::standard(),
            resolver,
            repair,
            config,
        }
    }

    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run `plan` to a terminal state. Never fails: every outcome, including
    /// an aborted run, is reported through [`RunResult`].
    pub async fn run(&self, plan: Plan, ctx: RunContext) -> RunResult {
        let RunContext {
            app,
            surface,
            mut store,
            max_repairs,
        } = ctx;

        info!(app = %app, steps = plan.len(), max_repairs, "starting run");
        save_plan(&store, "plan.yaml", &plan);

        let mut plan = plan;
        let mut cursor = 0usize;
        let mut repairs = 0u32;
        let mut state = EngineState::Running;
        let mut abort_reason = None;
        let mut failure: Option<Failure> = None;
        let mut steps = Vec::new();

        let status = loop {
            match state {
                EngineState::Running => {
                    let Some(action) = plan.get(cursor).cloned() else {
                        state = EngineState::Terminated(RunStatus::Success);
                        continue;
                    };
                    let step = cursor + 1;
                    info!(step, kind = %action.kind(), target = action.target_or_empty(), "executing step");

                    match self.execute_step(&action, surface.as_ref(), step).await {
                        Ok(outcome) => {
                            self.capture(&mut store, surface.as_ref(), step, &action.label(), CaptureStatus::Ok)
                                .await;
                            steps.push(StepReport {
                                step,
                                kind: action.kind(),
                                label: action.label(),
                                revision: repairs,
                                outcome: Ok(outcome),
                            });
                            cursor += 1;
                        }
                        Err(err) => {
                            warn!(step, kind = %action.kind(), category = err.category(), error = %err, "step failed");
                            let label = format!("error_{}", action.kind());
                            self.capture(&mut store, surface.as_ref(), step, &label, CaptureStatus::Failed)
                                .await;
                            steps.push(StepReport {
                                step,
                                kind: action.kind(),
                                label,
                                revision: repairs,
                                outcome: Err(err.to_string()),
                            });
                            failure = Some(Failure {
                                step,
                                action,
                                error: err,
                            });
                            state = EngineState::Repairing;
                        }
                    }
                }
                EngineState::Repairing => {
                    let Some(failed) = failure.take() else {
                        state = EngineState::Running;
                        continue;
                    };
                    if repairs >= max_repairs {
                        error!(step = failed.step, max_repairs, "repair budget exhausted");
                        abort_reason = Some(AbortReason::RepairBudgetExhausted { max_repairs });
                        state = EngineState::Terminated(RunStatus::Aborted);
                        continue;
                    }

                    let request = RepairRequest {
                        attempt: repairs + 1,
                        app: app.clone(),
                        failed_step: failed.step,
                        action: failed.action,
                        error: failed.error.to_string(),
                        plan: plan.clone(),
                    };
                    match self.repair.attempt(request).await {
                        Ok(repaired) => {
                            repairs += 1;
                            info!(
                                attempt = repairs,
                                step = failed.step,
                                steps = repaired.len(),
                                "plan replaced, retrying step"
                            );
                            save_plan(&store, &format!("repair_{repairs:02}.yaml"), &repaired);
                            plan = repaired;
                            state = EngineState::Running;
                        }
                        Err(reason) => {
                            error!(step = failed.step, reason = %reason, "repair failed, aborting run");
                            abort_reason = Some(reason);
                            state = EngineState::Terminated(RunStatus::Aborted);
                        }
                    }
                }
                EngineState::Terminated(status) => break status,
            }
        };

        let summary_path = match store.write_summary() {
            Ok(path) => Some(path),
            Err(err) => {
                error!(error = %err, "could not write run summary");
                None
            }
        };

        info!(
            app = %app,
            status = %status,
            steps = steps.len(),
            repairs,
            run_dir = %store.run_dir().display(),
            "run finished"
        );

        let run_dir = store.run_dir().to_path_buf();
        RunResult {
            status,
            abort_reason,
            records: store.into_records(),
            steps,
            repairs,
            plan,
            run_dir,
            summary_path,
        }
    }

    async fn execute_step(
        &self,
        action: &Action,
        surface: &dyn SurfaceDriver,
        step: usize,
    ) -> Result<StepOutcome, StepError> {
        let Some(handler) = self.registry.get(action.kind()) else {
            warn!(step, kind = %action.kind(), "no handler registered, skipping");
            return Ok(StepOutcome::Skipped(format!(
                "no handler for {}",
                action.kind()
            )));
        };
        let env = StepEnv {
            surface,
            resolver: self.resolver.as_ref(),
            config: &self.config,
            step,
        };
        handler.execute(action, &env).await
    }

    /// Capture is observational; a failed write is logged and the run goes on
    async fn capture(
        &self,
        store: &mut CaptureStore,
        surface: &dyn SurfaceDriver,
        step: usize,
        label: &str,
        status: CaptureStatus,
    ) -> Option<CaptureRecord> {
        match store.capture(surface, step, label, status).await {
            Ok(record) => Some(record),
            Err(err) => {
                error!(step, label, error = %err, "state capture failed");
                None
            }
        }
    }
}

fn save_plan(store: &CaptureStore, name: &str, plan: &Plan) {
    let yaml = match plan.to_yaml() {
        Ok(yaml) => yaml,
        Err(err) => {
            warn!(error = %err, "could not render plan");
            return;
        }
    };
    match store.write_artifact(name, yaml.as_bytes()) {
        Ok(path) => debug!(path = %path.display(), "saved plan"),
        Err(err) => warn!(name, error = %err, "could not save plan"),
    }
}
