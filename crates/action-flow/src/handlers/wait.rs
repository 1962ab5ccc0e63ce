use async_trait::async_trait;
use softlight_core_types::Action;
use tracing::info;

use crate::errors::StepError;
use crate::handlers::pause;
use crate::registry::{ActionHandler, StepEnv};
use crate::types::StepOutcome;

/// `wait_for`: fixed pause; `timeout_ms` in the extras overrides the default
pub struct WaitHandler;

#[async_trait]
impl ActionHandler for WaitHandler {
    async fn execute(&self, action: &Action, env: &StepEnv<'_>) -> Result<StepOutcome, StepError> {
        let millis = action
            .extra_millis("timeout_ms")
            .unwrap_or(env.config.wait_for_ms);
        pause(env, millis).await;
        info!(step = env.step, millis, reason = action.target_or_empty(), "waited");
        Ok(StepOutcome::Completed)
    }
}
