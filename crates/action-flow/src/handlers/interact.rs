use async_trait::async_trait;
use action_locator::CandidateKind;
use softlight_core_types::Action;
use tracing::info;

use crate::errors::StepError;
use crate::handlers::pause;
use crate::registry::{ActionHandler, StepEnv};
use crate::types::StepOutcome;

/// `find_and_click`: resolve a clickable element and click it
pub struct ClickHandler;

#[async_trait]
impl ActionHandler for ClickHandler {
    async fn execute(&self, action: &Action, env: &StepEnv<'_>) -> Result<StepOutcome, StepError> {
        let target = action.target_or_empty();
        let resolution = env
            .resolver
            .resolve(env.surface, target, CandidateKind::Clickable)
            .await?;
        env.surface
            .click(&resolution.element, env.config.click_timeout())
            .await?;
        info!(step = env.step, target, tier = %resolution.tier, "clicked");
        pause(env, env.config.action_delay_ms).await;
        Ok(StepOutcome::Completed)
    }
}

/// `fill`: type the value into a resolved text field.
///
/// An empty or missing value is an explicit no-op.
pub struct FillHandler;

#[async_trait]
impl ActionHandler for FillHandler {
    async fn execute(&self, action: &Action, env: &StepEnv<'_>) -> Result<StepOutcome, StepError> {
        let target = action.target_or_empty();
        let value = action.value().unwrap_or_default();
        if value.is_empty() {
            info!(step = env.step, target, "empty fill value, skipping");
            return Ok(StepOutcome::Skipped(format!("no value to fill into {target}")));
        }

        let resolution = env
            .resolver
            .resolve(env.surface, target, CandidateKind::Fillable)
            .await?;
        env.surface.fill(&resolution.element, value).await?;
        info!(step = env.step, target, tier = %resolution.tier, "filled");
        pause(env, env.config.action_delay_ms).await;
        Ok(StepOutcome::Completed)
    }
}
