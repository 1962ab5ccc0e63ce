use async_trait::async_trait;
use action_locator::{CandidateKind, LocatorError};
use softlight_core_types::Action;
use surface_driver::Key;
use tracing::{debug, info};

use crate::errors::StepError;
use crate::handlers::{first_text_field, pause};
use crate::registry::{ActionHandler, StepEnv};
use crate::types::StepOutcome;

/// `press`: keys, buttons named as keys, or Enter as a last resort.
///
/// 1. a key name focuses the first text field (best effort) and presses it
/// 2. otherwise the target is resolved as a clickable element and clicked
/// 3. otherwise Enter is pressed in the first text field; with no field the
///    step fails
pub struct PressHandler;

#[async_trait]
impl ActionHandler for PressHandler {
    async fn execute(&self, action: &Action, env: &StepEnv<'_>) -> Result<StepOutcome, StepError> {
        let target = action.target_or_empty();

        if let Some(key) = Key::from_name(target) {
            match first_text_field(env.surface).await {
                Ok(Some(field)) => {
                    if let Err(err) = env.surface.focus(&field).await {
                        debug!(step = env.step, error = %err, "could not focus field before key press");
                    }
                }
                Ok(None) => debug!(step = env.step, "no text field, pressing key on page"),
                Err(err) => debug!(step = env.step, error = %err, "text field lookup failed"),
            }
            env.surface.press_key(key).await?;
            info!(step = env.step, key = %key, "pressed key");
            pause(env, env.config.action_delay_ms).await;
            return Ok(StepOutcome::Completed);
        }

        match env
            .resolver
            .resolve(env.surface, target, CandidateKind::Clickable)
            .await
        {
            Ok(resolution) => {
                env.surface
                    .click(&resolution.element, env.config.click_timeout())
                    .await?;
                info!(step = env.step, target, tier = %resolution.tier, "pressed by clicking");
            }
            Err(err) => {
                debug!(step = env.step, target, error = %err, "press target not clickable");
                let Some(field) = first_text_field(env.surface).await? else {
                    return Err(StepError::Resolution(LocatorError::not_found(
                        target,
                        CandidateKind::Fillable,
                    )));
                };
                env.surface.focus(&field).await?;
                env.surface.press_key(Key::Enter).await?;
                info!(step = env.step, target, "pressed Enter in first text field");
            }
        }

        pause(env, env.config.action_delay_ms).await;
        Ok(StepOutcome::Completed)
    }
}
