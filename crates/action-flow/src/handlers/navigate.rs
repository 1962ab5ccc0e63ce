use async_trait::async_trait;
use softlight_core_types::Action;
use tracing::{info, warn};

use crate::errors::StepError;
use crate::handlers::pause;
use crate::registry::{ActionHandler, StepEnv};
use crate::types::StepOutcome;

/// `open`: navigate to the target URL.
///
/// A navigation timeout is soft: the page may still be usable, so the step
/// completes with a warning. Any other navigation error fails the step.
pub struct OpenHandler;

#[async_trait]
impl ActionHandler for OpenHandler {
    async fn execute(&self, action: &Action, env: &StepEnv<'_>) -> Result<StepOutcome, StepError> {
        let url = action.target_or_empty();
        let timeout = action
            .extra_millis("timeout_ms")
            .map(std::time::Duration::from_millis)
            .unwrap_or_else(|| env.config.navigation_timeout());

        match env.surface.navigate(url, timeout).await {
            Ok(()) => info!(step = env.step, url, "opened page"),
            Err(err) if err.is_timeout() => {
                warn!(step = env.step, url, error = %err, "navigation timed out, continuing");
            }
            Err(err) => return Err(err.into()),
        }

        pause(env, env.config.settle_ms).await;
        Ok(StepOutcome::Completed)
    }
}
