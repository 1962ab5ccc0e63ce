//! Built-in action handlers
//!
//! One handler per DSL kind:
//! - open - navigate, timeouts are soft
//! - find_and_click / fill - locator fallback then interact
//! - press - named keys, or click the target, or Enter in the first field
//! - expect - polled verification, advisory by default
//! - wait_for - fixed pause
//! - mark_completed / delete_todo / clear_completed - todo list helpers

mod expect;
mod interact;
mod navigate;
mod press;
mod todo;
mod wait;

pub use expect::*;
pub use interact::*;
pub use navigate::*;
pub use press::*;
pub use todo::*;
pub use wait::*;

use action_locator::GENERIC_INPUT_SELECTOR;
use surface_driver::{DriverError, ElementRef, Query, SurfaceDriver};
use tracing::debug;

use crate::registry::StepEnv;

/// Pause without failing the step
pub(crate) async fn pause(env: &StepEnv<'_>, millis: u64) {
    if millis == 0 {
        return;
    }
    if let Err(err) = env.surface.wait_millis(millis).await {
        debug!(step = env.step, error = %err, "pause interrupted");
    }
}

/// First visible match of `query` in document order
pub(crate) async fn first_visible(
    surface: &dyn SurfaceDriver,
    query: &Query,
) -> Result<Option<ElementRef>, DriverError> {
    Ok(surface
        .find_candidates(query)
        .await?
        .into_iter()
        .find(|element| element.visible))
}

/// First visible text field, if any
pub(crate) async fn first_text_field(
    surface: &dyn SurfaceDriver,
) -> Result<Option<ElementRef>, DriverError> {
    first_visible(surface, &Query::css(GENERIC_INPUT_SELECTOR)).await
}
