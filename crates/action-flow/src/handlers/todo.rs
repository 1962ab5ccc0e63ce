use async_trait::async_trait;
use action_locator::{CandidateKind, LocatorError};
use softlight_core_types::Action;
use surface_driver::{ElementRef, Query, SurfaceDriver};
use tracing::info;

use crate::errors::StepError;
use crate::handlers::{first_visible, pause};
use crate::registry::{ActionHandler, StepEnv};
use crate::types::StepOutcome;

const TODO_ITEMS: &str = "ul.todo-list li";
const TOGGLE: &str = "input.toggle";
const DESTROY: &str = "button.destroy";
const DELETE_PAUSE_MS: u64 = 300;

/// Todo list entry whose text is exactly `label`
pub fn todo_item(label: &str) -> Query {
    Query::has(TODO_ITEMS, Query::exact_text(label))
}

/// `mark_completed`: tick the toggle of the named item
pub struct MarkCompletedHandler;

#[async_trait]
impl ActionHandler for MarkCompletedHandler {
    async fn execute(&self, action: &Action, env: &StepEnv<'_>) -> Result<StepOutcome, StepError> {
        let label = action.target_or_empty();
        let toggle = Query::descendant(todo_item(label), TOGGLE);
        let Some(checkbox) = first_visible(env.surface, &toggle).await? else {
            return Err(missing(label));
        };
        env.surface.click(&checkbox, env.config.click_timeout()).await?;
        info!(step = env.step, item = label, "marked todo completed");
        pause(env, env.config.action_delay_ms).await;
        Ok(StepOutcome::Completed)
    }
}

/// `delete_todo`: hover the named item and press its destroy button
pub struct DeleteTodoHandler;

#[async_trait]
impl ActionHandler for DeleteTodoHandler {
    async fn execute(&self, action: &Action, env: &StepEnv<'_>) -> Result<StepOutcome, StepError> {
        let label = action.target_or_empty();
        let item = todo_item(label);
        let Some(row) = first_visible(env.surface, &item).await? else {
            return Err(missing(label));
        };
        destroy(env, &row, Query::descendant(item, DESTROY)).await?;
        info!(step = env.step, item = label, "deleted todo");
        pause(env, env.config.action_delay_ms).await;
        Ok(StepOutcome::Completed)
    }
}

/// `clear_completed`: use the footer control, else delete items one by one
pub struct ClearCompletedHandler;

#[async_trait]
impl ActionHandler for ClearCompletedHandler {
    async fn execute(&self, _action: &Action, env: &StepEnv<'_>) -> Result<StepOutcome, StepError> {
        if let Some(button) = first_visible(env.surface, &Query::text("Clear completed")).await? {
            env.surface.click(&button, env.config.click_timeout()).await?;
            info!(step = env.step, "cleared completed todos");
            pause(env, env.config.action_delay_ms).await;
            return Ok(StepOutcome::Completed);
        }

        let count = visible_items(env.surface).await?.len();
        if count == 0 {
            info!(step = env.step, "no todos to clear");
            return Ok(StepOutcome::Completed);
        }

        let destroy_first = Query::descendant(Query::css(TODO_ITEMS), DESTROY);
        for _ in 0..count {
            let Some(row) = visible_items(env.surface).await?.into_iter().next() else {
                break;
            };
            destroy(env, &row, destroy_first.clone()).await?;
            pause(env, DELETE_PAUSE_MS).await;
        }
        info!(step = env.step, count, "deleted todos one by one");
        Ok(StepOutcome::Completed)
    }
}

async fn visible_items(surface: &dyn SurfaceDriver) -> Result<Vec<ElementRef>, StepError> {
    Ok(surface
        .find_candidates(&Query::css(TODO_ITEMS))
        .await?
        .into_iter()
        .filter(|item| item.visible)
        .collect())
}

/// Hover `row`, then click the first destroy button `buttons` yields. The
/// button only shows on hover, so a hidden match is still clicked.
async fn destroy(env: &StepEnv<'_>, row: &ElementRef, buttons: Query) -> Result<(), StepError> {
    env.surface.hover(row).await?;
    let candidates = env.surface.find_candidates(&buttons).await?;
    let button = candidates
        .iter()
        .find(|button| button.visible)
        .or_else(|| candidates.first())
        .cloned()
        .ok_or_else(|| missing(DESTROY))?;
    env.surface.click(&button, env.config.click_timeout()).await?;
    Ok(())
}

fn missing(target: &str) -> StepError {
    StepError::Resolution(LocatorError::not_found(target, CandidateKind::Clickable))
}
