use async_trait::async_trait;
use action_locator::Target;
use softlight_core_types::Action;
use surface_driver::Query;
use tracing::{debug, info, warn};

use crate::config::ExpectPolicy;
use crate::errors::StepError;
use crate::handlers::{first_visible, pause};
use crate::registry::{ActionHandler, StepEnv};
use crate::types::StepOutcome;

/// `expect`: poll for the target to become visible.
///
/// A miss is recorded as [`StepOutcome::Unverified`] under the advisory
/// policy and becomes a step error under the strict one.
pub struct ExpectHandler;

#[async_trait]
impl ActionHandler for ExpectHandler {
    async fn execute(&self, action: &Action, env: &StepEnv<'_>) -> Result<StepOutcome, StepError> {
        let target = action.target_or_empty();
        let queries = expectation_queries(target);
        let polls = env.config.expect_polls();

        for query in &queries {
            for poll in 0..polls {
                match first_visible(env.surface, query).await {
                    Ok(Some(_)) => {
                        info!(step = env.step, target, query = %query, "expectation verified");
                        pause(env, env.config.action_delay_ms).await;
                        return Ok(StepOutcome::Completed);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        debug!(step = env.step, query = %query, error = %err, "expectation lookup failed");
                        break;
                    }
                }
                if poll + 1 < polls {
                    pause(env, env.config.expect_poll_interval_ms).await;
                }
            }
        }

        let reason = format!("nothing visible for {target:?}");
        pause(env, env.config.action_delay_ms).await;
        match env.config.expect_policy {
            ExpectPolicy::Advisory => {
                warn!(step = env.step, target, "could not verify expectation");
                Ok(StepOutcome::Unverified(reason))
            }
            ExpectPolicy::Strict => Err(StepError::Verification(reason)),
        }
    }
}

/// Queries tried, in order, to verify `target`.
///
/// A `:has-text("...")` target checks its text in as-is, capitalized and
/// upper-case forms; a CSS-looking target is used as a selector; anything else
/// is matched as visible text as-is and capitalized.
pub fn expectation_queries(target: &str) -> Vec<Query> {
    let target = target.trim();
    if let Some(text) = has_text_argument(target) {
        return case_variants(text, true)
            .into_iter()
            .map(Query::exact_text)
            .collect();
    }
    if let Some(selector) = Target::parse(target).selector() {
        return vec![Query::css(selector)];
    }
    case_variants(target, false)
        .into_iter()
        .map(Query::exact_text)
        .collect()
}

fn has_text_argument(target: &str) -> Option<&str> {
    let start = target.find("has-text(")? + "has-text(".len();
    let rest = &target[start..];
    let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let body = &rest[1..];
    let end = body.find(quote)?;
    let text = body[..end].trim();
    (!text.is_empty()).then_some(text)
}

fn case_variants(text: &str, with_upper: bool) -> Vec<String> {
    let mut variants = vec![text.to_string(), capitalize(text)];
    if with_upper {
        variants.push(text.to_uppercase());
    }
    let mut unique = Vec::with_capacity(variants.len());
    for variant in variants {
        if !unique.contains(&variant) {
            unique.push(variant);
        }
    }
    unique
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
