//! Initial plan generation
//!
//! [`plan_task`] retrieves knowledge base context, asks a planning oracle for
//! plan text and parses it. [`RuleBasedPlanner`] stands in for the LLM oracle
//! when no API key is configured.

use action_flow::{OracleError, PlanningOracle};
use async_trait::async_trait;
use softlight_core_types::{Plan, PlanError};
use thiserror::Error;
use tracing::{debug, info};

use crate::retriever::{format_context, KnowledgeBase};

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("planner output rejected: {0}")]
    Plan(#[from] PlanError),
}

/// Ask `oracle` for a plan for `task`, with the top `top_k` documents of
/// `knowledge` as context
pub async fn plan_task(
    oracle: &dyn PlanningOracle,
    knowledge: &KnowledgeBase,
    task: &str,
    top_k: usize,
) -> Result<Plan, PlanningError> {
    let retrieved = knowledge.retrieve(task, top_k);
    debug!(
        documents = ?retrieved.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
        "retrieved planning context"
    );
    let context = format_context(&retrieved);
    let text = oracle.generate_plan(task, &context).await?;
    let plan = Plan::parse(&text)?;
    info!(steps = plan.len(), "generated plan");
    Ok(plan)
}

const SAUCEDEMO_LOGIN: &str = r##"
- action: open
  target: https://www.saucedemo.com/
- action: fill
  target: "#user-name"
  value: standard_user
- action: fill
  target: "#password"
  value: secret_sauce
- action: find_and_click
  target: "#login-button"
- action: expect
  target: .inventory_list
"##;

const TODO_APP: &str = r#"
- action: open
  target: https://demo.playwright.dev/todomvc
- action: fill
  target: What needs to be done?
  value: Buy milk
- action: press
  target: Enter
- action: fill
  target: What needs to be done?
  value: Pay bills
- action: press
  target: Enter
- action: expect
  target: Buy milk
"#;

const EXAMPLE_CHECK: &str = r#"
- action: open
  target: https://example.com
- action: expect
  target: Example Domain
"#;

/// Keyword-driven planner with a few canned plans
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedPlanner;

impl RuleBasedPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan text for `task`
    pub fn template_for(&self, task: &str) -> &'static str {
        let task = task.to_lowercase();
        if task.contains("sauce") && (task.contains("login") || task.contains("checkout")) {
            SAUCEDEMO_LOGIN
        } else if task.contains("todo") {
            TODO_APP
        } else {
            EXAMPLE_CHECK
        }
    }
}

#[async_trait]
impl PlanningOracle for RuleBasedPlanner {
    async fn generate_plan(&self, task: &str, _context: &str) -> Result<String, OracleError> {
        Ok(self.template_for(task).trim().to_string())
    }
}
