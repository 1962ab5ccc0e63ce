use std::path::Path;
use std::sync::Arc;

use action_flow::{PlanningOracle, RepairOracle};
use anyhow::{Context, Result};
use clap::Args;
use softlight_core_types::Plan;
use tracing::{info, warn};

use crate::cli::context::CliContext;
use crate::config::AppConfig;
use crate::llm::{OpenAiConfig, OpenAiOracle};
use crate::planner::{plan_task, RuleBasedPlanner};
use crate::retriever::KnowledgeBase;

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Task description in natural language
    pub task: String,
}

pub async fn cmd_plan(args: PlanArgs, ctx: &CliContext) -> Result<()> {
    let oracles = Oracles::from_config(ctx.config())?;
    let plan = generate_plan(ctx.config(), oracles.planner.as_ref(), &args.task).await?;
    print!("{}", plan.to_yaml()?);
    Ok(())
}

/// Oracles used by one CLI invocation
pub struct Oracles {
    pub planner: Arc<dyn PlanningOracle>,
    pub repair: Option<Arc<dyn RepairOracle>>,
}

impl Oracles {
    /// The OpenAI oracle when an API key is configured, otherwise the
    /// rule-based planner and no repair oracle
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match OpenAiConfig::from_oracle_config(&config.oracle) {
            Some(openai) => {
                let oracle = Arc::new(
                    OpenAiOracle::new(openai).context("Failed to create OpenAI oracle")?,
                );
                info!(model = oracle.model(), "using OpenAI planning and repair oracle");
                Ok(Self {
                    planner: oracle.clone(),
                    repair: Some(oracle),
                })
            }
            None => {
                warn!(
                    env = %config.oracle.api_key_env,
                    "no API key configured; using rule-based planner without repair"
                );
                Ok(Self {
                    planner: Arc::new(RuleBasedPlanner::new()),
                    repair: None,
                })
            }
        }
    }
}

pub async fn generate_plan(
    config: &AppConfig,
    planner: &dyn PlanningOracle,
    task: &str,
) -> Result<Plan> {
    let knowledge = KnowledgeBase::load(&config.knowledge_base.dir)
        .await
        .with_context(|| {
            format!(
                "Failed to load knowledge base from {}",
                config.knowledge_base.dir.display()
            )
        })?;
    plan_task(planner, &knowledge, task, config.knowledge_base.top_k)
        .await
        .context("Failed to generate plan")
}

pub async fn load_plan_file(path: &Path) -> Result<Plan> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;
    Plan::parse(&text).with_context(|| format!("Invalid plan file {}", path.display()))
}
