use std::path::PathBuf;
use std::sync::Arc;

use action_flow::{EngineConfig, PlanExecutor, RepairOracle, RunContext, RunResult, StepOutcome};
use action_locator::TieredResolver;
use anyhow::{bail, Context, Result};
use clap::Args;
use softlight_core_types::Plan;
use surface_driver::{SessionAwareDriver, SessionStore, SurfaceDriver, WebDriverSurface};
use tracing::{debug, info, warn};

use crate::apps::detect_app;
use crate::cli::context::CliContext;
use crate::cli::plan::{generate_plan, load_plan_file, Oracles};
use crate::config::AppConfig;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Task description in natural language
    #[arg(required_unless_present = "plan")]
    pub task: Option<String>,

    /// Execute this YAML or JSON plan instead of planning
    #[arg(long, value_name = "FILE")]
    pub plan: Option<PathBuf>,

    /// App identity for the dataset and session (detected from the plan otherwise)
    #[arg(long)]
    pub app: Option<String>,

    /// Override the repair budget
    #[arg(long)]
    pub max_repairs: Option<u32>,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    debug!(config = %ctx.config_path().display(), "run configuration");
    let oracles = Oracles::from_config(config)?;

    let plan = match (&args.plan, &args.task) {
        (Some(path), _) => load_plan_file(path).await?,
        (None, Some(task)) => {
            println!("Task: {task}");
            generate_plan(config, oracles.planner.as_ref(), task).await?
        }
        (None, None) => bail!("either a task or --plan is required"),
    };
    print_plan(&plan);

    let app = args
        .app
        .clone()
        .unwrap_or_else(|| detect_app(&config.apps, &plan));

    let browser = WebDriverSurface::connect(&config.browser)
        .await
        .with_context(|| format!("Failed to connect to WebDriver at {}", config.browser.webdriver_url))?;

    let result = execute_plan(
        config,
        &app,
        plan,
        Arc::new(browser),
        oracles.repair,
        args.max_repairs,
    )
    .await?;

    print_summary(&result);
    if !result.is_success() {
        let reason = result
            .abort_reason
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown reason".to_string());
        bail!("run aborted: {reason}");
    }
    Ok(())
}

/// Run `plan` on `surface` with the session of `app` restored beforehand and
/// saved afterwards, whatever the outcome
pub async fn execute_plan(
    config: &AppConfig,
    app: &str,
    plan: Plan,
    surface: Arc<dyn SurfaceDriver>,
    repair: Option<Arc<dyn RepairOracle>>,
    max_repairs: Option<u32>,
) -> Result<RunResult> {
    let mut engine: EngineConfig = config.engine.clone();
    if let Some(max_repairs) = max_repairs {
        engine.max_repairs = max_repairs;
    }

    let sessions = SessionStore::new(&config.session.state_dir);
    let snapshot = sessions.load(app).await;
    let driver = Arc::new(SessionAwareDriver::new(surface, snapshot));

    let run = match RunContext::create(
        app,
        driver.clone(),
        &config.capture.dataset_dir,
        engine.max_repairs,
    ) {
        Ok(run) => run,
        Err(err) => {
            if let Err(close_err) = driver.close().await {
                warn!(error = %close_err, "failed to close browser");
            }
            return Err(err).context("Failed to prepare capture directory");
        }
    };
    info!(app, run_dir = %run.store.run_dir().display(), "starting run");

    let resolver = Arc::new(TieredResolver::new(config.locator.keywords.clone()));
    let executor = PlanExecutor::new(engine, resolver, repair);
    let result = executor.run(plan, run).await;

    match driver.capture_session().await {
        Ok(snapshot) => match sessions.save(app, &snapshot).await {
            Ok(path) => debug!(app, path = %path.display(), "session persisted after run"),
            Err(err) => warn!(error = %err, "failed to save session"),
        },
        Err(err) => warn!(error = %err, "failed to read session before shutdown"),
    }
    if let Err(err) = driver.close().await {
        warn!(error = %err, "failed to close browser");
    }

    Ok(result)
}

fn print_plan(plan: &Plan) {
    println!("Plan ({} steps):", plan.len());
    for action in plan {
        println!("  • {action}");
    }
}

fn print_summary(result: &RunResult) {
    println!();
    println!("Status: {}", result.status);
    if let Some(reason) = &result.abort_reason {
        println!("Reason: {reason}");
    }
    println!(
        "Steps: {}  Captures: {}  Repairs: {}",
        result.steps.len(),
        result.records.len(),
        result.repairs
    );
    for report in result.unverified() {
        if let Ok(StepOutcome::Unverified(detail)) = &report.outcome {
            println!("  unverified step {} ({}): {detail}", report.step, report.label);
        }
    }
    println!("Run directory: {}", result.run_dir.display());
    if let Some(summary) = &result.summary_path {
        println!("Summary: {}", summary.display());
    }
}
