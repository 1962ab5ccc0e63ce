use clap::Subcommand;

use super::plan::PlanArgs;
use super::run::RunArgs;
use super::summarize::SummarizeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Plan a task and execute it in the browser
    Run(RunArgs),

    /// Print the plan generated for a task without executing it
    Plan(PlanArgs),

    /// Regenerate the dataset summary of a run directory
    Summarize(SummarizeArgs),
}
