use super::env::CliArgs;
use super::plan::cmd_plan;
use super::run::cmd_run;
use super::summarize::cmd_summarize;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Plan(args) => cmd_plan(args, ctx).await,
        Commands::Summarize(args) => cmd_summarize(args).await,
    }
}
