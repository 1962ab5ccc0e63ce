//! `softlight` command line front-end

pub mod app;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod plan;
pub mod run;
pub mod runtime;
pub mod summarize;

pub use app::run;
pub use context::CliContext;
pub use run::execute_plan;
