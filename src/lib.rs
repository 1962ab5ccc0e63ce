//! Softlight command line library
//!
//! Wires the execution engine to its outer collaborators:
//! - YAML configuration and local environment overrides
//! - the OpenAI-compatible planning and repair oracle
//! - a knowledge base retriever and a rule-based fallback planner
//! - app identity detection and session persistence around a run

pub mod apps;
pub mod cli;
pub mod config;
pub mod llm;
pub mod planner;
pub mod retriever;

pub use apps::{detect_app, AppRule};
pub use config::AppConfig;
pub use planner::{plan_task, PlanningError, RuleBasedPlanner};
pub use retriever::KnowledgeBase;
