//! Oracle seams: plan generation and plan repair
//!
//! Oracles are constructed once and handed to the engine as
//! `Arc<dyn ...>`; the engine never builds a client itself.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use softlight_core_types::{Action, Plan};

use crate::errors::OracleError;

/// Produces the initial plan text for a task
#[async_trait]
pub trait PlanningOracle: Send + Sync {
    /// `context` is retrieved reference material, possibly empty
    async fn generate_plan(&self, task: &str, context: &str) -> Result<String, OracleError>;
}

/// Failure context handed to the repair oracle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairRequest {
    /// 1-based repair attempt
    pub attempt: u32,
    pub app: String,
    /// 1-based index of the failed step
    pub failed_step: usize,
    pub action: Action,
    pub error: String,
    pub plan: Plan,
}

/// Produces corrected plan text for a failed run
#[async_trait]
pub trait RepairOracle: Send + Sync {
    async fn repair(&self, request: &RepairRequest) -> Result<String, OracleError>;
}

/// Oracle answering from a fixed script of responses.
///
/// Each call pops the next response; an exhausted script answers with an
/// empty string. Every request is kept for inspection.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<String, OracleError>>>,
    requests: Mutex<Vec<RepairRequest>>,
    tasks: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, OracleError>>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Script of plain text answers
    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|reply| Ok(reply.into())))
    }

    pub fn requests(&self) -> Vec<RepairRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len() + self.tasks.lock().len()
    }

    fn next(&self) -> Result<String, OracleError> {
        self.responses.lock().pop_front().unwrap_or_else(|| Ok(String::new()))
    }
}

#[async_trait]
impl RepairOracle for ScriptedOracle {
    async fn repair(&self, request: &RepairRequest) -> Result<String, OracleError> {
        self.requests.lock().push(request.clone());
        self.next()
    }
}

#[async_trait]
impl PlanningOracle for ScriptedOracle {
    async fn generate_plan(&self, task: &str, _context: &str) -> Result<String, OracleError> {
        self.tasks.lock().push(task.to_string());
        self.next()
    }
}
