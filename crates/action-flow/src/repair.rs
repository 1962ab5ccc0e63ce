//! Repair protocol: failure context in, validated replacement plan out

use std::sync::Arc;
use std::time::Duration;

use softlight_core_types::{Action, Plan, PlanError};
use tracing::{info, warn};

use crate::errors::OracleError;
use crate::oracle::{RepairOracle, RepairRequest};
use crate::types::AbortReason;

pub struct RepairProtocol {
    oracle: Option<Arc<dyn RepairOracle>>,
    timeout: Duration,
}

impl RepairProtocol {
    pub fn new(oracle: Option<Arc<dyn RepairOracle>>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Corrected plan, or `None` when the oracle gave nothing usable
    pub async fn repair(
        &self,
        attempt: u32,
        app: &str,
        failed_step: usize,
        action: &Action,
        error: &str,
        plan: &Plan,
    ) -> Option<Plan> {
        let request = RepairRequest {
            attempt,
            app: app.to_string(),
            failed_step,
            action: action.clone(),
            error: error.to_string(),
            plan: plan.clone(),
        };
        self.attempt(request).await.ok()
    }

    /// Ask the oracle once and validate its answer.
    ///
    /// The answer must parse as a non-empty plan of well-formed actions that
    /// differs from the plan in the request.
    pub async fn attempt(&self, request: RepairRequest) -> Result<Plan, AbortReason> {
        let Some(oracle) = &self.oracle else {
            warn!(step = request.failed_step, "no repair oracle configured");
            return Err(AbortReason::NoRepairOracle);
        };

        info!(
            attempt = request.attempt,
            step = request.failed_step,
            error = %request.error,
            "requesting plan repair"
        );

        let reply = match tokio::time::timeout(self.timeout, oracle.repair(&request)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(OracleError::EmptyResponse)) => return Err(AbortReason::EmptyResponse),
            Ok(Err(err)) => {
                warn!(attempt = request.attempt, error = %err, "repair oracle failed");
                return Err(AbortReason::OracleFailed(err.to_string()));
            }
            Err(_) => {
                warn!(
                    attempt = request.attempt,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "repair oracle timed out"
                );
                return Err(AbortReason::OracleTimedOut);
            }
        };

        let repaired = match Plan::parse(&reply) {
            Ok(plan) => plan,
            Err(PlanError::Empty) => return Err(AbortReason::EmptyResponse),
            Err(err) => {
                warn!(attempt = request.attempt, error = %err, "repaired plan rejected");
                return Err(AbortReason::MalformedPlan(err.to_string()));
            }
        };

        if repaired == request.plan {
            warn!(attempt = request.attempt, "repair oracle returned the identical plan");
            return Err(AbortReason::IdenticalPlan);
        }

        info!(
            attempt = request.attempt,
            steps = repaired.len(),
            "accepted repaired plan"
        );
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;
    use softlight_core_types::ActionKind;

    fn plan() -> Plan {
        Plan::new(vec![
            Action::new(ActionKind::Open, Some("https://demo.test"), None).unwrap(),
            Action::new(ActionKind::Fill, Some("#missing"), Some("Ada")).unwrap(),
        ])
    }

    fn request() -> RepairRequest {
        let plan = plan();
        RepairRequest {
            attempt: 1,
            app: "generic".into(),
            failed_step: 2,
            action: plan.steps()[1].clone(),
            error: "element not found".into(),
            plan,
        }
    }

    fn protocol(oracle: ScriptedOracle) -> RepairProtocol {
        RepairProtocol::new(Some(Arc::new(oracle)), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn fenced_reply_is_accepted() {
        let reply = "```yaml\n- action: open\n  target: https://demo.test\n- action: fill\n  target: input\n  value: Ada\n```";
        let repaired = protocol(ScriptedOracle::replies([reply]))
            .attempt(request())
            .await
            .unwrap();
        assert_eq!(repaired.len(), 2);
        assert_eq!(repaired.steps()[1].target(), Some("input"));
    }

    #[tokio::test]
    async fn identical_plan_is_rejected() {
        let same = plan().to_yaml().unwrap();
        let err = protocol(ScriptedOracle::replies([same]))
            .attempt(request())
            .await
            .unwrap_err();
        assert_eq!(err, AbortReason::IdenticalPlan);
    }

    #[tokio::test]
    async fn unusable_replies_are_rejected() {
        let cases = [
            (Ok(String::new()), AbortReason::EmptyResponse),
            (Err(OracleError::Request("503".into())), AbortReason::OracleFailed("oracle request failed: 503".into())),
        ];
        for (reply, expected) in cases {
            let err = protocol(ScriptedOracle::new([reply]))
                .attempt(request())
                .await
                .unwrap_err();
            assert_eq!(err, expected);
        }

        let err = protocol(ScriptedOracle::replies(["- action: teleport\n  target: mars"]))
            .attempt(request())
            .await
            .unwrap_err();
        assert!(matches!(err, AbortReason::MalformedPlan(_)));
    }

    #[tokio::test]
    async fn missing_oracle_returns_none() {
        let protocol = RepairProtocol::new(None, Duration::from_secs(1));
        let plan = plan();
        let repaired = protocol
            .repair(1, "generic", 2, &plan.steps()[1], "boom", &plan)
            .await;
        assert_eq!(repaired, None);
    }

    struct SlowOracle;

    #[async_trait::async_trait]
    impl RepairOracle for SlowOracle {
        async fn repair(&self, _request: &RepairRequest) -> Result<String, OracleError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_oracle_times_out() {
        let protocol = RepairProtocol::new(Some(Arc::new(SlowOracle)), Duration::from_millis(50));
        let err = protocol.attempt(request()).await.unwrap_err();
        assert_eq!(err, AbortReason::OracleTimedOut);
    }
}
