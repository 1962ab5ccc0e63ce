//! Engine tuning knobs

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What an unverified `expect` does to the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectPolicy {
    /// Log and record the miss; the step still succeeds
    #[default]
    Advisory,
    /// Treat the miss as a step error and enter repair
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Plan substitutions allowed per run
    pub max_repairs: u32,
    pub navigation_timeout_ms: u64,
    pub click_timeout_ms: u64,
    /// Per-candidate budget when polling for an expectation
    pub expect_timeout_ms: u64,
    pub expect_poll_interval_ms: u64,
    /// Pause after a successful navigation
    pub settle_ms: u64,
    /// Pause after clicks, fills and key presses
    pub action_delay_ms: u64,
    /// Default pause of `wait_for`
    pub wait_for_ms: u64,
    pub oracle_timeout_ms: u64,
    pub expect_policy: ExpectPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_repairs: 3,
            navigation_timeout_ms: 60_000,
            click_timeout_ms: 10_000,
            expect_timeout_ms: 8_000,
            expect_poll_interval_ms: 250,
            settle_ms: 2_000,
            action_delay_ms: 800,
            wait_for_ms: 1_000,
            oracle_timeout_ms: 60_000,
            expect_policy: ExpectPolicy::Advisory,
        }
    }
}

impl EngineConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn click_timeout(&self) -> Duration {
        Duration::from_millis(self.click_timeout_ms)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    /// Number of lookups an expectation candidate gets, at least one
    pub fn expect_polls(&self) -> u64 {
        if self.expect_poll_interval_ms == 0 {
            return 1;
        }
        (self.expect_timeout_ms / self.expect_poll_interval_ms).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: EngineConfig =
            serde_yaml::from_str("max_repairs: 5\nexpect_policy: strict\n").unwrap();
        assert_eq!(config.max_repairs, 5);
        assert_eq!(config.expect_policy, ExpectPolicy::Strict);
        assert_eq!(config.wait_for_ms, 1_000);
    }

    #[test]
    fn expect_polls_never_zero() {
        let mut config = EngineConfig::default();
        assert_eq!(config.expect_polls(), 32);
        config.expect_timeout_ms = 10;
        assert_eq!(config.expect_polls(), 1);
        config.expect_poll_interval_ms = 0;
        assert_eq!(config.expect_polls(), 1);
    }
}
