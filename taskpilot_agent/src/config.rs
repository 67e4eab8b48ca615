use crate::actor::RestartPolicy;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Diagnose rounds a terminal worker may spend after its first command fails.
    pub max_attempts: usize,
    pub status_timeout: Duration,
    pub planner_restart: RestartPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            status_timeout: Duration::from_secs(60),
            planner_restart: RestartPolicy::default(),
        }
    }
}

impl AgentConfig {
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn status_timeout(mut self, status_timeout: Duration) -> Self {
        self.status_timeout = status_timeout;
        self
    }

    pub fn planner_restart(mut self, planner_restart: RestartPolicy) -> Self {
        self.planner_restart = planner_restart;
        self
    }
}
