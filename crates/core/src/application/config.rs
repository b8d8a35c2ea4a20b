// Coordinator configuration

use crate::application::constants::{DEFAULT_COMPENSATION_TIMEOUT, DEFAULT_PHASE_TIMEOUT};
use crate::domain::Backend;
use std::time::Duration;

/// Deadlines applied by every coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Budget for one forward phase (prepare, commit, try, confirm, saga step)
    pub phase_timeout: Duration,
    /// Budget for each individual rollback / cancel / compensate call
    pub compensation_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            phase_timeout: DEFAULT_PHASE_TIMEOUT,
            compensation_timeout: DEFAULT_COMPENSATION_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    /// Upper bound on how long one run keeps a tentative record alive
    ///
    /// Two forward phases followed by one negative call per backend. A
    /// tentative record older than this has no live owner.
    pub fn max_run_duration(&self) -> Duration {
        self.phase_timeout * 2 + self.compensation_timeout * Backend::ORDER.len() as u32
    }
}
