//! Configuration for the scheduling and allocation core.

use serde::{Deserialize, Serialize};

/// Tunables shared by the critical path pass and the allocation resolver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Upper bound in days for the forward availability scan.
    pub scan_horizon_days: i64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            scan_horizon_days: 3650,
        }
    }
}
