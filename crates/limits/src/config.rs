//! Limit configuration presets.

use crate::error::LimitError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Resource budget for one execution, fixed at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitConfig {
    /// Wall-clock budget for the whole run.
    #[serde(with = "duration_millis")]
    pub max_execution_time: Duration,
    /// Total step (component dispatch) budget.
    pub max_steps: u64,
    /// Context size budget in bytes.
    pub max_context_bytes: u64,
    /// Audit-trail length budget.
    pub max_audit_entries: u64,
    /// Recursion (nested fork) depth budget.
    pub max_recursion_depth: u64,
    /// Concurrent branch budget per fork section.
    pub max_parallel_branches: u64,
    /// Variable count budget.
    pub max_variables: u64,
    /// Single-variable size budget in bytes.
    pub max_variable_bytes: u64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_execution_time: Duration::from_secs(30),
            max_steps: 10_000,
            max_context_bytes: 10 * MIB,
            max_audit_entries: 10_000,
            max_recursion_depth: 100,
            max_parallel_branches: 10,
            max_variables: 1_000,
            max_variable_bytes: MIB,
        }
    }
}

impl LimitConfig {
    /// 5× the default budget in every dimension.
    #[must_use]
    pub fn permissive() -> Self {
        Self::default().scaled(5.0)
    }

    /// A tenth of the default budget in every dimension.
    #[must_use]
    pub fn restrictive() -> Self {
        Self::default().scaled(0.1)
    }

    fn scaled(&self, factor: f64) -> Self {
        let scale = |n: u64| ((n as f64 * factor) as u64).max(1);
        Self {
            max_execution_time: Duration::from_millis(scale(
                self.max_execution_time.as_millis() as u64
            )),
            max_steps: scale(self.max_steps),
            max_context_bytes: scale(self.max_context_bytes),
            max_audit_entries: scale(self.max_audit_entries),
            max_recursion_depth: scale(self.max_recursion_depth),
            max_parallel_branches: scale(self.max_parallel_branches),
            max_variables: scale(self.max_variables),
            max_variable_bytes: scale(self.max_variable_bytes),
        }
    }

    /// Reject configurations with any non-positive field.
    pub fn validate(&self) -> Result<(), LimitError> {
        let fields = [
            (self.max_execution_time.as_millis() as u64, "maxExecutionTime"),
            (self.max_steps, "maxSteps"),
            (self.max_context_bytes, "maxContextBytes"),
            (self.max_audit_entries, "maxAuditEntries"),
            (self.max_recursion_depth, "maxRecursionDepth"),
            (self.max_parallel_branches, "maxParallelBranches"),
            (self.max_variables, "maxVariables"),
            (self.max_variable_bytes, "maxVariableBytes"),
        ];
        for (value, name) in fields {
            if value == 0 {
                return Err(LimitError::InvalidConfig { field: name });
            }
        }
        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (duration.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
