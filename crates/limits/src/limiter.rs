//! The resource limiter.

use crate::config::LimitConfig;
use crate::error::{LimitError, LimitKind};
use cascade_core::ExecutionId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;

/// Usage counters for one execution.
#[derive(Debug, Clone)]
pub struct ExecutionUsage {
    /// When the execution was registered.
    pub started_at: Instant,
    /// Steps recorded so far.
    pub steps: u64,
    /// Most recent context size in bytes.
    pub context_bytes: u64,
    /// Largest context size seen.
    pub peak_context_bytes: u64,
    /// Audit entries recorded so far.
    pub audit_entries: u64,
    /// Current nested-fork depth.
    pub recursion_depth: u64,
    /// Branches currently running.
    pub parallel_branches: u64,
    /// Most recent variable count.
    pub variables: u64,
}

impl ExecutionUsage {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            steps: 0,
            context_bytes: 0,
            peak_context_bytes: 0,
            audit_entries: 0,
            recursion_depth: 0,
            parallel_branches: 0,
            variables: 0,
        }
    }

    /// Elapsed wall-clock time since registration, in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

/// Tracks and enforces per-execution quotas.
///
/// Shared by the root task and every branch task of a run; all state
/// sits behind one mutex, and no lock is held across an await point.
#[derive(Debug, Default)]
pub struct ResourceLimiter {
    config: LimitConfig,
    usage: Mutex<HashMap<ExecutionId, ExecutionUsage>>,
}

impl ResourceLimiter {
    /// Create a limiter with the given configuration. The configuration
    /// is fixed for the limiter's lifetime.
    pub fn new(config: LimitConfig) -> Result<Self, LimitError> {
        config.validate()?;
        Ok(Self {
            config,
            usage: Mutex::new(HashMap::new()),
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &LimitConfig {
        &self.config
    }

    /// Register an execution. Counters start at zero and the clock
    /// starts now.
    pub fn start_execution(&self, id: ExecutionId) -> Result<(), LimitError> {
        let mut usage = self.usage.lock();
        if usage.contains_key(&id) {
            return Err(LimitError::AlreadyStarted(id));
        }
        usage.insert(id, ExecutionUsage::new());
        Ok(())
    }

    /// Remove all state for an execution, returning its final counters.
    pub fn end_execution(&self, id: ExecutionId) -> Result<ExecutionUsage, LimitError> {
        self.usage
            .lock()
            .remove(&id)
            .ok_or(LimitError::UnknownExecution(id))
    }

    /// Record one step.
    pub fn record_step(&self, id: ExecutionId) -> Result<(), LimitError> {
        self.with_usage(id, |usage, config| {
            usage.steps += 1;
            check(LimitKind::Steps, usage.steps, config.max_steps)
        })
    }

    /// Record the current context size.
    pub fn record_context_size(&self, id: ExecutionId, bytes: u64) -> Result<(), LimitError> {
        self.with_usage(id, |usage, config| {
            usage.context_bytes = bytes;
            usage.peak_context_bytes = usage.peak_context_bytes.max(bytes);
            check(LimitKind::Context, bytes, config.max_context_bytes)
        })
    }

    /// Record one audit entry.
    pub fn record_audit_entry(&self, id: ExecutionId) -> Result<(), LimitError> {
        self.with_usage(id, |usage, config| {
            usage.audit_entries += 1;
            check(LimitKind::Audit, usage.audit_entries, config.max_audit_entries)
        })
    }

    /// Record entry into a nested fork section.
    pub fn record_recursion_enter(&self, id: ExecutionId) -> Result<(), LimitError> {
        self.with_usage(id, |usage, config| {
            usage.recursion_depth += 1;
            check(
                LimitKind::Depth,
                usage.recursion_depth,
                config.max_recursion_depth,
            )
        })
    }

    /// Record exit from a nested fork section.
    pub fn record_recursion_exit(&self, id: ExecutionId) -> Result<(), LimitError> {
        self.with_usage(id, |usage, _| {
            usage.recursion_depth = usage.recursion_depth.saturating_sub(1);
            Ok(())
        })
    }

    /// Record the branch count of a fork section being entered.
    pub fn record_parallel_branches(&self, id: ExecutionId, count: u64) -> Result<(), LimitError> {
        self.with_usage(id, |usage, config| {
            usage.parallel_branches += count;
            check(
                LimitKind::Branches,
                usage.parallel_branches,
                config.max_parallel_branches,
            )
        })
    }

    /// Record branches leaving a fork section.
    pub fn record_branches_done(&self, id: ExecutionId, count: u64) -> Result<(), LimitError> {
        self.with_usage(id, |usage, _| {
            usage.parallel_branches = usage.parallel_branches.saturating_sub(count);
            Ok(())
        })
    }

    /// Record the current variable count.
    pub fn record_variable_count(&self, id: ExecutionId, count: u64) -> Result<(), LimitError> {
        self.with_usage(id, |usage, config| {
            usage.variables = count;
            check(LimitKind::Variables, count, config.max_variables)
        })
    }

    /// Check a single variable's size against the per-variable budget.
    pub fn check_variable_size(&self, bytes: u64) -> Result<(), LimitError> {
        check(LimitKind::VariableSize, bytes, self.config.max_variable_bytes)
    }

    /// Re-evaluate every quota, including elapsed wall-clock time.
    pub fn check_all(&self, id: ExecutionId) -> Result<(), LimitError> {
        self.with_usage(id, |usage, config| {
            check(
                LimitKind::Time,
                usage.elapsed_ms(),
                config.max_execution_time.as_millis() as u64,
            )?;
            check(LimitKind::Steps, usage.steps, config.max_steps)?;
            check(LimitKind::Context, usage.context_bytes, config.max_context_bytes)?;
            check(LimitKind::Audit, usage.audit_entries, config.max_audit_entries)?;
            check(
                LimitKind::Depth,
                usage.recursion_depth,
                config.max_recursion_depth,
            )?;
            check(
                LimitKind::Branches,
                usage.parallel_branches,
                config.max_parallel_branches,
            )?;
            check(LimitKind::Variables, usage.variables, config.max_variables)
        })
    }

    /// Snapshot an execution's counters.
    pub fn usage(&self, id: ExecutionId) -> Result<ExecutionUsage, LimitError> {
        self.usage
            .lock()
            .get(&id)
            .cloned()
            .ok_or(LimitError::UnknownExecution(id))
    }

    fn with_usage<T>(
        &self,
        id: ExecutionId,
        f: impl FnOnce(&mut ExecutionUsage, &LimitConfig) -> Result<T, LimitError>,
    ) -> Result<T, LimitError> {
        let mut usage = self.usage.lock();
        let entry = usage
            .get_mut(&id)
            .ok_or(LimitError::UnknownExecution(id))?;
        f(entry, &self.config)
    }
}

fn check(kind: LimitKind, used: u64, limit: u64) -> Result<(), LimitError> {
    if used > limit {
        Err(LimitError::Exceeded { kind, used, limit })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn limiter(config: LimitConfig) -> (ResourceLimiter, ExecutionId) {
        let limiter = ResourceLimiter::new(config).unwrap();
        let id = ExecutionId::v4();
        limiter.start_execution(id).unwrap();
        (limiter, id)
    }

    #[test]
    fn steps_fail_at_threshold() {
        let (limiter, id) = limiter(LimitConfig {
            max_steps: 3,
            ..LimitConfig::default()
        });

        for _ in 0..3 {
            limiter.record_step(id).unwrap();
        }
        let err = limiter.record_step(id).unwrap_err();
        assert_eq!(
            err,
            LimitError::Exceeded {
                kind: LimitKind::Steps,
                used: 4,
                limit: 3
            }
        );
    }

    #[test]
    fn context_size_tracks_peak() {
        let (limiter, id) = limiter(LimitConfig::default());
        limiter.record_context_size(id, 500).unwrap();
        limiter.record_context_size(id, 100).unwrap();

        let usage = limiter.usage(id).unwrap();
        assert_eq!(usage.context_bytes, 100);
        assert_eq!(usage.peak_context_bytes, 500);
    }

    #[test]
    fn context_size_over_budget_fails() {
        let (limiter, id) = limiter(LimitConfig {
            max_context_bytes: 64,
            ..LimitConfig::default()
        });
        assert!(limiter.record_context_size(id, 65).is_err());
    }

    #[test]
    fn audit_entries_fail_at_threshold() {
        let (limiter, id) = limiter(LimitConfig {
            max_audit_entries: 2,
            ..LimitConfig::default()
        });
        limiter.record_audit_entry(id).unwrap();
        limiter.record_audit_entry(id).unwrap();
        assert_eq!(
            limiter.record_audit_entry(id).unwrap_err().kind(),
            Some(LimitKind::Audit)
        );
    }

    #[test]
    fn recursion_depth_enter_exit() {
        let (limiter, id) = limiter(LimitConfig {
            max_recursion_depth: 2,
            ..LimitConfig::default()
        });
        limiter.record_recursion_enter(id).unwrap();
        limiter.record_recursion_enter(id).unwrap();
        assert_eq!(
            limiter.record_recursion_enter(id).unwrap_err().kind(),
            Some(LimitKind::Depth)
        );
        limiter.record_recursion_exit(id).unwrap();
        assert_eq!(limiter.usage(id).unwrap().recursion_depth, 2);
    }

    #[test]
    fn parallel_branches_fail_over_budget() {
        let (limiter, id) = limiter(LimitConfig {
            max_parallel_branches: 4,
            ..LimitConfig::default()
        });
        limiter.record_parallel_branches(id, 3).unwrap();
        assert_eq!(
            limiter.record_parallel_branches(id, 2).unwrap_err().kind(),
            Some(LimitKind::Branches)
        );
        limiter.record_branches_done(id, 3).unwrap();
    }

    #[test]
    fn variable_count_and_size_checks() {
        let (limiter, id) = limiter(LimitConfig {
            max_variables: 2,
            max_variable_bytes: 16,
            ..LimitConfig::default()
        });
        limiter.record_variable_count(id, 2).unwrap();
        assert_eq!(
            limiter.record_variable_count(id, 3).unwrap_err().kind(),
            Some(LimitKind::Variables)
        );
        assert!(limiter.check_variable_size(16).is_ok());
        assert_eq!(
            limiter.check_variable_size(17).unwrap_err().kind(),
            Some(LimitKind::VariableSize)
        );
    }

    #[test]
    fn check_all_passes_fresh_execution() {
        let (limiter, id) = limiter(LimitConfig::default());
        assert!(limiter.check_all(id).is_ok());
    }

    #[test]
    fn end_execution_removes_state() {
        let (limiter, id) = limiter(LimitConfig::default());
        limiter.record_step(id).unwrap();
        let usage = limiter.end_execution(id).unwrap();
        assert_eq!(usage.steps, 1);
        assert_eq!(
            limiter.record_step(id).unwrap_err(),
            LimitError::UnknownExecution(id)
        );
    }

    #[test]
    fn double_start_is_rejected() {
        let (limiter, id) = limiter(LimitConfig::default());
        assert_eq!(
            limiter.start_execution(id).unwrap_err(),
            LimitError::AlreadyStarted(id)
        );
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let config = LimitConfig {
            max_variables: 0,
            ..LimitConfig::default()
        };
        assert!(ResourceLimiter::new(config).is_err());
    }

    #[test]
    fn concurrent_recording_is_safe() {
        use std::sync::Arc;
        let limiter = Arc::new(ResourceLimiter::new(LimitConfig::default()).unwrap());
        let id = ExecutionId::v4();
        limiter.start_execution(id).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        limiter.record_step(id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(limiter.usage(id).unwrap().steps, 800);
    }
}
