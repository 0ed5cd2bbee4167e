//! Fork/join coordination: task-per-branch scheduling with AND/OR
//! reconvergence.

use crate::dispatch::successor;
use crate::step::StepEngine;
use cascade_core::ComponentId;
use cascade_eventbus::ExecutionEvent;
use cascade_execution::{
    AuditAction, AuditEntry, ErrorCode, ExecutionContext, ExecutionError, ResultStatus,
};
use cascade_flow::{Component, ComponentType, Flow, JoinMode};
use cascade_value::Object;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How one branch task ended.
pub(crate) enum BranchEnd {
    /// The branch reached the section's join; its context carries the
    /// branch's writes and audit tail.
    Joined(ExecutionContext),
    /// The branch observed cancellation and exited silently.
    Cancelled,
}

type BranchResult = Result<BranchEnd, ExecutionError>;

/// Run a fork section: spawn one task per branch, wait according to
/// the join's mode, and return the merged context positioned at the
/// join component (which the caller then dispatches exactly once).
///
/// Boxed because nested forks recurse through [`run_branch`].
pub(crate) fn fork_section(
    engine: StepEngine,
    flow: std::sync::Arc<Flow>,
    fork_id: ComponentId,
    context: ExecutionContext,
    cancellation: CancellationToken,
    max_iterations: u64,
) -> BoxFuture<'static, Result<ExecutionContext, ExecutionError>> {
    Box::pin(async move {
        let fork = flow
            .component(&fork_id)
            .cloned()
            .ok_or_else(|| {
                ExecutionError::new(
                    ErrorCode::InvalidSuccessor,
                    format!("fork {fork_id} does not exist in flow {}", flow.id),
                )
            })?;
        let execution_id = context.execution_id;
        let branch_count = fork.branch_count();

        let join_id = find_matching_join(&flow, &fork)?;
        let join = flow
            .component(&join_id)
            .cloned()
            .ok_or_else(|| {
                ExecutionError::new(
                    ErrorCode::InvalidSuccessor,
                    format!("join {join_id} does not exist in flow {}", flow.id),
                )
            })?;

        engine
            .limiter
            .record_parallel_branches(execution_id, branch_count as u64)
            .map_err(|e| ExecutionError::from(e).at(fork_id.clone()))?;
        engine
            .limiter
            .record_recursion_enter(execution_id)
            .map_err(|e| ExecutionError::from(e).at(fork_id.clone()))?;

        let section = run_section(
            &engine,
            &flow,
            &fork,
            &join,
            context,
            &cancellation,
            max_iterations,
        )
        .await;

        // Bookkeeping is unconditional: the section may have failed.
        let _ = engine.limiter.record_branches_done(execution_id, branch_count as u64);
        let _ = engine.limiter.record_recursion_exit(execution_id);

        section
    })
}

/// The section body: fork bookkeeping, branch tasks, join wait, merge.
async fn run_section(
    engine: &StepEngine,
    flow: &std::sync::Arc<Flow>,
    fork: &Component,
    join: &Component,
    context: ExecutionContext,
    cancellation: &CancellationToken,
    max_iterations: u64,
) -> Result<ExecutionContext, ExecutionError> {
    let execution_id = context.execution_id;
    let section_started = Instant::now();

    // The fork node's own enter/exit brackets the whole section.
    engine.emit(&ExecutionEvent::ComponentEnter {
        execution_id,
        component_id: fork.id.clone(),
    });
    engine.limiter.record_step(execution_id)?;
    let enter = AuditEntry::component(
        AuditAction::ComponentEnter,
        fork.id.clone(),
        context.variables.clone(),
        format!("forking {} branches", fork.branch_count()),
    );
    let ctx = engine.audit(context, enter)?;

    let entries: Vec<ComponentId> = (0..fork.branch_count())
        .map(|i| successor(flow, fork, &format!("branch_{i}")))
        .collect::<Result<_, _>>()?;

    let branch_cancel = cancellation.child_token();
    let mut pending: FuturesUnordered<JoinHandle<BranchResult>> = entries
        .iter()
        .map(|entry| {
            tokio::spawn(run_branch(
                engine.clone(),
                std::sync::Arc::clone(flow),
                ctx.fork_branch(entry.clone()),
                join.id.clone(),
                branch_cancel.clone(),
                max_iterations,
            ))
        })
        .collect();

    let mode = join.join_mode();
    let deadline = join.timeout_ms().map(Duration::from_millis);

    let mut arrivals: Vec<ExecutionContext> = Vec::with_capacity(entries.len());
    let mut first_error: Option<ExecutionError> = None;
    let mut winner: Option<ExecutionContext> = None;
    let mut timed_out = false;

    while !pending.is_empty() {
        let next = match deadline {
            Some(limit) if !timed_out => {
                let remaining = limit.saturating_sub(section_started.elapsed());
                match cascade_resilience::timeout(remaining, pending.next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        // Join timeout: cancel stragglers and drain them
                        // without a deadline so they can exit.
                        timed_out = true;
                        branch_cancel.cancel();
                        continue;
                    }
                }
            }
            _ => pending.next().await,
        };

        let Some(joined) = next else { break };
        let outcome = joined.unwrap_or_else(|join_err| {
            Err(ExecutionError::new(
                ErrorCode::ExecutionException,
                format!("branch task failed: {join_err}"),
            ))
        });

        match outcome {
            Ok(BranchEnd::Joined(branch_ctx)) => match mode {
                JoinMode::And => arrivals.push(branch_ctx),
                JoinMode::Or => {
                    if winner.is_none() {
                        winner = Some(branch_ctx);
                        branch_cancel.cancel();
                    }
                }
            },
            Ok(BranchEnd::Cancelled) => {}
            Err(error) => {
                // A branch cancelled by this coordinator is not a
                // failure of its own.
                if error.code == ErrorCode::Cancelled && branch_cancel.is_cancelled() {
                    continue;
                }
                if first_error.is_none() {
                    first_error = Some(error);
                }
                // AND needs every branch, so one failure dooms the
                // section and the stragglers are cancelled. OR keeps
                // waiting: a later success can still win.
                if mode == JoinMode::And {
                    branch_cancel.cancel();
                }
            }
        }
    }

    let section_result: Result<ExecutionContext, ExecutionError> = (|| {
        if cancellation.is_cancelled() {
            return Err(ExecutionError::cancelled().at(fork.id.clone()));
        }

        match mode {
            JoinMode::And => {
                if let Some(error) = first_error {
                    return Err(error);
                }
                if timed_out {
                    return Err(ExecutionError::new(
                        ErrorCode::JoinTimeout,
                        format!("join {} timed out waiting for branches", join.id),
                    )
                    .at(join.id.clone()));
                }
                // Merge branch deltas last-writer-wins in completion
                // order, recording that order in the audit trail.
                let mut merged = ctx.clone();
                for branch_ctx in &arrivals {
                    let delta = branch_delta(&ctx.variables, &branch_ctx.variables);
                    merged = merged
                        .with_variables(&delta)
                        .with_audit_tail(&branch_ctx.audit_trail);
                    let completed = AuditEntry::component(
                        AuditAction::BranchCompleted,
                        join.id.clone(),
                        merged.variables.clone(),
                        format!("merged {} variables from a branch", delta.len()),
                    );
                    merged = engine.audit(merged, completed)?;
                }
                Ok(merged)
            }
            JoinMode::Or => match winner {
                Some(winner_ctx) => {
                    let delta = branch_delta(&ctx.variables, &winner_ctx.variables);
                    let mut merged = ctx
                        .clone()
                        .with_variables(&delta)
                        .with_audit_tail(&winner_ctx.audit_trail);
                    let completed = AuditEntry::component(
                        AuditAction::BranchCompleted,
                        join.id.clone(),
                        merged.variables.clone(),
                        "first successful branch won the OR join",
                    );
                    merged = engine.audit(merged, completed)?;
                    Ok(merged)
                }
                None => {
                    if let Some(error) = first_error {
                        return Err(error);
                    }
                    if timed_out {
                        return Err(ExecutionError::new(
                            ErrorCode::JoinTimeout,
                            format!("join {} timed out waiting for a branch", join.id),
                        )
                        .at(join.id.clone()));
                    }
                    Err(ExecutionError::new(
                        ErrorCode::ExecutionException,
                        format!("no branch reached join {}", join.id),
                    )
                    .at(join.id.clone()))
                }
            },
        }
    })();

    let duration_ms = section_started.elapsed().as_millis() as u64;
    match section_result {
        Ok(merged) => {
            engine.emit(&ExecutionEvent::ComponentExit {
                execution_id,
                component_id: fork.id.clone(),
                result: ResultStatus::Success,
                duration_ms,
            });
            let exit = AuditEntry::component(
                AuditAction::ComponentExit,
                fork.id.clone(),
                merged.variables.clone(),
                "",
            );
            let merged = engine.audit(merged, exit)?;
            Ok(merged.with_current_component(Some(join.id.clone())))
        }
        Err(error) => {
            engine.emit(&ExecutionEvent::ComponentExit {
                execution_id,
                component_id: fork.id.clone(),
                result: ResultStatus::Failure,
                duration_ms,
            });
            Err(error)
        }
    }
}

/// One branch task: step from the branch entry until the section's
/// join is the current component, observing cancellation at every
/// iteration. Boxed for nested-fork recursion.
fn run_branch(
    engine: StepEngine,
    flow: std::sync::Arc<Flow>,
    mut context: ExecutionContext,
    join_id: ComponentId,
    cancellation: CancellationToken,
    max_iterations: u64,
) -> BoxFuture<'static, BranchResult> {
    Box::pin(async move {
        let mut iterations = 0u64;
        loop {
            if cancellation.is_cancelled() {
                return Ok(BranchEnd::Cancelled);
            }
            iterations += 1;
            if iterations > max_iterations {
                return Err(ExecutionError::new(
                    ErrorCode::MaxIterationsExceeded,
                    format!("branch exceeded {max_iterations} iterations"),
                ));
            }
            engine.limiter.check_all(context.execution_id)?;

            let current = context.current_component_id.clone().ok_or_else(|| {
                ExecutionError::new(
                    ErrorCode::ExecutionException,
                    "branch context lost its current component",
                )
            })?;
            if current == join_id {
                return Ok(BranchEnd::Joined(context));
            }

            let component = flow.component(&current).ok_or_else(|| {
                ExecutionError::new(
                    ErrorCode::InvalidSuccessor,
                    format!("component {current} does not exist in flow {}", flow.id),
                )
                .at(current.clone())
            })?;

            match component.component_type {
                ComponentType::Fork => {
                    context = fork_section(
                        engine.clone(),
                        std::sync::Arc::clone(&flow),
                        current,
                        context,
                        cancellation.clone(),
                        max_iterations,
                    )
                    .await?;
                    // The nested section leaves us at the nested join;
                    // dispatch it like any other component next loop.
                }
                ComponentType::End => {
                    return Err(ExecutionError::new(
                        ErrorCode::InvalidSuccessor,
                        format!(
                            "fork branch reached END {} before join {join_id}; \
                             branches must reconverge",
                            component.id
                        ),
                    )
                    .at(component.id.clone()));
                }
                _ => {
                    let outcome = engine.step(&flow, &context, &cancellation).await?;
                    context = outcome.context;
                }
            }
        }
    })
}

/// Changed-or-new keys of `branch` relative to `parent`: the branch's
/// writes, free of the shared baseline.
fn branch_delta(parent: &Object, branch: &Object) -> Object {
    branch
        .entries()
        .filter(|(key, value)| parent.get(key) != Some(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Statically locate the join that reconverges a fork's branches.
///
/// Breadth-first walk from each branch entry; passing a nested fork
/// raises the depth, passing its join lowers it, and the first join
/// met at depth zero is that branch's reconvergence point. All
/// branches must agree on it.
fn find_matching_join(flow: &Flow, fork: &Component) -> Result<ComponentId, ExecutionError> {
    let mut section_join: Option<ComponentId> = None;

    for i in 0..fork.branch_count() {
        let entry = successor(flow, fork, &format!("branch_{i}"))?;
        let found = first_join_from(flow, &entry).ok_or_else(|| {
            ExecutionError::new(
                ErrorCode::InvalidSuccessor,
                format!("branch_{i} of fork {} never reaches a JOIN", fork.id),
            )
            .at(fork.id.clone())
        })?;

        match &section_join {
            None => section_join = Some(found),
            Some(expected) if *expected == found => {}
            Some(expected) => {
                return Err(ExecutionError::new(
                    ErrorCode::InvalidSuccessor,
                    format!(
                        "fork {} branches reconverge on different joins ({expected} and {found})",
                        fork.id
                    ),
                )
                .at(fork.id.clone()));
            }
        }
    }

    section_join.ok_or_else(|| {
        ExecutionError::new(
            ErrorCode::InvalidSuccessor,
            format!("fork {} has no branches", fork.id),
        )
        .at(fork.id.clone())
    })
}

fn first_join_from(flow: &Flow, entry: &ComponentId) -> Option<ComponentId> {
    let mut queue: VecDeque<(ComponentId, usize)> = VecDeque::new();
    let mut visited: HashSet<(ComponentId, usize)> = HashSet::new();
    queue.push_back((entry.clone(), 0));

    while let Some((id, depth)) = queue.pop_front() {
        if !visited.insert((id.clone(), depth)) {
            continue;
        }
        let Some(component) = flow.component(&id) else {
            continue;
        };

        match component.component_type {
            ComponentType::Join if depth == 0 => return Some(id),
            ComponentType::Join => {
                for connection in flow.connections_from(&id, "out") {
                    queue.push_back((connection.target_component_id.clone(), depth - 1));
                }
            }
            ComponentType::Fork => {
                for port in component.output_ports() {
                    for connection in flow.connections_from(&id, port.id.as_str()) {
                        queue.push_back((connection.target_component_id.clone(), depth + 1));
                    }
                }
            }
            _ => {
                for port in component.output_ports() {
                    for connection in flow.connections_from(&id, port.id.as_str()) {
                        queue.push_back((connection.target_component_id.clone(), depth));
                    }
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_flow::Connection;
    use cascade_value::Value;
    use pretty_assertions::assert_eq;

    fn component(id: &str, ty: ComponentType) -> Component {
        Component::new(id, id, ty)
    }

    fn diamond() -> Flow {
        Flow::new(
            "f",
            "Diamond",
            "1",
            vec![
                component("start", ComponentType::Start),
                component("fork", ComponentType::Fork),
                component("join", ComponentType::Join),
                component("end", ComponentType::End),
            ],
            vec![
                Connection::new("c1", "start", "out", "fork", "in"),
                Connection::new("c2", "fork", "branch_0", "join", "in"),
                Connection::new("c3", "fork", "branch_1", "join", "in"),
                Connection::new("c4", "join", "out", "end", "in"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn finds_direct_join() {
        let flow = diamond();
        let fork = flow.component(&ComponentId::new("fork")).unwrap();
        assert_eq!(
            find_matching_join(&flow, fork).unwrap(),
            ComponentId::new("join")
        );
    }

    #[test]
    fn nested_fork_scans_past_inner_join() {
        // outer fork -> branch_0 -> inner fork -> inner join -> outer join
        //            -> branch_1 ----------------------------> outer join
        let flow = Flow::new(
            "f",
            "Nested",
            "1",
            vec![
                component("start", ComponentType::Start),
                component("outer", ComponentType::Fork),
                component("inner", ComponentType::Fork),
                component("inner-join", ComponentType::Join),
                component("outer-join", ComponentType::Join),
                component("end", ComponentType::End),
            ],
            vec![
                Connection::new("c1", "start", "out", "outer", "in"),
                Connection::new("c2", "outer", "branch_0", "inner", "in"),
                Connection::new("c3", "inner", "branch_0", "inner-join", "in"),
                Connection::new("c4", "inner", "branch_1", "inner-join", "in"),
                Connection::new("c5", "inner-join", "out", "outer-join", "in"),
                Connection::new("c6", "outer", "branch_1", "outer-join", "in"),
                Connection::new("c7", "outer-join", "out", "end", "in"),
            ],
        )
        .unwrap();

        let outer = flow.component(&ComponentId::new("outer")).unwrap();
        assert_eq!(
            find_matching_join(&flow, outer).unwrap(),
            ComponentId::new("outer-join")
        );

        let inner = flow.component(&ComponentId::new("inner")).unwrap();
        assert_eq!(
            find_matching_join(&flow, inner).unwrap(),
            ComponentId::new("inner-join")
        );
    }

    #[test]
    fn branch_without_join_is_invalid() {
        // branch_1 dead-ends at an action with no join downstream.
        let flow = Flow::new(
            "f",
            "NoJoin",
            "1",
            vec![
                component("start", ComponentType::Start),
                component("fork", ComponentType::Fork),
                component("join", ComponentType::Join),
                component("end", ComponentType::End),
                component("stray", ComponentType::End),
            ],
            vec![
                Connection::new("c1", "start", "out", "fork", "in"),
                Connection::new("c2", "fork", "branch_0", "join", "in"),
                Connection::new("c3", "fork", "branch_1", "stray", "in"),
                Connection::new("c4", "join", "out", "end", "in"),
            ],
        )
        .unwrap();

        let fork = flow.component(&ComponentId::new("fork")).unwrap();
        let err = find_matching_join(&flow, fork).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSuccessor);
    }

    #[test]
    fn branch_delta_keeps_only_writes() {
        let parent = Object::new()
            .insert("shared", Value::number(1.0))
            .insert("touched", Value::string("old"));
        let branch = parent
            .insert("touched", Value::string("new"))
            .insert("fresh", Value::boolean(true));

        let delta = branch_delta(&parent, &branch);
        assert_eq!(delta.len(), 2);
        assert_eq!(delta.get("touched"), Some(&Value::string("new")));
        assert_eq!(delta.get("fresh"), Some(&Value::boolean(true)));
        assert!(delta.get("shared").is_none());
    }
}
