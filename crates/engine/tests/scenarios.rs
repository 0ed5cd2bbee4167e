//! End-to-end scenarios over the flow executor.

mod common;

use cascade_core::ComponentId;
use cascade_engine::ExecutorConfig;
use cascade_eventbus::ExecutionEvent;
use cascade_execution::{AuditAction, ErrorCode, ResultStatus};
use cascade_flow::{ComponentType, Flow, JoinMode};
use cascade_limits::{LimitConfig, LimitKind};
use cascade_value::{Object, Property, Value};
use common::{
    component, connect, diamond_flow, end_with_outputs, executor, slow_write_action, write_action,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn minimal_flow() -> Arc<Flow> {
    let mut initial = BTreeMap::new();
    initial.insert("greeting".to_string(), Property::String("hi".into()));

    Arc::new(
        Flow::new(
            "flow-1",
            "Minimal",
            "1.0.0",
            vec![
                component("start", ComponentType::Start)
                    .with_property("initialVariables", Property::Object(initial)),
                end_with_outputs("end", &["greeting"]),
            ],
            vec![connect("conn-1", "start", "out", "end")],
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn minimal_flow_runs_to_success() {
    let (executor, _collector) = executor(ExecutorConfig::default());
    let flow = minimal_flow();

    let (result, context) = executor
        .execute_with_cancellation(&flow, Object::new(), CancellationToken::new())
        .await;

    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(
        result.output_variables.get("greeting"),
        Some(&Value::string("hi"))
    );
    assert!(result.error.is_none());

    // Audit contains the spec'd milestones, in order.
    let actions: Vec<AuditAction> = context.audit_trail.iter().map(|e| e.action).collect();
    let enter_positions: Vec<usize> = actions
        .iter()
        .enumerate()
        .filter(|(_, a)| **a == AuditAction::ComponentEnter)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(actions.first(), Some(&AuditAction::ExecutionStarted));
    assert_eq!(enter_positions.len(), 2, "START and END each entered once");
    assert_eq!(actions.last(), Some(&AuditAction::ExecutionCompleted));

    let entered: Vec<_> = context
        .audit_trail
        .iter()
        .filter(|e| e.action == AuditAction::ComponentEnter)
        .filter_map(|e| e.component_id.clone())
        .collect();
    assert_eq!(entered, vec![ComponentId::new("start"), ComponentId::new("end")]);
}

fn decision_flow(condition: &str) -> Arc<Flow> {
    Arc::new(
        Flow::new(
            "flow-decision",
            "Decision",
            "1.0.0",
            vec![
                component("start", ComponentType::Start),
                component("decision", ComponentType::Decision)
                    .with_property("condition", Property::Expression(condition.into())),
                end_with_outputs("end-a", &["x"]),
                component("end-b", ComponentType::End),
            ],
            vec![
                connect("c1", "start", "out", "decision"),
                connect("c2", "decision", "true", "end-a"),
                connect("c3", "decision", "false", "end-b"),
            ],
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn decision_true_takes_true_branch() {
    let (executor, collector) = executor(ExecutorConfig::default());
    let flow = decision_flow("x > 1");
    let seed = Object::new().insert("x", Value::number(2.0));

    let result = executor.execute(&flow, seed).await;

    assert_eq!(result.status, ResultStatus::Success);
    // Terminated at end-a: the true branch publishes x.
    assert_eq!(result.output_variables.get("x"), Some(&Value::number(2.0)));

    let decisions: Vec<ExecutionEvent> = collector
        .events()
        .into_iter()
        .filter(|e| matches!(e, ExecutionEvent::DecisionEvaluated { .. }))
        .collect();
    assert_eq!(decisions.len(), 1);
    let ExecutionEvent::DecisionEvaluated { condition, result, .. } = &decisions[0] else {
        unreachable!()
    };
    assert_eq!(condition, "x > 1");
    assert!(*result);

    assert_eq!(
        collector.count(|e| e.component_id() == Some(&ComponentId::new("end-a"))
            && matches!(e, ExecutionEvent::ComponentEnter { .. })),
        1
    );
    assert_eq!(
        collector.count(|e| e.component_id() == Some(&ComponentId::new("end-b"))),
        0
    );
}

#[tokio::test]
async fn decision_non_boolean_is_a_type_error() {
    let (executor, _collector) = executor(ExecutorConfig::default());
    let flow = decision_flow("x");
    let seed = Object::new().insert("x", Value::string("not-bool"));

    let result = executor.execute(&flow, seed).await;

    assert_eq!(result.status, ResultStatus::Failure);
    let error = result.error.unwrap();
    assert_eq!(error.code, ErrorCode::DecisionTypeError);
    assert_eq!(error.component_id, Some(ComponentId::new("decision")));
    assert!(result.output_variables.is_empty());
}

#[tokio::test]
async fn action_error_recovers_through_error_port() {
    let (executor, _collector) = executor(ExecutorConfig::default());
    let flow = Arc::new(
        Flow::new(
            "flow-action",
            "Action error",
            "1.0.0",
            vec![
                component("start", ComponentType::Start),
                component("get", ComponentType::Action)
                    .with_property("service", Property::String("storage".into()))
                    .with_property("method", Property::String("fail".into()))
                    .with_property("errorVariable", Property::String("err".into())),
                component("end-ok", ComponentType::End),
                end_with_outputs("end-err", &["err"]),
            ],
            vec![
                connect("c1", "start", "out", "get"),
                connect("c2", "get", "success", "end-ok"),
                connect("c3", "get", "error", "end-err"),
            ],
        )
        .unwrap(),
    );

    let result = executor.execute(&flow, Object::new()).await;

    assert_eq!(result.status, ResultStatus::Success, "error was recovered locally");
    let err_value = result.output_variables.get("err").unwrap();
    let expected = Value::Object(
        Object::new()
            .insert("code", Value::string("NOT_FOUND"))
            .insert("message", Value::string("k")),
    );
    assert_eq!(err_value, &expected);
}

#[tokio::test]
async fn action_error_without_error_port_fails_the_run() {
    let (executor, _collector) = executor(ExecutorConfig::default());
    let flow = Arc::new(
        Flow::new(
            "flow-action",
            "Action error surfaces",
            "1.0.0",
            vec![
                component("start", ComponentType::Start),
                component("get", ComponentType::Action)
                    .with_property("service", Property::String("storage".into()))
                    .with_property("method", Property::String("fail".into())),
                component("end-ok", ComponentType::End),
            ],
            vec![
                connect("c1", "start", "out", "get"),
                connect("c2", "get", "success", "end-ok"),
            ],
        )
        .unwrap(),
    );

    let result = executor.execute(&flow, Object::new()).await;

    assert_eq!(result.status, ResultStatus::Failure);
    let error = result.error.unwrap();
    assert_eq!(error.code, ErrorCode::HostServiceFailure);
    assert!(error.message.contains("NOT_FOUND"));
}

#[tokio::test]
async fn and_join_merges_both_branches() {
    let (executor, collector) = executor(ExecutorConfig::default());
    let flow = diamond_flow(
        vec![
            write_action("write-a", "a", 1.0),
            write_action("write-b", "b", 2.0),
        ],
        JoinMode::And,
        &["a", "b"],
    );

    let result = executor.execute(&flow, Object::new()).await;

    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.output_variables.get("a"), Some(&Value::number(1.0)));
    assert_eq!(result.output_variables.get("b"), Some(&Value::number(2.0)));

    // The join is entered exactly once.
    assert_eq!(
        collector.count(|e| e.component_id() == Some(&ComponentId::new("join"))
            && matches!(e, ExecutionEvent::ComponentEnter { .. })),
        1
    );
}

#[tokio::test]
async fn or_join_keeps_winner_and_cancels_loser() {
    let (executor, _collector) = executor(ExecutorConfig::default());
    let flow = diamond_flow(
        vec![
            slow_write_action("slow", "a", 1.0, 500),
            write_action("fast", "b", 2.0),
        ],
        JoinMode::Or,
        &["a", "b"],
    );

    let (result, context) = executor
        .execute_with_cancellation(&flow, Object::new(), CancellationToken::new())
        .await;

    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.output_variables.get("b"), Some(&Value::number(2.0)));
    assert_eq!(result.output_variables.get("a"), None, "loser writes discarded");

    // The loser's chain never completed: no ComponentCompleted audit
    // entry for the slow action survives into the merged trail.
    assert_eq!(
        context
            .audit_trail
            .iter()
            .filter(|e| e.action == AuditAction::ComponentCompleted
                && e.component_id == Some(ComponentId::new("slow")))
            .count(),
        0
    );
}

#[tokio::test]
async fn cyclic_flow_hits_max_iterations() {
    // A cycle of pass-through joins; generous quotas so the iteration
    // cap is what trips.
    let limits = LimitConfig {
        max_steps: 1_000_000,
        max_audit_entries: 1_000_000,
        max_execution_time: Duration::from_secs(300),
        ..LimitConfig::default()
    };
    let (executor, _collector) = executor(ExecutorConfig {
        limits,
        ..ExecutorConfig::default()
    });

    let flow = Arc::new(
        Flow::new(
            "flow-cycle",
            "Cycle",
            "1.0.0",
            vec![
                component("start", ComponentType::Start),
                component("j1", ComponentType::Join),
                component("j2", ComponentType::Join),
                component("end", ComponentType::End),
            ],
            vec![
                connect("c1", "start", "out", "j1"),
                connect("c2", "j1", "out", "j2"),
                connect("c3", "j2", "out", "j1"),
            ],
        )
        .unwrap(),
    );

    let result = executor.execute(&flow, Object::new()).await;

    assert_eq!(result.status, ResultStatus::Failure);
    assert_eq!(result.error.unwrap().code, ErrorCode::MaxIterationsExceeded);
    assert_eq!(result.metrics.steps, 10_000, "cap trips exactly at the iteration budget");
}

#[tokio::test]
async fn step_quota_stops_a_linear_flow() {
    let limits = LimitConfig {
        max_steps: 3,
        ..LimitConfig::default()
    };
    let (executor, collector) = executor(ExecutorConfig {
        limits,
        ..ExecutorConfig::default()
    });

    // Five components in a line; joins act as pass-throughs.
    let flow = Arc::new(
        Flow::new(
            "flow-linear",
            "Linear",
            "1.0.0",
            vec![
                component("start", ComponentType::Start),
                component("j1", ComponentType::Join),
                component("j2", ComponentType::Join),
                component("j3", ComponentType::Join),
                component("end", ComponentType::End),
            ],
            vec![
                connect("c1", "start", "out", "j1"),
                connect("c2", "j1", "out", "j2"),
                connect("c3", "j2", "out", "j3"),
                connect("c4", "j3", "out", "end"),
            ],
        )
        .unwrap(),
    );

    let result = executor.execute(&flow, Object::new()).await;

    assert_eq!(result.status, ResultStatus::Failure);
    let error = result.error.unwrap();
    assert_eq!(error.code, ErrorCode::ResourceLimitExceeded);
    assert_eq!(error.limit, Some(LimitKind::Steps));

    // Three components fully exited before the quota tripped.
    assert_eq!(
        collector.count(|e| matches!(
            e,
            ExecutionEvent::ComponentExit {
                result: ResultStatus::Success,
                ..
            }
        )),
        3
    );
}
