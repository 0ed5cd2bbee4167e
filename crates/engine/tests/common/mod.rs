//! Shared fixtures for engine integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use cascade_engine::{
    ExecutorConfig, FlowExecutor, FlowExecutorBuilder, HostService, ServiceError,
};
use cascade_eventbus::CollectingObserver;
use cascade_execution::ExecutionContext;
use cascade_flow::{Component, ComponentType, Connection, Flow, JoinMode};
use cascade_value::{Property, Value};
use std::sync::Arc;
use std::time::Duration;

/// A host service for tests:
/// - `echo` returns its parameters,
/// - `fail` returns `{code: NOT_FOUND, message: "k"}`,
/// - `sleep` sleeps `parameters.ms` milliseconds, then returns
///   `parameters.value`.
pub struct TestService;

#[async_trait]
impl HostService for TestService {
    async fn call(
        &self,
        method: &str,
        parameters: Value,
        _context: &ExecutionContext,
    ) -> Result<Value, ServiceError> {
        match method {
            "echo" => Ok(parameters),
            "fail" => Err(ServiceError::new("NOT_FOUND", "k")),
            "sleep" => {
                let ms = parameters
                    .try_get("ms")
                    .ok()
                    .and_then(Value::as_number)
                    .unwrap_or(0.0);
                tokio::time::sleep(Duration::from_millis(ms as u64)).await;
                Ok(parameters.try_get("value").cloned().unwrap_or(Value::Null))
            }
            other => Err(ServiceError::new("UNKNOWN_METHOD", other)),
        }
    }
}

/// Executor wired with [`TestService`] under `"storage"` and a
/// collecting observer; returns both.
pub fn executor(config: ExecutorConfig) -> (FlowExecutor, Arc<CollectingObserver>) {
    let collector = Arc::new(CollectingObserver::new());
    let executor = FlowExecutorBuilder::new()
        .config(config)
        .service("storage", Arc::new(TestService))
        .observer(Arc::clone(&collector) as _)
        .build()
        .expect("default limits are valid");
    (executor, collector)
}

pub fn component(id: &str, ty: ComponentType) -> Component {
    Component::new(id, id, ty)
}

pub fn connect(id: &str, from: &str, port: &str, to: &str) -> Connection {
    Connection::new(id, from, port, to, "in")
}

/// An action invoking `storage.echo` that stores `value` under
/// `result_variable`.
pub fn write_action(id: &str, variable: &str, value: f64) -> Component {
    component(id, ComponentType::Action)
        .with_property("service", Property::String("storage".into()))
        .with_property("method", Property::String("echo".into()))
        .with_property("parameters", Property::Number(value))
        .with_property("resultVariable", Property::String(variable.into()))
}

/// An action invoking `storage.sleep` that stores `value` under
/// `result_variable` after `ms` milliseconds.
pub fn slow_write_action(id: &str, variable: &str, value: f64, ms: u64) -> Component {
    let mut parameters = std::collections::BTreeMap::new();
    parameters.insert("ms".to_string(), Property::Number(ms as f64));
    parameters.insert("value".to_string(), Property::Number(value));
    component(id, ComponentType::Action)
        .with_property("service", Property::String("storage".into()))
        .with_property("method", Property::String("sleep".into()))
        .with_property("parameters", Property::Object(parameters))
        .with_property("resultVariable", Property::String(variable.into()))
}

/// An end component publishing the named variables.
pub fn end_with_outputs(id: &str, outputs: &[&str]) -> Component {
    component(id, ComponentType::End).with_property(
        "outputVariables",
        Property::Array(outputs.iter().map(|o| Property::String((*o).into())).collect()),
    )
}

/// A fork/join diamond: start → fork → (branch components) → join →
/// end publishing `outputs`. Branch `i` is wired from `branch_i`.
pub fn diamond_flow(branches: Vec<Component>, mode: JoinMode, outputs: &[&str]) -> Arc<Flow> {
    let mut components = vec![
        component("start", ComponentType::Start),
        component("fork", ComponentType::Fork)
            .with_property("branchCount", Property::Number(branches.len() as f64)),
        component("join", ComponentType::Join).with_property(
            "joinMode",
            Property::String(if mode == JoinMode::Or { "OR" } else { "AND" }.into()),
        ),
        end_with_outputs("end", outputs),
    ];
    let mut connections = vec![
        connect("c-start", "start", "out", "fork"),
        connect("c-join-end", "join", "out", "end"),
    ];
    for (i, branch) in branches.into_iter().enumerate() {
        let branch_id = branch.id.to_string();
        connections.push(Connection::new(
            format!("c-fork-{i}"),
            "fork",
            format!("branch_{i}"),
            branch_id.as_str(),
            "in",
        ));
        connections.push(Connection::new(
            format!("c-{i}-join"),
            branch_id.as_str(),
            "success",
            "join",
            "in",
        ));
        components.push(branch);
    }

    Arc::new(Flow::new("flow-fork", "Fork flow", "1.0.0", components, connections).unwrap())
}
