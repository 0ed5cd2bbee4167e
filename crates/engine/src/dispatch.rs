//! Per-type component dispatch: the "advance one component" semantics.

use crate::service::ServiceError;
use crate::step::StepEngine;
use cascade_core::ComponentId;
use cascade_eventbus::ExecutionEvent;
use cascade_execution::{
    AuditAction, AuditEntry, ErrorCode, ExecutionContext, ExecutionError, ExecutionStatus,
    ResultStatus,
};
use cascade_flow::{Component, ComponentType, Flow};
use cascade_value::{Object, Property, Value};
use tokio_util::sync::CancellationToken;

/// The outcome of advancing one component.
pub(crate) struct Advance {
    /// The context after the advance.
    pub context: ExecutionContext,
    /// True when the advanced component was an End.
    pub complete: bool,
    /// Output variables collected by an End component.
    pub outputs: Object,
    /// How the component's own work ended, for the exit event.
    pub result: ResultStatus,
}

impl Advance {
    fn proceed(context: ExecutionContext) -> Self {
        Self {
            context,
            complete: false,
            outputs: Object::new(),
            result: ResultStatus::Success,
        }
    }
}

/// Advance one component. Forks are deliberately absent: the executor
/// coordinates fork sections before the step engine ever sees one.
pub(crate) async fn advance(
    engine: &StepEngine,
    flow: &Flow,
    component: &Component,
    context: &ExecutionContext,
    cancellation: &CancellationToken,
) -> Result<Advance, ExecutionError> {
    match component.component_type {
        ComponentType::Start => advance_start(engine, flow, component, context),
        ComponentType::End => advance_end(component, context),
        ComponentType::Action => {
            advance_action(engine, flow, component, context, cancellation).await
        }
        ComponentType::Decision => advance_decision(engine, flow, component, context),
        ComponentType::Join => {
            // Branch coordination already happened; the join itself
            // just hands control to its successor.
            let next = successor(flow, component, "out")?;
            Ok(Advance::proceed(
                context.with_current_component(Some(next)),
            ))
        }
        ComponentType::Fork => Err(ExecutionError::new(
            ErrorCode::ExecutionException,
            "fork sections are coordinated by the executor, not the step engine",
        )
        .at(component.id.clone())),
        unsupported => Err(ExecutionError::new(
            ErrorCode::UnsupportedComponentType,
            format!(
                "component type {unsupported} has no runtime semantics; \
                 remove component {} or replace it with a supported type",
                component.id
            ),
        )
        .at(component.id.clone())),
    }
}

fn advance_start(
    engine: &StepEngine,
    flow: &Flow,
    component: &Component,
    context: &ExecutionContext,
) -> Result<Advance, ExecutionError> {
    let mut ctx = context.clone();

    if let Some(property) = component.initial_variables() {
        let seeded = resolve_property(engine, property, &ctx.variables)
            .map_err(|e| e.at(component.id.clone()))?;
        if let Value::Object(vars) = seeded {
            for (name, value) in vars.entries() {
                ctx = write_variable(engine, ctx, &component.id, name, value.clone())
                    .map_err(|e| e.at(component.id.clone()))?;
            }
        }
    }

    let next = successor(flow, component, "out")?;
    Ok(Advance::proceed(ctx.with_current_component(Some(next))))
}

fn advance_end(component: &Component, context: &ExecutionContext) -> Result<Advance, ExecutionError> {
    let mut outputs = Object::new();
    for name in component.output_variables() {
        if let Some(value) = context.variables.get(name) {
            outputs = outputs.insert(name, value.clone());
        }
    }

    let ctx = context
        .with_current_component(None)
        .with_status(ExecutionStatus::Completed);

    Ok(Advance {
        context: ctx,
        complete: true,
        outputs,
        result: ResultStatus::Success,
    })
}

async fn advance_action(
    engine: &StepEngine,
    flow: &Flow,
    component: &Component,
    context: &ExecutionContext,
    cancellation: &CancellationToken,
) -> Result<Advance, ExecutionError> {
    let service_name = component.service().ok_or_else(|| {
        ExecutionError::new(ErrorCode::ExecutionException, "action lost its service property")
            .at(component.id.clone())
    })?;
    let method = component.method().ok_or_else(|| {
        ExecutionError::new(ErrorCode::ExecutionException, "action lost its method property")
            .at(component.id.clone())
    })?;

    let service = engine.services.get(service_name).ok_or_else(|| {
        ExecutionError::new(
            ErrorCode::ServiceNotFound,
            format!("no host service registered under {service_name:?}"),
        )
        .at(component.id.clone())
    })?;

    let parameters = match component.property("parameters") {
        Some(property) => resolve_property(engine, property, &context.variables)
            .map_err(|e| e.at(component.id.clone()))?,
        None => Value::Null,
    };

    // The sandbox refusal is shaped like a handler error so a
    // connected error port can observe and route it.
    let outcome = match engine.sandbox.permits(&service.capabilities()) {
        Err(capability) => Err(ServiceError::new(
            "SERVICE_BLOCKED",
            format!("sandbox policy denies {capability} to service {service_name:?}"),
        )),
        Ok(()) => {
            tokio::select! {
                () = cancellation.cancelled() => {
                    return Err(ExecutionError::cancelled().at(component.id.clone()));
                }
                result = service.call(method, parameters, context) => result,
            }
        }
    };

    match outcome {
        Ok(value) => {
            let mut ctx = context.clone();
            if let Some(name) = component.result_variable() {
                ctx = write_variable(engine, ctx, &component.id, name, value.clone())
                    .map_err(|e| e.at(component.id.clone()))?;
            }
            let completed = AuditEntry::component(
                AuditAction::ComponentCompleted,
                component.id.clone(),
                ctx.variables.clone(),
                format!("{service_name}.{method} succeeded"),
            )
            .with_result(value);
            ctx = engine.audit(ctx, completed)?;

            let next = successor(flow, component, "success")?;
            Ok(Advance::proceed(ctx.with_current_component(Some(next))))
        }
        Err(service_err) => {
            let failed = AuditEntry::component(
                AuditAction::ComponentFailed,
                component.id.clone(),
                context.variables.clone(),
                service_err.to_string(),
            );
            let mut ctx = engine.audit(context.clone(), failed)?;

            match flow.sole_target(&component.id, "error") {
                Some(next) => {
                    if let Some(name) = component.error_variable() {
                        ctx = write_variable(engine, ctx, &component.id, name, service_err.to_value())
                            .map_err(|e| e.at(component.id.clone()))?;
                    }
                    Ok(Advance {
                        context: ctx.with_current_component(Some(next.clone())),
                        complete: false,
                        outputs: Object::new(),
                        result: ResultStatus::Failure,
                    })
                }
                None => Err(ExecutionError::new(
                    ErrorCode::HostServiceFailure,
                    service_err.to_string(),
                )
                .at(component.id.clone())),
            }
        }
    }
}

fn advance_decision(
    engine: &StepEngine,
    flow: &Flow,
    component: &Component,
    context: &ExecutionContext,
) -> Result<Advance, ExecutionError> {
    let condition = component.condition().ok_or_else(|| {
        ExecutionError::new(ErrorCode::ExecutionException, "decision lost its condition property")
            .at(component.id.clone())
    })?;

    let value = engine
        .evaluate(condition, &context.variables)
        .map_err(|e| e.at(component.id.clone()))?;

    // Truthiness is strictly Boolean; nothing else ever coerces.
    let Some(taken) = value.as_boolean() else {
        return Err(ExecutionError::new(
            ErrorCode::DecisionTypeError,
            format!(
                "condition {condition:?} evaluated to {} ({}), expected boolean",
                value,
                value.kind()
            ),
        )
        .at(component.id.clone()));
    };

    engine.emit(&ExecutionEvent::DecisionEvaluated {
        execution_id: context.execution_id,
        component_id: component.id.clone(),
        condition: condition.to_string(),
        result: taken,
    });
    let evaluated = AuditEntry::component(
        AuditAction::DecisionEvaluated,
        component.id.clone(),
        context.variables.clone(),
        condition.to_string(),
    )
    .with_result(Value::boolean(taken));
    let ctx = engine.audit(context.clone(), evaluated)?;

    let port = if taken { "true" } else { "false" };
    let next = successor(flow, component, port)?;
    Ok(Advance::proceed(ctx.with_current_component(Some(next))))
}

/// Resolve the unique downstream component of an output port.
pub(crate) fn successor(
    flow: &Flow,
    component: &Component,
    port: &str,
) -> Result<ComponentId, ExecutionError> {
    flow.sole_target(&component.id, port).cloned().ok_or_else(|| {
        ExecutionError::new(
            ErrorCode::NoOutgoingConnection,
            format!("output port {port:?} of component {} is not connected", component.id),
        )
        .at(component.id.clone())
    })
}

/// Resolve a property to a value, evaluating deferred expressions
/// (recursively, for object/array properties) against the variables.
pub(crate) fn resolve_property(
    engine: &StepEngine,
    property: &Property,
    variables: &Object,
) -> Result<Value, ExecutionError> {
    match property {
        Property::String(s) => Ok(Value::string(s)),
        Property::Number(n) => Ok(Value::number(*n)),
        Property::Boolean(b) => Ok(Value::boolean(*b)),
        Property::Expression(source) => engine.evaluate(source, variables),
        Property::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), resolve_property(engine, v, variables)?)))
            .collect::<Result<_, ExecutionError>>()
            .map(Value::Object),
        Property::Array(items) => items
            .iter()
            .map(|item| resolve_property(engine, item, variables))
            .collect::<Result<_, ExecutionError>>()
            .map(Value::Array),
    }
}

/// Write one variable with full bookkeeping: per-variable size quota,
/// first-write vs overwrite audit, context-change event, and variable
/// count quota.
pub(crate) fn write_variable(
    engine: &StepEngine,
    context: ExecutionContext,
    component_id: &ComponentId,
    name: &str,
    value: Value,
) -> Result<ExecutionContext, ExecutionError> {
    engine
        .limiter
        .check_variable_size(name.len() as u64 + value.estimated_size())?;

    let existed = context.variables.contains_key(name);
    let next = context.with_variable(name, value);

    // The no-op fast path: identical write, nothing to record.
    if next.variables.ptr_eq(&context.variables) {
        return Ok(next);
    }

    engine
        .limiter
        .record_variable_count(next.execution_id, next.variables.len() as u64)?;

    engine.emit(&ExecutionEvent::ContextChanged {
        execution_id: next.execution_id,
        before: context.variables.clone(),
        after: next.variables.clone(),
        reason: format!("variable {name:?} written by {component_id}"),
    });

    let action = if existed {
        AuditAction::VariableUpdated
    } else {
        AuditAction::VariableChanged
    };
    let entry = AuditEntry::component(action, component_id.clone(), next.variables.clone(), name);
    engine.audit(next, entry)
}
