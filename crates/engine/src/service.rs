//! Host services, the engine's only outward call surface.

use crate::sandbox::ServiceCapabilities;
use async_trait::async_trait;
use cascade_execution::ExecutionContext;
use cascade_value::{Object, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// An error returned by a host service handler.
///
/// Handler errors are data, not control flow: an Action with a
/// connected `"error"` port recovers them locally, storing this value
/// under its `errorVariable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceError {
    /// Machine-readable code (e.g. `NOT_FOUND`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ServiceError {
    /// Create an error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured detail.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The `{code, message}` object stored under an Action's
    /// `errorVariable`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            Object::new()
                .insert("code", Value::string(&self.code))
                .insert("message", Value::string(&self.message)),
        )
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A named host capability (storage, network, navigation, …) the flow
/// can invoke through Action components.
///
/// Handlers may suspend; the executor awaits them under the run's
/// cancellation token. Handlers declare their own thread-safety via the
/// `Send + Sync` bound and their sandbox-relevant capabilities via
/// [`HostService::capabilities`].
#[async_trait]
pub trait HostService: Send + Sync {
    /// Invoke a method on this service.
    async fn call(
        &self,
        method: &str,
        parameters: Value,
        context: &ExecutionContext,
    ) -> Result<Value, ServiceError>;

    /// What the service touches, for sandbox gating. Defaults to
    /// nothing.
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::default()
    }
}

/// Registry mapping service names to handlers.
///
/// Populated before a run and read-only during it.
#[derive(Default, Clone)]
pub struct HostServiceRegistry {
    services: HashMap<String, Arc<dyn HostService>>,
}

impl std::fmt::Debug for HostServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServiceRegistry")
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HostServiceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under a name, replacing any previous handler.
    pub fn register(&mut self, name: impl Into<String>, service: Arc<dyn HostService>) {
        self.services.insert(name.into(), service);
    }

    /// Look up a service by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn HostService>> {
        self.services.get(name)
    }

    /// Registered service names.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.services.keys()
    }
}
