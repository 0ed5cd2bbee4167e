//! Components: the typed nodes of a flow graph.

use crate::port::Port;
use cascade_core::ComponentId;
use cascade_value::Property;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known port names. Successor resolution and dispatch key off
/// these, so they live in one place.
pub(crate) mod ports {
    pub const IN: &str = "in";
    pub const OUT: &str = "out";
    pub const SUCCESS: &str = "success";
    pub const ERROR: &str = "error";
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
    pub const BRANCH_PREFIX: &str = "branch_";
}

/// The discriminant of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    /// Entry point. Exactly one per flow.
    Start,
    /// Terminal. The first End reached completes the run.
    End,
    /// Invokes a named host service method.
    Action,
    /// Two-way branch on a boolean condition.
    Decision,
    /// Iteration construct. Recognized but not executable.
    Loop,
    /// Multi-way branch. Recognized but not executable.
    Switch,
    /// Value transformation. Recognized but not executable.
    Transform,
    /// Variable assignment. Recognized but not executable.
    Variable,
    /// Nested flow invocation. Recognized but not executable.
    Subflow,
    /// Splits control into N concurrent branches.
    Fork,
    /// Reconverges fork branches under AND or OR semantics.
    Join,
}

impl ComponentType {
    /// Returns `true` for types the dispatcher can execute. The
    /// remaining types parse and validate but are rejected at dispatch
    /// with `UNSUPPORTED_COMPONENT_TYPE`.
    #[must_use]
    pub const fn is_executable(&self) -> bool {
        matches!(
            self,
            Self::Start | Self::End | Self::Action | Self::Decision | Self::Fork | Self::Join
        )
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::End => "END",
            Self::Action => "ACTION",
            Self::Decision => "DECISION",
            Self::Loop => "LOOP",
            Self::Switch => "SWITCH",
            Self::Transform => "TRANSFORM",
            Self::Variable => "VARIABLE",
            Self::Subflow => "SUBFLOW",
            Self::Fork => "FORK",
            Self::Join => "JOIN",
        };
        f.write_str(name)
    }
}

/// How a Join reconverges its fork's branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinMode {
    /// Wait for every branch; merge variables in completion order.
    #[default]
    And,
    /// First successful branch wins; the rest are cancelled.
    Or,
}

/// A typed node in a flow graph.
///
/// Behavior-specific configuration lives in `properties`; the typed
/// accessors below read the well-known ones. Properties are fixed for
/// the life of the flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Identifier, unique within the flow.
    pub id: ComponentId,
    /// Display name.
    pub name: String,
    /// The component's type, which determines its ports and dispatch.
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Configuration properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Property>,
    /// Free-form metadata (editor coordinates, notes, …). Not
    /// interpreted by the engine.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Component {
    /// Create a component with no properties.
    #[must_use]
    pub fn new(id: impl Into<ComponentId>, name: impl Into<String>, ty: ComponentType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            component_type: ty,
            properties: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Builder-style property insertion.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Property) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Get a property by name.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    /// The input port set for this component's type.
    #[must_use]
    pub fn input_ports(&self) -> Vec<Port> {
        match self.component_type {
            ComponentType::Start => vec![],
            _ => vec![Port::control_in(ports::IN)],
        }
    }

    /// The output port set for this component's type. A Fork's port set
    /// depends on its `branchCount` property.
    #[must_use]
    pub fn output_ports(&self) -> Vec<Port> {
        match self.component_type {
            ComponentType::End => vec![],
            ComponentType::Action => vec![
                Port::control_out(ports::SUCCESS),
                Port::optional_control_out(ports::ERROR),
            ],
            ComponentType::Decision => vec![
                Port::control_out(ports::TRUE),
                Port::control_out(ports::FALSE),
            ],
            ComponentType::Fork => (0..self.branch_count())
                .map(|i| Port::control_out(&format!("{}{i}", ports::BRANCH_PREFIX)))
                .collect(),
            _ => vec![Port::control_out(ports::OUT)],
        }
    }

    /// Find a port (input or output) by id.
    #[must_use]
    pub fn port(&self, id: &str) -> Option<Port> {
        self.input_ports()
            .into_iter()
            .chain(self.output_ports())
            .find(|p| p.id.as_str() == id)
    }

    /// Fork branch count from the `branchCount` property (default 2,
    /// minimum 1).
    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.property("branchCount")
            .and_then(Property::as_number)
            .map_or(2, |n| (n as usize).max(1))
    }

    /// Join mode from the `joinMode` property (default AND).
    #[must_use]
    pub fn join_mode(&self) -> JoinMode {
        match self.property("joinMode").and_then(Property::as_str) {
            Some("OR" | "or") => JoinMode::Or,
            _ => JoinMode::And,
        }
    }

    /// Join timeout from the `timeoutMs` property.
    #[must_use]
    pub fn timeout_ms(&self) -> Option<u64> {
        self.property("timeoutMs")
            .and_then(Property::as_number)
            .filter(|n| *n > 0.0)
            .map(|n| n as u64)
    }

    /// Decision condition source. A condition is inherently an
    /// expression, so both the `=`-prefixed and plain string forms are
    /// accepted.
    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        let prop = self.property("condition")?;
        prop.expression_source().or_else(|| prop.as_str())
    }

    /// Action service name.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.property("service").and_then(Property::as_str)
    }

    /// Action method name.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.property("method").and_then(Property::as_str)
    }

    /// Variable name an Action stores its result under.
    #[must_use]
    pub fn result_variable(&self) -> Option<&str> {
        self.property("resultVariable").and_then(Property::as_str)
    }

    /// Variable name an Action stores a handler error under.
    #[must_use]
    pub fn error_variable(&self) -> Option<&str> {
        self.property("errorVariable").and_then(Property::as_str)
    }

    /// The `initialVariables` property of a Start component, if present
    /// and object-typed.
    #[must_use]
    pub fn initial_variables(&self) -> Option<&Property> {
        self.property("initialVariables")
            .filter(|p| matches!(p, Property::Object(_)))
    }

    /// Names listed in an End component's `outputVariables` property.
    #[must_use]
    pub fn output_variables(&self) -> Vec<&str> {
        self.property("outputVariables")
            .into_iter()
            .flat_map(|p| match p {
                Property::Array(items) => items.iter().filter_map(Property::as_str).collect(),
                _ => Vec::new(),
            })
            .collect()
    }
}
