//! Flow validation errors.

use cascade_core::{ComponentId, ConnectionId};
use thiserror::Error;

/// Errors produced by [`Flow::new`](crate::Flow::new) validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    /// The flow id, name, or a component/connection id was blank.
    #[error("blank identifier: {0}")]
    BlankId(String),

    /// The flow has no Start component or more than one.
    #[error("flow must have exactly one START component, found {0}")]
    StartCount(usize),

    /// The flow has no End component.
    #[error("flow must have at least one END component")]
    NoEnd,

    /// Two components share an id.
    #[error("duplicate component id: {0}")]
    DuplicateComponentId(ComponentId),

    /// Two connections share an id.
    #[error("duplicate connection id: {0}")]
    DuplicateConnectionId(ConnectionId),

    /// A connection names a component that does not exist.
    #[error("connection {connection} references unknown component {component}")]
    UnknownComponent {
        /// The offending connection.
        connection: ConnectionId,
        /// The missing component id.
        component: ComponentId,
    },

    /// A connection names a port its component does not expose.
    #[error("connection {connection} references unknown port {port} on component {component}")]
    UnknownPort {
        /// The offending connection.
        connection: ConnectionId,
        /// The component whose port set was searched.
        component: ComponentId,
        /// The missing port id.
        port: String,
    },

    /// A connection's source port is not an output, or its target port
    /// is not an input.
    #[error("connection {connection} must run from an output port to an input port")]
    WrongDirection {
        /// The offending connection.
        connection: ConnectionId,
    },

    /// A connection's source and target are the same component.
    #[error("connection {0} connects a component to itself")]
    SelfConnection(ConnectionId),

    /// A control output port has more than one outgoing connection.
    #[error("control output {port} of component {component} fans out more than once")]
    ControlFanOut {
        /// The component whose port fans out.
        component: ComponentId,
        /// The offending port id.
        port: String,
    },

    /// A component is missing a property its type requires.
    #[error("component {component} ({component_type}) is missing required property {property}")]
    MissingProperty {
        /// The offending component.
        component: ComponentId,
        /// Its type, for the message.
        component_type: String,
        /// The property name the type requires.
        property: &'static str,
    },
}
