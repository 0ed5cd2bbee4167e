//! Ports: named, typed connection points on components.

use cascade_core::PortId;
use serde::{Deserialize, Serialize};

/// The kind of data a port carries. `Control` ports carry the execution
/// token itself rather than a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortType {
    /// Control flow, no payload.
    Control,
    /// String value.
    String,
    /// Numeric value.
    Number,
    /// Boolean value.
    Boolean,
    /// Object value.
    Object,
    /// Array value.
    Array,
    /// Any value.
    Any,
}

/// Whether a port accepts or emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortDirection {
    /// Accepts incoming connections.
    Input,
    /// Emits outgoing connections.
    Output,
}

/// A connection point on a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port identifier, unique within its component.
    pub id: PortId,
    /// Display name.
    pub name: String,
    /// The kind of data carried.
    pub port_type: PortType,
    /// Input or output.
    pub direction: PortDirection,
    /// Whether the port must be connected for the flow to be runnable.
    pub required: bool,
}

impl Port {
    /// A required control input with the given id.
    #[must_use]
    pub fn control_in(id: &str) -> Self {
        Self {
            id: PortId::new(id),
            name: id.to_string(),
            port_type: PortType::Control,
            direction: PortDirection::Input,
            required: true,
        }
    }

    /// A required control output with the given id.
    #[must_use]
    pub fn control_out(id: &str) -> Self {
        Self {
            id: PortId::new(id),
            name: id.to_string(),
            port_type: PortType::Control,
            direction: PortDirection::Output,
            required: true,
        }
    }

    /// An optional control output with the given id.
    #[must_use]
    pub fn optional_control_out(id: &str) -> Self {
        Self {
            required: false,
            ..Self::control_out(id)
        }
    }

    /// Returns `true` for output ports.
    #[must_use]
    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }

    /// Returns `true` for input ports.
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn control_in_shape() {
        let p = Port::control_in("in");
        assert_eq!(p.id.as_str(), "in");
        assert_eq!(p.port_type, PortType::Control);
        assert!(p.is_input());
        assert!(!p.is_output());
        assert!(p.required);
    }

    #[test]
    fn optional_control_out_is_not_required() {
        let p = Port::optional_control_out("error");
        assert!(p.is_output());
        assert!(!p.required);
    }

    #[test]
    fn port_type_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&PortType::Control).unwrap(),
            "\"CONTROL\""
        );
        assert_eq!(
            serde_json::to_string(&PortDirection::Input).unwrap(),
            "\"INPUT\""
        );
    }
}
