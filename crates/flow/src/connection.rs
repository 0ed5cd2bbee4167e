//! Connections: directed edges between component ports.

use cascade_core::{ComponentId, ConnectionId, PortId};
use serde::{Deserialize, Serialize};

/// A directed edge from a source output port to a target input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Identifier, unique within the flow.
    pub id: ConnectionId,
    /// Component the edge leaves.
    pub source_component_id: ComponentId,
    /// Output port the edge leaves from.
    pub source_port_id: PortId,
    /// Component the edge enters.
    pub target_component_id: ComponentId,
    /// Input port the edge enters at.
    pub target_port_id: PortId,
}

impl Connection {
    /// Create a connection.
    #[must_use]
    pub fn new(
        id: impl Into<ConnectionId>,
        source: impl Into<ComponentId>,
        source_port: impl Into<PortId>,
        target: impl Into<ComponentId>,
        target_port: impl Into<PortId>,
    ) -> Self {
        Self {
            id: id.into(),
            source_component_id: source.into(),
            source_port_id: source_port.into(),
            target_component_id: target.into(),
            target_port_id: target_port.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serde_uses_camel_case() {
        let c = Connection::new("c1", "a", "out", "b", "in");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["sourceComponentId"], "a");
        assert_eq!(json["targetPortId"], "in");
        let back: Connection = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
