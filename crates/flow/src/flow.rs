//! The validated flow graph.

use crate::component::{Component, ComponentType};
use crate::connection::Connection;
use crate::error::FlowError;
use crate::port::PortType;
use cascade_core::{ComponentId, FlowId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A directed graph of components, immutable and structurally valid.
///
/// Construction via [`Flow::new`] checks every invariant the engine
/// relies on; a `Flow` value in hand is proof the topology is sound.
/// Deserialization routes through the same validation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    /// Flow identifier.
    pub id: FlowId,
    /// Display name.
    pub name: String,
    /// Author-assigned version string.
    pub version: String,
    /// The component set.
    pub components: Vec<Component>,
    /// The connection set.
    pub connections: Vec<Connection>,
    /// Free-form metadata. Not interpreted by the engine.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    /// Component index, rebuilt at construction.
    #[serde(skip)]
    index: HashMap<ComponentId, usize>,
}

impl PartialEq for Flow {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.version == other.version
            && self.components == other.components
            && self.connections == other.connections
            && self.metadata == other.metadata
    }
}

impl Flow {
    /// Build and validate a flow.
    pub fn new(
        id: impl Into<FlowId>,
        name: impl Into<String>,
        version: impl Into<String>,
        components: Vec<Component>,
        connections: Vec<Connection>,
    ) -> Result<Self, FlowError> {
        let flow = Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            index: components
                .iter()
                .enumerate()
                .map(|(i, c)| (c.id.clone(), i))
                .collect(),
            components,
            connections,
            metadata: BTreeMap::new(),
        };
        flow.validate()?;
        Ok(flow)
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    fn validate(&self) -> Result<(), FlowError> {
        if self.id.is_blank() {
            return Err(FlowError::BlankId("flow id".into()));
        }

        // Unique, non-blank component ids.
        let mut seen = HashSet::new();
        for component in &self.components {
            if component.id.is_blank() {
                return Err(FlowError::BlankId("component id".into()));
            }
            if !seen.insert(&component.id) {
                return Err(FlowError::DuplicateComponentId(component.id.clone()));
            }
        }

        // Exactly one Start, at least one End.
        let starts = self
            .components
            .iter()
            .filter(|c| c.component_type == ComponentType::Start)
            .count();
        if starts != 1 {
            return Err(FlowError::StartCount(starts));
        }
        if !self
            .components
            .iter()
            .any(|c| c.component_type == ComponentType::End)
        {
            return Err(FlowError::NoEnd);
        }

        // Per-type required properties.
        for component in &self.components {
            let required: &[&'static str] = match component.component_type {
                ComponentType::Action => &["service", "method"],
                ComponentType::Decision => &["condition"],
                _ => &[],
            };
            for property in required {
                if component.property(property).is_none() {
                    return Err(FlowError::MissingProperty {
                        component: component.id.clone(),
                        component_type: component.component_type.to_string(),
                        property,
                    });
                }
            }
        }

        // Connections: unique non-blank ids, endpoints exist, ports
        // exist with the right directions, no self-loops, and control
        // outputs fan out at most once (forks branch through their
        // numbered ports, each of which also connects exactly once).
        let mut seen = HashSet::new();
        let mut fan_out: HashMap<(ComponentId, String), usize> = HashMap::new();
        for connection in &self.connections {
            if connection.id.is_blank() {
                return Err(FlowError::BlankId("connection id".into()));
            }
            if !seen.insert(&connection.id) {
                return Err(FlowError::DuplicateConnectionId(connection.id.clone()));
            }
            if connection.source_component_id == connection.target_component_id {
                return Err(FlowError::SelfConnection(connection.id.clone()));
            }

            let source = self.component(&connection.source_component_id).ok_or_else(|| {
                FlowError::UnknownComponent {
                    connection: connection.id.clone(),
                    component: connection.source_component_id.clone(),
                }
            })?;
            let target = self.component(&connection.target_component_id).ok_or_else(|| {
                FlowError::UnknownComponent {
                    connection: connection.id.clone(),
                    component: connection.target_component_id.clone(),
                }
            })?;

            let source_port = source.port(connection.source_port_id.as_str()).ok_or_else(|| {
                FlowError::UnknownPort {
                    connection: connection.id.clone(),
                    component: source.id.clone(),
                    port: connection.source_port_id.to_string(),
                }
            })?;
            let target_port = target.port(connection.target_port_id.as_str()).ok_or_else(|| {
                FlowError::UnknownPort {
                    connection: connection.id.clone(),
                    component: target.id.clone(),
                    port: connection.target_port_id.to_string(),
                }
            })?;

            if !source_port.is_output() || !target_port.is_input() {
                return Err(FlowError::WrongDirection {
                    connection: connection.id.clone(),
                });
            }

            if source_port.port_type == PortType::Control {
                let count = fan_out
                    .entry((source.id.clone(), connection.source_port_id.to_string()))
                    .or_insert(0);
                *count += 1;
                if *count > 1 {
                    return Err(FlowError::ControlFanOut {
                        component: source.id.clone(),
                        port: connection.source_port_id.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Look up a component by id.
    #[must_use]
    pub fn component(&self, id: &ComponentId) -> Option<&Component> {
        self.index.get(id).map(|&i| &self.components[i])
    }

    /// The unique Start component.
    #[must_use]
    pub fn start(&self) -> &Component {
        self.components
            .iter()
            .find(|c| c.component_type == ComponentType::Start)
            .expect("validated: exactly one START")
    }

    /// Connections leaving the given port of the given component.
    pub fn connections_from<'a, 'b>(
        &'a self,
        component: &'b ComponentId,
        port: &'b str,
    ) -> impl Iterator<Item = &'a Connection> + 'b
    where
        'a: 'b,
    {
        self.connections.iter().filter(move |c| {
            &c.source_component_id == component && c.source_port_id.as_str() == port
        })
    }

    /// Connections entering the given component.
    pub fn connections_into<'a>(
        &'a self,
        component: &'a ComponentId,
    ) -> impl Iterator<Item = &'a Connection> {
        self.connections
            .iter()
            .filter(move |c| &c.target_component_id == component)
    }

    /// The single component downstream of the given output port, if the
    /// port is connected. Fan-out beyond one is impossible for control
    /// ports after validation.
    #[must_use]
    pub fn sole_target<'a>(&'a self, component: &ComponentId, port: &str) -> Option<&'a ComponentId> {
        self.connections_from(component, port)
            .map(|c| &c.target_component_id)
            .next()
    }
}

impl<'de> Deserialize<'de> for Flow {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RawFlow {
            id: FlowId,
            name: String,
            version: String,
            #[serde(default)]
            components: Vec<Component>,
            #[serde(default)]
            connections: Vec<Connection>,
            #[serde(default)]
            metadata: BTreeMap<String, String>,
        }

        let raw = RawFlow::deserialize(deserializer)?;
        Flow::new(raw.id, raw.name, raw.version, raw.components, raw.connections)
            .map(|flow| flow.with_metadata(raw.metadata))
            .map_err(serde::de::Error::custom)
    }
}
