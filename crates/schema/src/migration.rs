//! Forward migrations over parsed documents.

use crate::error::SchemaError;
use semver::Version;
use serde_json::Value;

/// One schema upgrade step.
struct Step {
    /// Applies to documents whose version satisfies this check.
    applies: fn(&Version) -> bool,
    /// The version the step produces.
    target: Version,
    /// The structural transform over the parsed flow body.
    transform: fn(&mut Value),
}

/// The ordered chain of single-step migrations.
///
/// `migrate` walks the chain until no step applies; a document already
/// at the current version passes through unchanged, making migration a
/// fixed point there.
pub struct MigrationChain {
    steps: Vec<Step>,
}

impl Default for MigrationChain {
    fn default() -> Self {
        Self {
            steps: vec![Step {
                applies: |v| v.major == 0 && v.minor == 9,
                target: Version::new(1, 0, 0),
                transform: migrate_0_9_to_1_0,
            }],
        }
    }
}

impl MigrationChain {
    /// Create the standard chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Migrate a parsed document in place, returning the version it
    /// ended at.
    pub fn migrate(&self, document: &mut Value, from: &Version) -> Result<Version, SchemaError> {
        let mut version = from.clone();
        for step in &self.steps {
            if (step.applies)(&version) {
                let flow = document
                    .get_mut("flow")
                    .ok_or_else(|| SchemaError::Malformed("missing \"flow\" body".into()))?;
                (step.transform)(flow);
                version = step.target.clone();
                document["schemaVersion"] = Value::String(version.to_string());
                tracing::info!(%version, "migrated flow document");
            }
        }
        Ok(version)
    }
}

/// 0.9 → 1.0: `nodes` became `components`, `edges` became
/// `connections`, and connection endpoints were renamed from `from*`
/// to `source*` and `to*` to `target*`. Key renames only.
fn migrate_0_9_to_1_0(flow: &mut Value) {
    let Some(flow) = flow.as_object_mut() else {
        return;
    };

    if let Some(nodes) = flow.remove("nodes") {
        flow.insert("components".to_string(), nodes);
    }
    if let Some(edges) = flow.remove("edges") {
        flow.insert("connections".to_string(), edges);
    }

    if let Some(connections) = flow.get_mut("connections").and_then(Value::as_array_mut) {
        for connection in connections.iter_mut().filter_map(Value::as_object_mut) {
            for (old, new) in [
                ("fromComponentId", "sourceComponentId"),
                ("fromPortId", "sourcePortId"),
                ("toComponentId", "targetComponentId"),
                ("toPortId", "targetPortId"),
            ] {
                if let Some(value) = connection.remove(old) {
                    connection.insert(new.to_string(), value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn legacy_document() -> Value {
        serde_json::json!({
            "schemaVersion": "0.9.2",
            "flow": {
                "id": "flow-1",
                "name": "Legacy",
                "version": "1.0.0",
                "nodes": [
                    {"id": "start", "name": "Start", "type": "START"},
                    {"id": "end", "name": "End", "type": "END"},
                ],
                "edges": [
                    {
                        "id": "conn-1",
                        "fromComponentId": "start",
                        "fromPortId": "out",
                        "toComponentId": "end",
                        "toPortId": "in",
                    },
                ],
            },
        })
    }

    #[test]
    fn migrates_0_9_renames() {
        let mut doc = legacy_document();
        let chain = MigrationChain::new();
        let version = chain
            .migrate(&mut doc, &Version::new(0, 9, 2))
            .unwrap();

        assert_eq!(version, Version::new(1, 0, 0));
        assert_eq!(doc["schemaVersion"], "1.0.0");

        let flow = &doc["flow"];
        assert!(flow.get("nodes").is_none());
        assert!(flow.get("edges").is_none());
        assert_eq!(flow["components"].as_array().unwrap().len(), 2);

        let connection = &flow["connections"][0];
        assert_eq!(connection["sourceComponentId"], "start");
        assert_eq!(connection["targetPortId"], "in");
        assert!(connection.get("fromComponentId").is_none());
    }

    #[test]
    fn current_document_is_a_fixed_point() {
        let mut doc = serde_json::json!({
            "schemaVersion": "1.0.0",
            "flow": {"id": "f", "name": "F", "version": "1", "components": [], "connections": []},
        });
        let before = doc.clone();
        let version = MigrationChain::new()
            .migrate(&mut doc, &Version::new(1, 0, 0))
            .unwrap();
        assert_eq!(version, Version::new(1, 0, 0));
        assert_eq!(doc, before);
    }

    #[test]
    fn migration_is_idempotent() {
        let mut once = legacy_document();
        let chain = MigrationChain::new();
        chain.migrate(&mut once, &Version::new(0, 9, 2)).unwrap();

        let mut twice = once.clone();
        chain.migrate(&mut twice, &Version::new(1, 0, 0)).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn string_contents_are_never_touched() {
        let mut doc = serde_json::json!({
            "schemaVersion": "0.9.0",
            "flow": {
                "id": "flow-1",
                "name": "mentions nodes and edges in its name",
                "version": "1",
                "nodes": [
                    {
                        "id": "start",
                        "name": "Start",
                        "type": "START",
                        "properties": {"note": "the word edges stays"},
                    },
                ],
                "edges": [],
            },
        });
        MigrationChain::new()
            .migrate(&mut doc, &Version::new(0, 9, 0))
            .unwrap();

        assert_eq!(
            doc["flow"]["name"],
            "mentions nodes and edges in its name"
        );
        assert_eq!(
            doc["flow"]["components"][0]["properties"]["note"],
            "the word edges stays"
        );
    }

    #[test]
    fn missing_flow_body_is_malformed() {
        let mut doc = serde_json::json!({"schemaVersion": "0.9.0"});
        assert!(matches!(
            MigrationChain::new().migrate(&mut doc, &Version::new(0, 9, 0)),
            Err(SchemaError::Malformed(_))
        ));
    }
}
