//! The persisted flow document.

use crate::error::SchemaError;
use crate::migration::MigrationChain;
use crate::version::{SchemaSupport, SchemaVersionManager};
use cascade_flow::Flow;
use semver::Version;
use serde::{Deserialize, Serialize};

/// A flow with its schema version, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDocument {
    /// The schema the document conforms to.
    pub schema_version: Version,
    /// The flow body. Deserialization runs full flow validation.
    pub flow: Flow,
}

impl FlowDocument {
    /// Wrap a flow at the current schema version.
    #[must_use]
    pub fn current(flow: Flow) -> Self {
        Self {
            schema_version: SchemaVersionManager::current(),
            flow,
        }
    }

    /// Load a document from JSON text.
    ///
    /// The version is classified first; deprecated (`0.9.x`) documents
    /// are migrated forward through the chain before the flow body is
    /// parsed and validated. The returned document is always at the
    /// current schema version.
    pub fn load(json: &str) -> Result<Self, SchemaError> {
        let manager = SchemaVersionManager;
        let mut raw: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SchemaError::Malformed(e.to_string()))?;

        let version_str = raw
            .get("schemaVersion")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| SchemaError::Malformed("missing \"schemaVersion\"".into()))?;
        let version = manager.parse(version_str)?;

        // Classification rejects anything older than 0.9.x and logs
        // the deprecation warning for 0.9.x itself.
        manager.support(&version)?;

        MigrationChain::new().migrate(&mut raw, &version)?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Serialize for persistence. Only current-version documents are
    /// writable; `load` already migrates everything it accepts, so this
    /// fails only for hand-built documents pinned to an old version.
    pub fn save(&self) -> Result<String, SchemaError> {
        match SchemaVersionManager.support(&self.schema_version)? {
            SchemaSupport::ReadWrite => Ok(serde_json::to_string_pretty(self)?),
            SchemaSupport::ReadOnly => {
                Err(SchemaError::ReadOnlyVersion(self.schema_version.clone()))
            }
        }
    }
}
