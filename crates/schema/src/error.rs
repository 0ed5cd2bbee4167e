//! Schema errors.

use cascade_flow::FlowError;
use thiserror::Error;

/// Errors from document loading, versioning, or migration.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The document is not valid JSON or lacks required fields.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// The `schemaVersion` field is not a semantic version.
    #[error("invalid schema version {version:?}: {source}")]
    InvalidVersion {
        /// The offending version string.
        version: String,
        /// The semver parse failure.
        source: semver::Error,
    },

    /// The schema version is older than anything the loader reads.
    #[error("unsupported schema version {0}; oldest readable is 0.9.x")]
    UnsupportedVersion(semver::Version),

    /// A write was attempted for a read-only schema version.
    #[error("schema version {0} is read-only; migrate to the current major first")]
    ReadOnlyVersion(semver::Version),

    /// The migrated document failed flow validation.
    #[error("flow validation: {0}")]
    Invalid(#[from] FlowError),

    /// Serialization failure.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
