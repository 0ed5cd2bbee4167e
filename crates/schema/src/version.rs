//! Schema version support decisions.

use crate::error::SchemaError;
use semver::Version;

/// What the loader will do with a given schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSupport {
    /// Current major: load and save.
    ReadWrite,
    /// Previous supported major: load (with migration), never save.
    ReadOnly,
}

/// Decides how schema versions are handled.
///
/// The current major (`1.x`) is read-write. The previous line (`0.9.x`)
/// is read-only and logs a deprecation warning on every load. Anything
/// older is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaVersionManager;

impl SchemaVersionManager {
    /// The version written into saved documents.
    #[must_use]
    pub fn current() -> Version {
        Version::new(1, 0, 0)
    }

    /// Classify a version, warning on deprecated ones.
    pub fn support(&self, version: &Version) -> Result<SchemaSupport, SchemaError> {
        if version.major == 1 {
            Ok(SchemaSupport::ReadWrite)
        } else if version.major == 0 && version.minor == 9 {
            tracing::warn!(
                %version,
                "loading deprecated schema version; re-save to migrate to {}",
                Self::current()
            );
            Ok(SchemaSupport::ReadOnly)
        } else {
            Err(SchemaError::UnsupportedVersion(version.clone()))
        }
    }

    /// Parse a version string from a document.
    pub fn parse(&self, raw: &str) -> Result<Version, SchemaError> {
        Version::parse(raw).map_err(|source| SchemaError::InvalidVersion {
            version: raw.to_string(),
            source,
        })
    }
}
