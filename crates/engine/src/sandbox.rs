//! Sandbox policy: capability gating for host services.
//!
//! Enforcement belongs to the host environment; the engine's part is
//! refusing to invoke a service whose declared capabilities the active
//! policy disallows.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Network access levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkPolicy {
    /// Any destination.
    AllowAll,
    /// Loopback only.
    #[default]
    LocalhostOnly,
    /// No network at all.
    BlockAll,
}

/// Filesystem access levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilesystemPolicy {
    /// Read and write.
    ReadWrite,
    /// Read only.
    #[default]
    ReadOnly,
    /// No filesystem at all.
    BlockAll,
}

/// What a host service touches, declared by the service itself.
///
/// Every toggle of [`SandboxPolicy`] has a matching flag here, so a
/// policy decision is never inert for lack of a declaration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceCapabilities {
    /// Opens network connections beyond loopback.
    pub network: bool,
    /// Writes to the filesystem.
    pub filesystem_write: bool,
    /// Reads from the filesystem.
    pub filesystem_read: bool,
    /// Spawns processes or shells.
    pub process: bool,
    /// Generates and runs code at runtime.
    pub codegen: bool,
    /// Uses reflective access.
    pub reflection: bool,
    /// Deserializes arbitrary payloads.
    pub deserialization: bool,
    /// Calls through JNI or other foreign function interfaces.
    pub jni: bool,
    /// Loads native libraries.
    pub native_libs: bool,
    /// Uses cryptographic primitives.
    pub crypto: bool,
}

impl ServiceCapabilities {
    /// A service that touches nothing gate-worthy.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// The sandbox policy an executor runs under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxPolicy {
    /// Network access level.
    pub network: NetworkPolicy,
    /// Filesystem access level.
    pub filesystem: FilesystemPolicy,
    /// Process spawn budget; zero forbids spawning.
    pub max_processes: u32,
    /// Wall-clock ceiling the environment should apply.
    #[serde(with = "duration_millis")]
    pub max_execution: Duration,
    /// Runtime code generation.
    pub allow_codegen: bool,
    /// Reflective access.
    pub allow_reflection: bool,
    /// Arbitrary deserialization.
    pub allow_deserialization: bool,
    /// Shell command execution.
    pub allow_shell: bool,
    /// JNI / foreign function interfaces.
    pub allow_jni: bool,
    /// Loading native libraries.
    pub allow_native_libs: bool,
    /// Cryptographic primitives.
    pub allow_crypto: bool,
}

impl Default for SandboxPolicy {
    /// A conservative default: loopback network, read-only filesystem,
    /// no process spawning, crypto allowed.
    fn default() -> Self {
        Self {
            network: NetworkPolicy::LocalhostOnly,
            filesystem: FilesystemPolicy::ReadOnly,
            max_processes: 0,
            max_execution: Duration::from_secs(30),
            allow_codegen: false,
            allow_reflection: false,
            allow_deserialization: false,
            allow_shell: false,
            allow_jni: false,
            allow_native_libs: false,
            allow_crypto: true,
        }
    }
}

impl SandboxPolicy {
    /// A policy that permits everything. For trusted hosts and tests.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            network: NetworkPolicy::AllowAll,
            filesystem: FilesystemPolicy::ReadWrite,
            max_processes: 64,
            max_execution: Duration::from_secs(300),
            allow_codegen: true,
            allow_reflection: true,
            allow_deserialization: true,
            allow_shell: true,
            allow_jni: true,
            allow_native_libs: true,
            allow_crypto: true,
        }
    }

    /// Check a service's declared capabilities against this policy.
    /// Returns the first violated capability's name.
    pub fn permits(&self, capabilities: &ServiceCapabilities) -> Result<(), &'static str> {
        if capabilities.network && self.network == NetworkPolicy::BlockAll {
            return Err("network");
        }
        if capabilities.filesystem_write && self.filesystem != FilesystemPolicy::ReadWrite {
            return Err("filesystem-write");
        }
        if capabilities.filesystem_read && self.filesystem == FilesystemPolicy::BlockAll {
            return Err("filesystem-read");
        }
        if capabilities.process && (self.max_processes == 0 || !self.allow_shell) {
            return Err("process");
        }
        if capabilities.codegen && !self.allow_codegen {
            return Err("codegen");
        }
        if capabilities.reflection && !self.allow_reflection {
            return Err("reflection");
        }
        if capabilities.deserialization && !self.allow_deserialization {
            return Err("deserialization");
        }
        if capabilities.jni && !self.allow_jni {
            return Err("jni");
        }
        if capabilities.native_libs && !self.allow_native_libs {
            return Err("native-libs");
        }
        if capabilities.crypto && !self.allow_crypto {
            return Err("crypto");
        }
        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (duration.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
