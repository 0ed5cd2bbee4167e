//! Document keys: author-chosen string identifiers.
//!
//! Flow documents name their flows, components, connections, and ports
//! with free-form strings. Each key type wraps an `Arc<str>` so clones
//! are pointer copies, and each is a distinct type so a component id can
//! never be passed where a port id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error produced when constructing a key from invalid input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The key was empty or contained only whitespace.
    #[error("{0} must not be blank")]
    Blank(&'static str),
}

macro_rules! string_key {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Construct without validation. Use [`Self::parse`] for input
            /// that must be non-blank.
            #[must_use]
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(Arc::from(s.as_ref()))
            }

            /// Construct, rejecting blank input.
            pub fn parse(s: impl AsRef<str>) -> Result<Self, KeyError> {
                let s = s.as_ref();
                if s.trim().is_empty() {
                    Err(KeyError::Blank($label))
                } else {
                    Ok(Self(Arc::from(s)))
                }
            }

            /// The key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the key is empty or whitespace-only.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s.as_str()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_key!(
    /// Identifier of a flow document.
    FlowId,
    "flow id"
);

string_key!(
    /// Identifier of a component within a flow. Unique per flow.
    ComponentId,
    "component id"
);

string_key!(
    /// Identifier of a connection within a flow. Unique per flow.
    ConnectionId,
    "connection id"
);

string_key!(
    /// Identifier of a port on a component.
    PortId,
    "port id"
);
