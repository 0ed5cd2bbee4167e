#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Cascade Core
//!
//! Identifier types shared by every Cascade crate.
//!
//! Two families of identifiers exist:
//!
//! - [`ExecutionId`] — a UUID minted by the executor for each run.
//! - Document keys ([`FlowId`], [`ComponentId`], [`ConnectionId`],
//!   [`PortId`]) — author-chosen strings carried in the persisted flow
//!   document. They are cheap to clone (`Arc<str>` inside) and validated
//!   to be non-blank where the flow model requires it.

pub mod id;
pub mod key;

pub use id::ExecutionId;
pub use key::{ComponentId, ConnectionId, FlowId, KeyError, PortId};
