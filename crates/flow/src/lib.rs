#![forbid(unsafe_code)]

//! # Cascade Flow
//!
//! The flow graph model: typed components joined by connections, with
//! every structural invariant checked at construction so the execution
//! engine never has to re-validate topology.
//!
//! A [`Flow`] is immutable once built. [`Flow::new`] enforces:
//!
//! 1. exactly one Start component,
//! 2. at least one End component,
//! 3. unique component and connection ids,
//! 4. connections reference existing components and ports,
//! 5. connections run from an output port to an input port,
//! 6. no control output fans out more than once (forks branch through
//!    their numbered ports, one connection each),
//!
//! plus the per-type property requirements (an Action carries `service`
//! and `method`, a Decision carries `condition`).

pub mod component;
pub mod connection;
pub mod error;
pub mod flow;
pub mod port;

pub use component::{Component, ComponentType, JoinMode};
pub use connection::Connection;
pub use error::FlowError;
pub use flow::Flow;
pub use port::{Port, PortDirection, PortType};
