#![forbid(unsafe_code)]

//! # Cascade Schema
//!
//! The persisted form of a flow: a JSON document with a top-level
//! `schemaVersion` and the flow body. This crate loads documents,
//! decides which schema versions are readable and writable, and
//! migrates old documents forward through a chain of single-step
//! structural transforms.
//!
//! Migrations operate on parsed JSON and rename keys only; string
//! contents are never substituted, so a flow whose data happens to
//! contain `"nodes"` survives migration untouched.

pub mod document;
pub mod error;
pub mod migration;
pub mod version;

pub use document::FlowDocument;
pub use error::SchemaError;
pub use migration::MigrationChain;
pub use version::{SchemaSupport, SchemaVersionManager};
