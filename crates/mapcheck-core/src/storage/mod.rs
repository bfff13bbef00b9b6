//! Storage access for mapping checks.
//!
//! This module wraps a SQLite connection and exposes the read-only operations
//! the validator and checker need: statement execution with cooperative early
//! stop, and introspection of the physical schema.

mod physical;
mod store;

pub use physical::{PhysicalForeignKey, PhysicalObjectKind};
pub use store::{quote_ident, Store};
