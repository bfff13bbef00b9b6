//! Mapcheck Core - Catalog model, mapping validator and integrity checker.
//!
//! This crate inspects SQLite files that persist an object/relational
//! mapping: classes and their properties mapped onto tables and columns.
//! The [`MapValidator`] checks that the mapping itself is well formed and
//! the [`IntegrityChecker`] checks that the stored data obeys it.

pub mod catalog;
pub mod error;
pub mod integrity;
pub mod issues;
pub mod profile;
pub mod storage;
pub mod validator;

pub use catalog::{Catalog, ClassMap, ClassMapType, DbColumn, DbIndex, DbTable, MapStrategy, TableType};
pub use error::Error;
pub use integrity::{
    Check, CheckStatus, IntegrityChecker, IntegrityConfig, ParseCheckError, QuickCheckResult,
    Violation,
};
pub use issues::{
    Issue, IssueCategory, IssueReporter, IssueSeverity, MemoryIssueReporter, NullIssueReporter,
    TracingIssueReporter,
};
pub use profile::ProfileVersion;
pub use storage::Store;
pub use validator::MapValidator;
