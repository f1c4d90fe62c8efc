//! SQL change-review core.
//!
//! Before a batch of DDL/DML runs against production, it is parsed, checked
//! against a configurable rule set and inverted: every statement gets a
//! severity-leveled audit result and, where one exists, a rollback
//! statement. Three pieces share one data model:
//!
//! - [`catalog::SchemaCatalog`] mirrors the target database lazily and
//!   simulates each statement's DDL effect in memory.
//! - [`advisor::Advisor`] runs the active rules from a
//!   [`advisor::RuleRegistry`] against each statement.
//! - [`rollback::RollbackSynthesizer`] computes structural inverses for DDL
//!   and pre-image based inverses for DML.
//!
//! [`session::ReviewSession`] drives all three over one batch and produces
//! a [`session::ReviewReport`]. Statement execution, pooling and transport
//! are the caller's concern; the catalog reaches the database only through
//! the [`catalog::CatalogSource`] trait.

pub mod advisor;
pub mod catalog;
pub mod config;
pub mod error;
pub mod keywords;
pub mod osc;
pub mod parser;
pub mod rollback;
pub mod session;
pub mod statement;

pub use advisor::{Advisor, Finding, FindingSet, Rule, RuleRegistry, Severity};
pub use catalog::{CatalogSource, MemorySource, Row, SchemaCatalog, TableDefinition};
pub use config::ReviewConfig;
pub use error::{ReviewError, ReviewResult};
pub use osc::OscAdvice;
pub use parser::{parse_all, parse_one, SqlDialect};
pub use rollback::RollbackSynthesizer;
pub use session::{ReviewReport, ReviewSession, StatementReview};
pub use statement::Statement;
