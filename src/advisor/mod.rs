//! Rule-based statement advisor.
//!
//! A registry maps rule names to check functions; the advisor runs every
//! active rule against each statement, collects severity-leveled findings
//! and advances the shared catalog so later statements in the batch see
//! earlier DDL effects.

mod checks;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::SchemaCatalog;
use crate::config::ReviewConfig;
use crate::error::ReviewResult;
use crate::statement::Statement;

/// Finding severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Notice,
    Warn,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Normal => "normal",
            Severity::Notice => "notice",
            Severity::Warn => "warn",
            Severity::Error => "error",
        };
        write!(f, "{}", label)
    }
}

/// One audit observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

/// Ordered findings for one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingSet {
    pub findings: Vec<Finding>,
}

impl FindingSet {
    pub fn push(&mut self, severity: Severity, message: String) {
        self.findings.push(Finding { severity, message });
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Aggregate severity: the maximum of all members, `Normal` when empty.
    pub fn severity(&self) -> Severity {
        self.findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Normal)
    }

    /// Aggregate message: newline-joined `[severity]message` lines.
    pub fn message(&self) -> String {
        self.findings
            .iter()
            .map(|f| format!("[{}]{}", f.severity, f.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A named, severity-defaulted review rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Stable identifier, also the registry key.
    pub name: String,
    pub description: String,
    /// Human message template shown alongside findings.
    pub message: String,
    pub severity: Severity,
}

impl Rule {
    fn new(name: &str, description: &str, message: &str, severity: Severity) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            message: message.to_string(),
            severity,
        }
    }
}

pub mod rule_names {
    pub const SCHEMA_NOT_EXIST: &str = "SCHEMA_NOT_EXIST";
    pub const SCHEMA_EXIST: &str = "SCHEMA_EXIST";
    pub const TABLE_NOT_EXIST: &str = "TABLE_NOT_EXIST";
    pub const TABLE_EXIST: &str = "TABLE_EXIST";
    pub const DDL_TABLE_WITHOUT_PK: &str = "DDL_TABLE_WITHOUT_PK";
    pub const DDL_PK_NOT_AUTO_UNSIGNED_BIGINT: &str = "DDL_PK_NOT_AUTO_UNSIGNED_BIGINT";
    pub const DDL_MERGE_ALTER_TABLE: &str = "DDL_MERGE_ALTER_TABLE";
    pub const DDL_TOO_MANY_INDEXES: &str = "DDL_TOO_MANY_INDEXES";
    pub const DDL_INDEX_TOO_MANY_COLUMNS: &str = "DDL_INDEX_TOO_MANY_COLUMNS";
    pub const DDL_INDEX_ON_BLOB: &str = "DDL_INDEX_ON_BLOB";
    pub const DDL_IDENTIFIER_TOO_LONG: &str = "DDL_IDENTIFIER_TOO_LONG";
    pub const DDL_DISABLE_USING_KEYWORD: &str = "DDL_DISABLE_USING_KEYWORD";
    pub const DDL_DISABLE_DROP: &str = "DDL_DISABLE_DROP";
    pub const DML_MISSING_SHARDING_COLUMN: &str = "DML_MISSING_SHARDING_COLUMN";
}

/// Check function signature: one statement, one active rule, findings go
/// through the context. Must never report "object not found" as an error.
pub(crate) type CheckFn = fn(&mut checks::CheckCtx<'_>, &Statement) -> ReviewResult<()>;

/// Name-keyed rule table.
pub struct RuleRegistry {
    rules: HashMap<String, (Rule, CheckFn)>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        use rule_names::*;
        use Severity::*;

        let mut registry = Self {
            rules: HashMap::new(),
        };
        let defaults: [(&str, &str, &str, Severity, CheckFn); 14] = [
            (
                SCHEMA_NOT_EXIST,
                "referenced schema must exist",
                "schema does not exist",
                Error,
                checks::check_object_existence,
            ),
            (
                SCHEMA_EXIST,
                "created schema must not already exist",
                "schema already exists",
                Error,
                checks::check_object_existence,
            ),
            (
                TABLE_NOT_EXIST,
                "referenced table must exist",
                "table does not exist",
                Error,
                checks::check_object_existence,
            ),
            (
                TABLE_EXIST,
                "created table must not already exist",
                "table already exists",
                Error,
                checks::check_object_existence,
            ),
            (
                DDL_TABLE_WITHOUT_PK,
                "every table needs a primary key",
                "table has no primary key",
                Error,
                checks::check_primary_key,
            ),
            (
                DDL_PK_NOT_AUTO_UNSIGNED_BIGINT,
                "primary key should be a single auto-increment unsigned bigint",
                "primary key is not an auto-increment unsigned bigint",
                Warn,
                checks::check_primary_key,
            ),
            (
                DDL_MERGE_ALTER_TABLE,
                "consecutive alters of one table should be merged",
                "merge multiple ALTER TABLE statements for the same table",
                Notice,
                checks::check_merge_alter,
            ),
            (
                DDL_TOO_MANY_INDEXES,
                "too many indexes on one table",
                "table exceeds the index count limit",
                Warn,
                checks::check_index_shape,
            ),
            (
                DDL_INDEX_TOO_MANY_COLUMNS,
                "index spans too many columns",
                "index exceeds the column count limit",
                Warn,
                checks::check_index_shape,
            ),
            (
                DDL_INDEX_ON_BLOB,
                "BLOB/TEXT columns should not be indexed",
                "index covers a BLOB/TEXT column",
                Warn,
                checks::check_index_shape,
            ),
            (
                DDL_IDENTIFIER_TOO_LONG,
                "identifiers are limited to 64 bytes",
                "identifier is too long",
                Error,
                checks::check_identifiers,
            ),
            (
                DDL_DISABLE_USING_KEYWORD,
                "identifiers must not collide with reserved words",
                "identifier collides with a reserved keyword",
                Error,
                checks::check_identifiers,
            ),
            (
                DDL_DISABLE_DROP,
                "dropping schemas or tables is disallowed",
                "destructive DROP statement is disallowed",
                Error,
                checks::check_destructive,
            ),
            (
                DML_MISSING_SHARDING_COLUMN,
                "sharded writes must carry the sharding column",
                "write omits the configured sharding column",
                Warn,
                checks::check_sharding,
            ),
        ];
        for (name, description, message, severity, check) in defaults {
            registry
                .rules
                .insert(name.to_string(), (Rule::new(name, description, message, severity), check));
        }
        registry
    }
}

impl RuleRegistry {
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name).map(|(rule, _)| rule)
    }

    pub(crate) fn check_fn(&self, name: &str) -> Option<CheckFn> {
        self.rules.get(name).map(|(_, check)| *check)
    }

    /// All registered rules with their default severities.
    pub fn default_rules(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self.rules.values().map(|(rule, _)| rule.clone()).collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }
}

/// Per-batch advisor state shared between statements.
#[derive(Default)]
pub(crate) struct BatchState {
    /// Resolved `schema.table` names already altered in this batch.
    pub(crate) altered: HashMap<(String, String), usize>,
}

pub struct Advisor<'a> {
    registry: &'a RuleRegistry,
    config: &'a ReviewConfig,
}

impl<'a> Advisor<'a> {
    pub fn new(registry: &'a RuleRegistry, config: &'a ReviewConfig) -> Self {
        Self { registry, config }
    }

    /// Run every active rule against one statement without advancing the
    /// catalog. The caller decides when `apply` happens.
    pub(crate) fn check(
        &self,
        catalog: &mut SchemaCatalog,
        state: &mut BatchState,
        stmt: &Statement,
        active: &[Rule],
    ) -> ReviewResult<FindingSet> {
        let mut findings = FindingSet::default();
        for rule in active {
            let Some(check) = self.registry.check_fn(&rule.name) else {
                debug!(rule = %rule.name, "skipping unknown rule");
                continue;
            };
            let mut ctx = checks::CheckCtx::new(rule, catalog, self.config, &mut findings, state);
            check(&mut ctx, stmt)?;
        }
        Ok(findings)
    }

    /// One FindingSet per statement. The catalog is advanced after each
    /// statement so later checks see earlier DDL effects.
    pub fn advise(
        &self,
        catalog: &mut SchemaCatalog,
        statements: &[Statement],
        active: &[Rule],
    ) -> ReviewResult<Vec<FindingSet>> {
        let mut state = BatchState::default();
        let mut results = Vec::with_capacity(statements.len());
        for stmt in statements {
            let findings = self.check(catalog, &mut state, stmt, active)?;
            catalog.apply(stmt)?;
            results.push(findings);
        }
        Ok(results)
    }
}
