//! pt-online-schema-change advisory.
//!
//! For a large table, a direct ALTER can hold locks for the duration of the
//! rewrite. This helper decides whether the tool can take the statement
//! instead and, when it can, emits a ready-to-fill command line. The size
//! threshold comes from [`ReviewConfig::osc_min_table_size`]; table size
//! itself is measured by the caller.

use serde::Serialize;

use crate::catalog::TableDefinition;
use crate::config::ReviewConfig;
use crate::statement::{AlterSpec, AlterTable, IndexKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OscAdvice {
    pub recommended: bool,
    /// Why the tool cannot be used, when it cannot.
    pub reason: Option<String>,
    /// Command template with `{host}`, `{user}` and `{port}` placeholders.
    pub command: Option<String>,
}

impl OscAdvice {
    fn not_needed() -> Self {
        Self {
            recommended: false,
            reason: None,
            command: None,
        }
    }

    fn rejected(reason: &str) -> Self {
        Self {
            recommended: false,
            reason: Some(reason.to_string()),
            command: None,
        }
    }
}

/// The tool identifies rows through a primary or unique key.
fn has_unique_key(def: &TableDefinition) -> bool {
    def.constraints
        .iter()
        .any(|c| matches!(c.kind, IndexKind::Primary | IndexKind::Unique))
}

fn ineligible_spec(spec: &AlterSpec) -> Option<&'static str> {
    match spec {
        AlterSpec::RenameTable { .. } => {
            Some("pt-online-schema-change cannot rename a table")
        }
        AlterSpec::AddColumn(column) if !column.nullable && column.default.is_none() => {
            Some("adding a NOT NULL column without a default would fail on existing rows")
        }
        AlterSpec::AddConstraint(c) if c.kind == IndexKind::Unique => {
            Some("adding a unique index online can silently drop duplicate rows")
        }
        _ => None,
    }
}

/// Decide whether an ALTER on a table of `table_size` bytes should be routed
/// through pt-online-schema-change.
pub fn advise(
    config: &ReviewConfig,
    def: &TableDefinition,
    at: &AlterTable,
    table_size: u64,
) -> OscAdvice {
    if table_size < config.osc_min_table_size {
        return OscAdvice::not_needed();
    }
    if !has_unique_key(def) {
        return OscAdvice::rejected(
            "pt-online-schema-change requires a primary or unique key",
        );
    }
    if let Some(reason) = at.specs.iter().find_map(ineligible_spec) {
        return OscAdvice::rejected(reason);
    }

    let clauses: Vec<String> = at.specs.iter().map(|s| s.to_string()).collect();
    let command = format!(
        "pt-online-schema-change --alter \"{}\" --host={{host}} --user={{user}} --port={{port}} D={},t={} --execute",
        clauses.join(", "),
        def.schema,
        def.name
    );
    OscAdvice {
        recommended: true,
        reason: None,
        command: Some(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_one, SqlDialect};
    use crate::statement::Statement;
    use pretty_assertions::assert_eq;

    const BIG: u64 = 1 << 30;

    fn def() -> TableDefinition {
        TableDefinition::from_create_sql(
            "shop",
            SqlDialect::MySql,
            "CREATE TABLE orders (id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT, v1 VARCHAR(255), PRIMARY KEY (id))",
        )
        .unwrap()
    }

    fn alter(sql: &str) -> AlterTable {
        match parse_one(SqlDialect::MySql, sql).unwrap() {
            Statement::AlterTable(at) => at,
            other => panic!("expected AlterTable, got {:?}", other),
        }
    }

    #[test]
    fn test_small_table_is_not_routed() {
        let advice = advise(
            &ReviewConfig::default(),
            &def(),
            &alter("ALTER TABLE orders ADD COLUMN note VARCHAR(32)"),
            1024,
        );
        assert_eq!(advice, OscAdvice::not_needed());
    }

    #[test]
    fn test_large_table_gets_command() {
        let advice = advise(
            &ReviewConfig::default(),
            &def(),
            &alter("ALTER TABLE orders ADD COLUMN note VARCHAR(32)"),
            BIG,
        );
        assert!(advice.recommended);
        assert_eq!(
            advice.command.unwrap(),
            "pt-online-schema-change --alter \"ADD COLUMN `note` VARCHAR(32)\" --host={host} --user={user} --port={port} D=shop,t=orders --execute"
        );
    }

    #[test]
    fn test_rename_is_rejected() {
        let advice = advise(
            &ReviewConfig::default(),
            &def(),
            &alter("ALTER TABLE orders RENAME TO orders_v2"),
            BIG,
        );
        assert!(!advice.recommended);
        assert!(advice.reason.unwrap().contains("rename"));
    }

    #[test]
    fn test_not_null_without_default_is_rejected() {
        let advice = advise(
            &ReviewConfig::default(),
            &def(),
            &alter("ALTER TABLE orders ADD COLUMN flag INT NOT NULL"),
            BIG,
        );
        assert!(!advice.recommended);
        assert!(advice.reason.is_some());
    }

    #[test]
    fn test_table_without_key_is_rejected() {
        let def = TableDefinition::from_create_sql(
            "shop",
            SqlDialect::MySql,
            "CREATE TABLE log (line VARCHAR(255))",
        )
        .unwrap();
        let advice = advise(
            &ReviewConfig::default(),
            &def,
            &alter("ALTER TABLE log ADD COLUMN level INT"),
            BIG,
        );
        assert!(!advice.recommended);
        assert!(advice.reason.unwrap().contains("unique key"));
    }
}
