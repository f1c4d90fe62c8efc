//! Structural inverse of ALTER TABLE statements.

use crate::catalog::TableDefinition;
use crate::statement::{AlterSpec, AlterTable, IndexKind, Statement, TableRef};

fn invert_spec(pre: &TableDefinition, spec: &AlterSpec) -> Option<AlterSpec> {
    match spec {
        AlterSpec::AddColumn(column) => Some(AlterSpec::DropColumn {
            name: column.name.clone(),
        }),
        AlterSpec::DropColumn { name } => {
            // Re-add with the full prior definition; an already absent
            // column has nothing to restore.
            pre.column(name)
                .map(|prior| AlterSpec::AddColumn(prior.clone()))
        }
        AlterSpec::ChangeColumn { old_name, column } => {
            pre.column(old_name).map(|prior| AlterSpec::ChangeColumn {
                old_name: column.name.clone(),
                column: prior.clone(),
            })
        }
        AlterSpec::RenameColumn { old_name, new_name } => Some(AlterSpec::RenameColumn {
            old_name: new_name.clone(),
            new_name: old_name.clone(),
        }),
        AlterSpec::SetDefault { column, default } => {
            let prior = pre.column(column)?;
            // DROP DEFAULT on a column without one is a no-op pair.
            if default.is_none() && prior.default.is_none() {
                return None;
            }
            Some(AlterSpec::SetDefault {
                column: column.clone(),
                default: prior.default.clone(),
            })
        }
        AlterSpec::AddConstraint(constraint) => match constraint.kind {
            IndexKind::Primary => Some(AlterSpec::DropPrimaryKey),
            IndexKind::ForeignKey if !constraint.name.is_empty() => {
                Some(AlterSpec::DropForeignKey {
                    name: constraint.name.clone(),
                })
            }
            IndexKind::Unique | IndexKind::Index if !constraint.name.is_empty() => {
                Some(AlterSpec::DropIndex {
                    name: constraint.name.clone(),
                })
            }
            // An unnamed new index has no addressable inverse.
            _ => None,
        },
        AlterSpec::DropIndex { name } => pre
            .constraints
            .iter()
            .find(|c| &c.name == name)
            .map(|prior| AlterSpec::AddConstraint(prior.clone())),
        AlterSpec::DropPrimaryKey => pre
            .primary_key()
            .map(|pk| AlterSpec::AddConstraint(pk.clone())),
        AlterSpec::DropForeignKey { name } => pre
            .constraints
            .iter()
            .find(|c| c.kind == IndexKind::ForeignKey && &c.name == name)
            .map(|prior| AlterSpec::AddConstraint(prior.clone())),
        AlterSpec::RenameTable { .. } => Some(AlterSpec::RenameTable {
            to: TableRef::new(Some(&pre.schema), &pre.name),
        }),
    }
}

/// Inverse of one ALTER TABLE statement against its pre-alter definition.
/// Returns `None` when nothing needs to be undone.
pub(super) fn invert_alter(pre: &TableDefinition, at: &AlterTable) -> Option<String> {
    let mut specs = Vec::new();
    let mut rename_inverted = false;
    for spec in &at.specs {
        if matches!(spec, AlterSpec::RenameTable { .. }) {
            // Several renames in one statement still unwind to the single
            // pre-statement name.
            if rename_inverted {
                continue;
            }
            rename_inverted = true;
        }
        if let Some(inverse) = invert_spec(pre, spec) {
            specs.push(inverse);
        }
    }
    if specs.is_empty() {
        return None;
    }

    // The inverse targets the table under its post-statement name.
    let target = match at.rename_target() {
        Some(to) => TableRef::new(
            Some(to.schema.as_deref().unwrap_or(&pre.schema)),
            &to.name,
        ),
        None => pre.table_ref(),
    };
    let inverse = Statement::AlterTable(AlterTable {
        table: target,
        specs,
    });
    Some(format!("{};", inverse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlDialect;
    use pretty_assertions::assert_eq;

    fn pre() -> TableDefinition {
        TableDefinition::from_create_sql(
            "shop",
            SqlDialect::MySql,
            "CREATE TABLE t (
                id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT,
                v1 VARCHAR(255) DEFAULT NULL,
                PRIMARY KEY (id),
                KEY v1_idx (v1)
            )",
        )
        .unwrap()
    }

    fn alter(specs: Vec<AlterSpec>) -> AlterTable {
        AlterTable {
            table: TableRef::new(Some("shop"), "t"),
            specs,
        }
    }

    #[test]
    fn test_drop_column_inverse_restores_definition() {
        let inverse = invert_alter(
            &pre(),
            &alter(vec![AlterSpec::DropColumn {
                name: "v1".to_string(),
            }]),
        )
        .unwrap();
        assert_eq!(
            inverse,
            "ALTER TABLE `shop`.`t` ADD COLUMN `v1` VARCHAR(255) DEFAULT NULL;"
        );
    }

    #[test]
    fn test_drop_absent_column_has_no_inverse() {
        let inverse = invert_alter(
            &pre(),
            &alter(vec![AlterSpec::DropColumn {
                name: "ghost".to_string(),
            }]),
        );
        assert_eq!(inverse, None);
    }

    #[test]
    fn test_drop_index_inverse_readds_constraint() {
        let inverse = invert_alter(
            &pre(),
            &alter(vec![AlterSpec::DropIndex {
                name: "v1_idx".to_string(),
            }]),
        )
        .unwrap();
        assert_eq!(
            inverse,
            "ALTER TABLE `shop`.`t` ADD KEY `v1_idx` (`v1`);"
        );
    }

    #[test]
    fn test_rename_inverse_targets_new_name() {
        let inverse = invert_alter(
            &pre(),
            &alter(vec![AlterSpec::RenameTable {
                to: TableRef::new(None, "t_v2"),
            }]),
        )
        .unwrap();
        assert_eq!(inverse, "ALTER TABLE `shop`.`t_v2` RENAME TO `shop`.`t`;");
    }

    #[test]
    fn test_drop_default_pair_is_noop() {
        let inverse = invert_alter(
            &pre(),
            &alter(vec![AlterSpec::SetDefault {
                column: "id".to_string(),
                default: None,
            }]),
        );
        assert_eq!(inverse, None);
    }

    #[test]
    fn test_unnamed_added_index_is_skipped() {
        let inverse = invert_alter(
            &pre(),
            &alter(vec![AlterSpec::AddConstraint(
                crate::statement::IndexConstraint {
                    name: String::new(),
                    kind: IndexKind::Index,
                    columns: vec!["v1".to_string()],
                    reference: None,
                    options: vec![],
                },
            )]),
        );
        assert_eq!(inverse, None);
    }
}
