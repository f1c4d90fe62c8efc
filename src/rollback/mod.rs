//! Rollback synthesis.
//!
//! Walks a batch in forward order, computing each statement's inverse
//! against the catalog state in force just before that statement, then
//! advancing the catalog. The public script is the reverse of emission
//! order: replaying inverses must walk backward through the batch like an
//! undo stack. An empty entry means the statement has no meaningful
//! inverse; entries always line up one-to-one with the input.

mod alter;
mod dml;

use tracing::debug;

use crate::catalog::SchemaCatalog;
use crate::config::ReviewConfig;
use crate::error::ReviewResult;
use crate::statement::Statement;

pub struct RollbackSynthesizer<'a> {
    config: &'a ReviewConfig,
}

impl<'a> RollbackSynthesizer<'a> {
    pub fn new(config: &'a ReviewConfig) -> Self {
        Self { config }
    }

    /// Compute one statement's inverse, then fold the statement into the
    /// catalog. Returns an empty string when there is nothing to undo.
    pub fn process(
        &self,
        catalog: &mut SchemaCatalog,
        stmt: &Statement,
    ) -> ReviewResult<String> {
        match stmt {
            Statement::CreateSchema(cs) => {
                let existed = catalog.schema_exists(&cs.name)?;
                catalog.apply(stmt)?;
                if existed && cs.if_not_exists {
                    return Ok(String::new());
                }
                Ok(format!("DROP SCHEMA IF EXISTS `{}`;", cs.name))
            }
            Statement::CreateTable(ct) => {
                let schema_existed = match catalog.resolve(&ct.table) {
                    Some((schema, _)) => catalog.schema_exists(&schema)?,
                    None => false,
                };
                let pre = catalog.apply(stmt)?;
                // A create whose schema is missing would itself fail, and a
                // satisfied IF NOT EXISTS is a no-op; neither needs undoing.
                if !schema_existed || (pre.is_some() && ct.if_not_exists) {
                    return Ok(String::new());
                }
                let def = match catalog.resolve(&ct.table) {
                    Some((schema, name)) => format!("`{}`.`{}`", schema, name),
                    None => return Ok(String::new()),
                };
                Ok(format!("DROP TABLE IF EXISTS {};", def))
            }
            Statement::AlterTable(at) => {
                let Some(pre) = catalog.apply(stmt)? else {
                    return Ok(String::new());
                };
                Ok(alter::invert_alter(&pre, at).unwrap_or_default())
            }
            Statement::DropTable(dt) => {
                // Snapshot every definition before the drop lands.
                let mut creates = Vec::new();
                for table in &dt.tables {
                    if let Some((schema, name)) = catalog.resolve(table) {
                        if let Some(def) = catalog.table_definition(&schema, &name)? {
                            creates.push(format!("{};", def.render_create()));
                        }
                    }
                }
                catalog.apply(stmt)?;
                Ok(creates.join("\n"))
            }
            Statement::Insert(ins) => dml::invert_insert(catalog, ins),
            Statement::Update(up) => dml::invert_update(catalog, self.config, up),
            Statement::Delete(del) => dml::invert_delete(catalog, self.config, del),
            // DROP SCHEMA loses table contents wholesale and index DDL is
            // not tracked; neither gets an inverse.
            Statement::DropSchema(_)
            | Statement::CreateIndex(_)
            | Statement::DropIndex(_)
            | Statement::Select(_)
            | Statement::UseSchema(_)
            | Statement::Unsupported(_) => {
                catalog.apply(stmt)?;
                Ok(String::new())
            }
        }
    }

    /// Rollback entries for a whole batch, reversed for replay: the i-th
    /// element of the result undoes statement N-1-i.
    pub fn synthesize(
        &self,
        catalog: &mut SchemaCatalog,
        statements: &[Statement],
    ) -> ReviewResult<Vec<String>> {
        let mut entries = Vec::with_capacity(statements.len());
        for stmt in statements {
            entries.push(self.process(catalog, stmt)?);
        }
        debug!(
            statements = statements.len(),
            nonempty = entries.iter().filter(|e| !e.is_empty()).count(),
            "synthesized rollback batch"
        );
        entries.reverse();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::{row, MemorySource};
    use crate::parser::{parse_all, SqlDialect};
    use pretty_assertions::assert_eq;

    const ORDERS_SQL: &str = "CREATE TABLE orders (
        id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT,
        v1 VARCHAR(255) DEFAULT NULL,
        PRIMARY KEY (id)
    )";

    fn catalog_from(source: MemorySource) -> SchemaCatalog {
        let mut catalog = SchemaCatalog::new(Box::new(source), SqlDialect::MySql);
        catalog.set_current_schema("shop");
        catalog
    }

    fn catalog_from_rc(source: std::rc::Rc<MemorySource>) -> SchemaCatalog {
        let mut catalog = SchemaCatalog::new(Box::new(source), SqlDialect::MySql);
        catalog.set_current_schema("shop");
        catalog
    }

    fn synthesize(catalog: &mut SchemaCatalog, sql: &str) -> Vec<String> {
        let config = ReviewConfig::default();
        let statements = parse_all(SqlDialect::MySql, sql).unwrap();
        RollbackSynthesizer::new(&config)
            .synthesize(catalog, &statements)
            .unwrap()
    }

    #[test]
    fn test_unreachable_source_aborts_synthesis() {
        let source =
            std::rc::Rc::new(MemorySource::new(&["shop"]).with_table("shop", "orders", ORDERS_SQL));
        let handle = source.clone();
        let mut catalog = catalog_from_rc(source);
        handle.set_offline(true);
        let config = ReviewConfig::default();
        let statements =
            parse_all(SqlDialect::MySql, "DELETE FROM orders WHERE id = 7;").unwrap();
        let err = RollbackSynthesizer::new(&config)
            .synthesize(&mut catalog, &statements)
            .unwrap_err();
        assert!(matches!(err, crate::error::ReviewError::RemoteUnavailable(_)));
    }

    #[test]
    fn test_script_is_reversed() {
        let mut catalog = catalog_from(MemorySource::new(&["shop"]));
        let script = synthesize(
            &mut catalog,
            "CREATE TABLE a (id INT PRIMARY KEY);
             CREATE TABLE b (id INT PRIMARY KEY);",
        );
        assert_eq!(
            script,
            vec![
                "DROP TABLE IF EXISTS `shop`.`b`;".to_string(),
                "DROP TABLE IF EXISTS `shop`.`a`;".to_string(),
            ]
        );
    }

    #[test]
    fn test_create_in_missing_schema_is_suppressed() {
        let mut catalog = catalog_from(MemorySource::new(&["shop"]));
        catalog.set_current_schema("nowhere");
        let script = synthesize(&mut catalog, "CREATE TABLE a (id INT PRIMARY KEY);");
        assert_eq!(script, vec![String::new()]);
    }

    #[test]
    fn test_drop_column_round_trip() {
        let source = MemorySource::new(&["shop"]).with_table("shop", "orders", ORDERS_SQL);
        let mut catalog = catalog_from(source);
        let original = catalog.table_definition("shop", "orders").unwrap().unwrap();

        let script = synthesize(&mut catalog, "ALTER TABLE orders DROP COLUMN v1;");
        assert_eq!(
            script,
            vec!["ALTER TABLE `shop`.`orders` ADD COLUMN `v1` VARCHAR(255) DEFAULT NULL;"
                .to_string()]
        );

        // Applying the rollback restores the original column definition.
        let rollback = parse_all(SqlDialect::MySql, &script[0]).unwrap();
        catalog.apply(&rollback[0]).unwrap();
        let restored = catalog.table_definition("shop", "orders").unwrap().unwrap();
        assert_eq!(restored.column("v1"), original.column("v1"));
    }

    #[test]
    fn test_insert_inverse_deletes_by_primary_key() {
        let source = MemorySource::new(&["shop"]).with_table("shop", "orders", ORDERS_SQL);
        let mut catalog = catalog_from(source);
        let script = synthesize(&mut catalog, "INSERT INTO orders (id, v1) VALUES (10, 'x');");
        assert_eq!(
            script,
            vec!["DELETE FROM `shop`.`orders` WHERE `id` = '10';".to_string()]
        );
    }

    #[test]
    fn test_insert_without_pk_literal_is_skipped() {
        let source = MemorySource::new(&["shop"]).with_table("shop", "orders", ORDERS_SQL);
        let mut catalog = catalog_from(source);
        let script = synthesize(&mut catalog, "INSERT INTO orders (v1) VALUES ('x');");
        assert_eq!(script, vec![String::new()]);
    }

    #[test]
    fn test_dml_without_primary_key_is_skipped() {
        let source = MemorySource::new(&["shop"]).with_table(
            "shop",
            "log",
            "CREATE TABLE log (line VARCHAR(255))",
        );
        let mut catalog = catalog_from(source);
        let script = synthesize(
            &mut catalog,
            "UPDATE log SET line = 'x' WHERE line = 'y';
             DELETE FROM log WHERE line = 'x';",
        );
        assert_eq!(script, vec![String::new(), String::new()]);
    }

    #[test]
    fn test_delete_inverse_reconstructs_rows() {
        let source = MemorySource::new(&["shop"])
            .with_table("shop", "orders", ORDERS_SQL)
            .with_rows(
                "SELECT * FROM `shop`.`orders` WHERE id = 7",
                vec![row(&[("id", Some("7")), ("v1", None)])],
            );
        let mut catalog = catalog_from(source);
        let script = synthesize(&mut catalog, "DELETE FROM orders WHERE id = 7;");
        assert_eq!(
            script,
            vec![
                "INSERT INTO `shop`.`orders` (`id`, `v1`) VALUES ('7', NULL);".to_string()
            ]
        );
    }

    #[test]
    fn test_update_inverse_restores_touched_columns() {
        let source = MemorySource::new(&["shop"])
            .with_table("shop", "orders", ORDERS_SQL)
            .with_rows(
                "SELECT * FROM `shop`.`orders` WHERE id = 7",
                vec![row(&[("id", Some("7")), ("v1", Some("before"))])],
            );
        let mut catalog = catalog_from(source);
        let script = synthesize(&mut catalog, "UPDATE orders SET v1 = 'after' WHERE id = 7;");
        assert_eq!(
            script,
            vec![
                "UPDATE `shop`.`orders` SET `v1` = 'before' WHERE `id` = '7';".to_string()
            ]
        );
    }

    #[test]
    fn test_update_of_primary_key_matches_new_value() {
        let source = MemorySource::new(&["shop"])
            .with_table("shop", "orders", ORDERS_SQL)
            .with_rows(
                "SELECT * FROM `shop`.`orders` WHERE id = 7",
                vec![row(&[("id", Some("7")), ("v1", Some("x"))])],
            );
        let mut catalog = catalog_from(source);
        let script = synthesize(&mut catalog, "UPDATE orders SET id = 8 WHERE id = 7;");
        assert_eq!(
            script,
            vec!["UPDATE `shop`.`orders` SET `id` = '7' WHERE `id` = '8';".to_string()]
        );
    }

    #[test]
    fn test_drop_table_inverse_is_create_text() {
        let source = MemorySource::new(&["shop"]).with_table("shop", "orders", ORDERS_SQL);
        let mut catalog = catalog_from(source);
        let script = synthesize(&mut catalog, "DROP TABLE orders;");
        assert_eq!(script.len(), 1);
        assert!(script[0].starts_with("CREATE TABLE `shop`.`orders` ("));
        assert!(script[0].contains("`v1` VARCHAR(255) DEFAULT NULL"));
    }

    #[test]
    fn test_rename_then_rollback_uses_post_name() {
        let source = MemorySource::new(&["shop"]).with_table("shop", "orders", ORDERS_SQL);
        let mut catalog = catalog_from(source);
        let script = synthesize(&mut catalog, "ALTER TABLE orders RENAME TO orders_v2;");
        assert_eq!(
            script,
            vec!["ALTER TABLE `shop`.`orders_v2` RENAME TO `shop`.`orders`;".to_string()]
        );
    }
}
