//! Check function bodies.
//!
//! Every check is a pure function of one statement plus the catalog; it
//! reports findings only under the rule it was invoked for and never treats
//! a missing object as an error.

use super::{rule_names, BatchState, FindingSet, Rule};
use crate::catalog::SchemaCatalog;
use crate::config::ReviewConfig;
use crate::error::ReviewResult;
use crate::keywords::is_reserved;
use crate::statement::{AlterSpec, Column, IndexConstraint, IndexKind, Statement, TableRef};

pub(crate) const MAX_INDEXES_PER_TABLE: usize = 5;
pub(crate) const MAX_COLUMNS_PER_INDEX: usize = 5;
pub(crate) const MAX_IDENTIFIER_BYTES: usize = 64;

pub(crate) struct CheckCtx<'a> {
    rule: &'a Rule,
    catalog: &'a mut SchemaCatalog,
    config: &'a ReviewConfig,
    findings: &'a mut FindingSet,
    state: &'a mut BatchState,
}

impl<'a> CheckCtx<'a> {
    pub(crate) fn new(
        rule: &'a Rule,
        catalog: &'a mut SchemaCatalog,
        config: &'a ReviewConfig,
        findings: &'a mut FindingSet,
        state: &'a mut BatchState,
    ) -> Self {
        Self {
            rule,
            catalog,
            config,
            findings,
            state,
        }
    }

    /// True when the active rule is `name`; checks that serve several rules
    /// filter on this before emitting.
    fn active(&self, name: &str) -> bool {
        self.rule.name == name
    }

    fn emit(&mut self, message: String) {
        self.findings.push(self.rule.severity, message);
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Existence requirements referenced by one statement, de-duplicated.
#[derive(Default)]
struct ExistenceRefs {
    schemas_must_exist: Vec<String>,
    schemas_must_be_absent: Vec<String>,
    tables_must_exist: Vec<(String, String)>,
    tables_must_be_absent: Vec<(String, String)>,
}

impl ExistenceRefs {
    fn require_table(&mut self, catalog: &SchemaCatalog, table: &TableRef) {
        if let Some((schema, name)) = catalog.resolve(table) {
            push_unique(&mut self.schemas_must_exist, schema.clone());
            push_unique(&mut self.tables_must_exist, (schema, name));
        }
    }

    fn collect(catalog: &SchemaCatalog, stmt: &Statement) -> Self {
        let mut refs = Self::default();
        match stmt {
            Statement::CreateSchema(cs) => {
                if !cs.if_not_exists {
                    push_unique(&mut refs.schemas_must_be_absent, cs.name.clone());
                }
            }
            Statement::DropSchema(ds) => {
                if !ds.if_exists {
                    push_unique(&mut refs.schemas_must_exist, ds.name.clone());
                }
            }
            Statement::CreateTable(ct) => {
                if let Some((schema, name)) = catalog.resolve(&ct.table) {
                    push_unique(&mut refs.schemas_must_exist, schema.clone());
                    if !ct.if_not_exists {
                        push_unique(&mut refs.tables_must_be_absent, (schema, name));
                    }
                }
            }
            Statement::AlterTable(at) => refs.require_table(catalog, &at.table),
            Statement::DropTable(dt) => {
                if !dt.if_exists {
                    for table in &dt.tables {
                        refs.require_table(catalog, table);
                    }
                }
            }
            Statement::CreateIndex(ci) => refs.require_table(catalog, &ci.table),
            Statement::DropIndex(di) => {
                if let Some(table) = &di.table {
                    refs.require_table(catalog, table);
                }
            }
            Statement::Insert(ins) => refs.require_table(catalog, &ins.table),
            Statement::Update(up) => {
                for table in &up.tables {
                    refs.require_table(catalog, table);
                }
            }
            Statement::Delete(del) => {
                for table in &del.tables {
                    refs.require_table(catalog, table);
                }
            }
            Statement::Select(sel) => {
                for table in &sel.tables {
                    refs.require_table(catalog, table);
                }
            }
            Statement::UseSchema(name) => {
                push_unique(&mut refs.schemas_must_exist, name.clone());
            }
            Statement::Unsupported(_) => {}
        }
        refs
    }
}

pub(crate) fn check_object_existence(
    ctx: &mut CheckCtx<'_>,
    stmt: &Statement,
) -> ReviewResult<()> {
    let refs = ExistenceRefs::collect(ctx.catalog, stmt);

    if ctx.active(rule_names::SCHEMA_NOT_EXIST) {
        for schema in &refs.schemas_must_exist {
            if !ctx.catalog.schema_exists(schema)? {
                ctx.emit(format!("schema `{}` does not exist", schema));
            }
        }
    }
    if ctx.active(rule_names::SCHEMA_EXIST) {
        for schema in &refs.schemas_must_be_absent {
            if ctx.catalog.schema_exists(schema)? {
                ctx.emit(format!("schema `{}` already exists", schema));
            }
        }
    }
    if ctx.active(rule_names::TABLE_NOT_EXIST) {
        for (schema, table) in &refs.tables_must_exist {
            if !ctx.catalog.table_exists(schema, table)? {
                ctx.emit(format!("table `{}`.`{}` does not exist", schema, table));
            }
        }
    }
    if ctx.active(rule_names::TABLE_EXIST) {
        for (schema, table) in &refs.tables_must_be_absent {
            if ctx.catalog.table_exists(schema, table)? {
                ctx.emit(format!("table `{}`.`{}` already exists", schema, table));
            }
        }
    }
    Ok(())
}

pub(crate) fn check_primary_key(ctx: &mut CheckCtx<'_>, stmt: &Statement) -> ReviewResult<()> {
    let Statement::CreateTable(ct) = stmt else {
        return Ok(());
    };
    let primary = ct
        .constraints
        .iter()
        .find(|c| c.kind == IndexKind::Primary);

    match primary {
        None => {
            if ctx.active(rule_names::DDL_TABLE_WITHOUT_PK) {
                ctx.emit(format!("table `{}` has no primary key", ct.table.name));
            }
        }
        Some(pk) if ctx.active(rule_names::DDL_PK_NOT_AUTO_UNSIGNED_BIGINT) => {
            let canonical = pk.columns.len() == 1
                && ct
                    .columns
                    .iter()
                    .find(|c| c.name == pk.columns[0])
                    .is_some_and(Column::is_auto_unsigned_bigint);
            if !canonical {
                ctx.emit(format!(
                    "primary key of `{}` is not a single auto-increment unsigned bigint column",
                    ct.table.name
                ));
            }
        }
        Some(_) => {}
    }
    Ok(())
}

pub(crate) fn check_merge_alter(ctx: &mut CheckCtx<'_>, stmt: &Statement) -> ReviewResult<()> {
    let Statement::AlterTable(at) = stmt else {
        return Ok(());
    };
    let Some(resolved) = ctx.catalog.resolve(&at.table) else {
        return Ok(());
    };
    let seen = {
        let count = ctx.state.altered.entry(resolved.clone()).or_insert(0);
        *count += 1;
        *count
    };
    if seen > 1 {
        ctx.emit(format!(
            "table `{}`.`{}` is altered more than once in this batch; merge the ALTER TABLE statements",
            resolved.0, resolved.1
        ));
    }
    Ok(())
}

/// The table shape a statement would produce: effective columns plus
/// existing and newly added indexes, computed without advancing the catalog.
struct IndexShape {
    table: String,
    columns: Vec<Column>,
    existing: Vec<IndexConstraint>,
    added: Vec<IndexConstraint>,
}

fn index_shape(
    catalog: &mut SchemaCatalog,
    stmt: &Statement,
) -> ReviewResult<Option<IndexShape>> {
    match stmt {
        Statement::CreateTable(ct) => Ok(Some(IndexShape {
            table: ct.table.name.clone(),
            columns: ct.columns.clone(),
            existing: Vec::new(),
            added: ct
                .constraints
                .iter()
                .filter(|c| c.kind != IndexKind::ForeignKey)
                .cloned()
                .collect(),
        })),
        Statement::AlterTable(at) => {
            let Some((schema, table)) = catalog.resolve(&at.table) else {
                return Ok(None);
            };
            let Some(pre) = catalog.table_definition(&schema, &table)? else {
                return Ok(None);
            };
            let mut columns = pre.columns.clone();
            let mut added = Vec::new();
            for spec in &at.specs {
                match spec {
                    AlterSpec::AddColumn(column) => columns.push(column.clone()),
                    AlterSpec::ChangeColumn { old_name, column } => {
                        if let Some(slot) = columns.iter_mut().find(|c| &c.name == old_name) {
                            *slot = column.clone();
                        }
                    }
                    AlterSpec::AddConstraint(c) if c.kind != IndexKind::ForeignKey => {
                        added.push(c.clone());
                    }
                    _ => {}
                }
            }
            Ok(Some(IndexShape {
                table,
                columns,
                existing: pre.indexes().cloned().collect(),
                added,
            }))
        }
        Statement::CreateIndex(ci) => {
            let Some((schema, table)) = catalog.resolve(&ci.table) else {
                return Ok(None);
            };
            let Some(pre) = catalog.table_definition(&schema, &table)? else {
                return Ok(None);
            };
            Ok(Some(IndexShape {
                table,
                columns: pre.columns.clone(),
                existing: pre.indexes().cloned().collect(),
                added: vec![IndexConstraint {
                    name: ci.name.clone(),
                    kind: if ci.unique {
                        IndexKind::Unique
                    } else {
                        IndexKind::Index
                    },
                    columns: ci.columns.clone(),
                    reference: None,
                    options: ci.options.clone(),
                }],
            }))
        }
        _ => Ok(None),
    }
}

fn index_label(index: &IndexConstraint) -> &str {
    if index.name.is_empty() {
        "(unnamed)"
    } else {
        &index.name
    }
}

pub(crate) fn check_index_shape(ctx: &mut CheckCtx<'_>, stmt: &Statement) -> ReviewResult<()> {
    let Some(shape) = index_shape(ctx.catalog, stmt)? else {
        return Ok(());
    };

    if ctx.active(rule_names::DDL_TOO_MANY_INDEXES) {
        let total = shape.existing.len() + shape.added.len();
        if total > MAX_INDEXES_PER_TABLE {
            ctx.emit(format!(
                "table `{}` would have {} indexes, more than the limit of {}",
                shape.table, total, MAX_INDEXES_PER_TABLE
            ));
        }
    }

    if ctx.active(rule_names::DDL_INDEX_TOO_MANY_COLUMNS) {
        for index in &shape.added {
            if index.columns.len() > MAX_COLUMNS_PER_INDEX {
                ctx.emit(format!(
                    "index `{}` on `{}` covers {} columns, more than the limit of {}",
                    index_label(index),
                    shape.table,
                    index.columns.len(),
                    MAX_COLUMNS_PER_INDEX
                ));
            }
        }
    }

    if ctx.active(rule_names::DDL_INDEX_ON_BLOB) {
        for index in shape.existing.iter().chain(&shape.added) {
            for column in &shape.columns {
                if column.is_blob_like() && index.covers(&column.name) {
                    ctx.emit(format!(
                        "index `{}` on `{}` covers BLOB/TEXT column `{}`",
                        index_label(index),
                        shape.table,
                        column.name
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Identifiers a statement introduces, in statement order.
fn introduced_identifiers(stmt: &Statement) -> Vec<String> {
    let mut idents = Vec::new();
    match stmt {
        Statement::CreateSchema(cs) => idents.push(cs.name.clone()),
        Statement::CreateTable(ct) => {
            idents.push(ct.table.name.clone());
            idents.extend(ct.columns.iter().map(|c| c.name.clone()));
            idents.extend(
                ct.constraints
                    .iter()
                    .filter(|c| !c.name.is_empty())
                    .map(|c| c.name.clone()),
            );
        }
        Statement::AlterTable(at) => {
            for spec in &at.specs {
                match spec {
                    AlterSpec::AddColumn(column) => idents.push(column.name.clone()),
                    AlterSpec::ChangeColumn { column, .. } => idents.push(column.name.clone()),
                    AlterSpec::RenameColumn { new_name, .. } => idents.push(new_name.clone()),
                    AlterSpec::AddConstraint(c) if !c.name.is_empty() => {
                        idents.push(c.name.clone())
                    }
                    AlterSpec::RenameTable { to } => idents.push(to.name.clone()),
                    _ => {}
                }
            }
        }
        Statement::CreateIndex(ci) if !ci.name.is_empty() => idents.push(ci.name.clone()),
        _ => {}
    }
    idents
}

pub(crate) fn check_identifiers(ctx: &mut CheckCtx<'_>, stmt: &Statement) -> ReviewResult<()> {
    let idents = introduced_identifiers(stmt);

    if ctx.active(rule_names::DDL_IDENTIFIER_TOO_LONG) {
        let mut seen = Vec::new();
        for ident in &idents {
            if ident.len() > MAX_IDENTIFIER_BYTES && !seen.contains(ident) {
                seen.push(ident.clone());
                ctx.emit(format!(
                    "identifier `{}` is longer than {} bytes",
                    ident, MAX_IDENTIFIER_BYTES
                ));
            }
        }
    }

    if ctx.active(rule_names::DDL_DISABLE_USING_KEYWORD) {
        let mut offending: Vec<String> = Vec::new();
        for ident in &idents {
            if is_reserved(ident) {
                push_unique(&mut offending, ident.clone());
            }
        }
        if !offending.is_empty() {
            ctx.emit(format!(
                "identifiers collide with reserved keywords: {}",
                offending.join(", ")
            ));
        }
    }
    Ok(())
}

pub(crate) fn check_destructive(ctx: &mut CheckCtx<'_>, stmt: &Statement) -> ReviewResult<()> {
    match stmt {
        Statement::DropSchema(ds) => {
            ctx.emit(format!("DROP SCHEMA `{}` is disallowed", ds.name));
        }
        Statement::DropTable(dt) => {
            let targets: Vec<String> = dt.tables.iter().map(|t| t.to_string()).collect();
            ctx.emit(format!("DROP TABLE {} is disallowed", targets.join(", ")));
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn check_sharding(ctx: &mut CheckCtx<'_>, stmt: &Statement) -> ReviewResult<()> {
    // Multi-table DML falls outside the sharding model and is skipped.
    // An INSERT without a column list implicitly carries every column.
    let (table, referenced, implicit_all) = match stmt {
        Statement::Insert(ins) => (&ins.table, &ins.columns, ins.columns.is_empty()),
        Statement::Update(up) if up.tables.len() == 1 => {
            (&up.tables[0], &up.where_columns, false)
        }
        Statement::Delete(del) if del.tables.len() == 1 => {
            (&del.tables[0], &del.where_columns, false)
        }
        _ => return Ok(()),
    };
    let Some((schema, name)) = ctx.catalog.resolve(table) else {
        return Ok(());
    };
    let Some(column) = ctx.config.sharding_column(&schema, &name) else {
        return Ok(());
    };
    if !implicit_all && !referenced.iter().any(|c| c == column) {
        let column = column.to_string();
        ctx.emit(format!(
            "write on `{}`.`{}` does not constrain sharding column `{}`",
            schema, name, column
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{Advisor, RuleRegistry, Severity};
    use crate::catalog::memory::MemorySource;
    use crate::parser::{parse_all, SqlDialect};
    use pretty_assertions::assert_eq;

    fn catalog_with(tables: &[(&str, &str)]) -> SchemaCatalog {
        let mut source = MemorySource::new(&["shop"]);
        for (name, sql) in tables {
            source = source.with_table("shop", name, sql);
        }
        let mut catalog = SchemaCatalog::new(Box::new(source), SqlDialect::MySql);
        catalog.set_current_schema("shop");
        catalog
    }

    fn advise(catalog: &mut SchemaCatalog, active_names: &[&str], sql: &str) -> Vec<FindingSet> {
        let registry = RuleRegistry::default();
        let config = ReviewConfig::default();
        let active: Vec<Rule> = active_names
            .iter()
            .map(|n| registry.rule(n).unwrap().clone())
            .collect();
        let statements = parse_all(SqlDialect::MySql, sql).unwrap();
        Advisor::new(&registry, &config)
            .advise(catalog, &statements, &active)
            .unwrap()
    }

    #[test]
    fn test_missing_table_is_flagged_once() {
        let mut catalog = catalog_with(&[]);
        let results = advise(
            &mut catalog,
            &[rule_names::TABLE_NOT_EXIST],
            "ALTER TABLE ghost ADD COLUMN c INT;",
        );
        assert_eq!(results[0].findings.len(), 1);
        assert_eq!(
            results[0].findings[0].message,
            "table `shop`.`ghost` does not exist"
        );
    }

    #[test]
    fn test_create_over_existing_table() {
        let mut catalog = catalog_with(&[("orders", "CREATE TABLE orders (id INT PRIMARY KEY)")]);
        let results = advise(
            &mut catalog,
            &[rule_names::TABLE_EXIST],
            "CREATE TABLE orders (id INT PRIMARY KEY);
             CREATE TABLE IF NOT EXISTS orders (id INT PRIMARY KEY);",
        );
        assert_eq!(results[0].findings.len(), 1);
        assert!(results[1].is_empty());
    }

    #[test]
    fn test_primary_key_rules() {
        let mut catalog = catalog_with(&[]);
        let results = advise(
            &mut catalog,
            &[
                rule_names::DDL_TABLE_WITHOUT_PK,
                rule_names::DDL_PK_NOT_AUTO_UNSIGNED_BIGINT,
            ],
            "CREATE TABLE a (v INT);
             CREATE TABLE b (id INT, PRIMARY KEY (id));
             CREATE TABLE c (id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT, PRIMARY KEY (id));",
        );
        assert_eq!(results[0].findings.len(), 1);
        assert!(results[0].findings[0].message.contains("no primary key"));
        assert_eq!(results[1].findings.len(), 1);
        assert!(results[1].findings[0]
            .message
            .contains("auto-increment unsigned bigint"));
        assert!(results[2].is_empty());
    }

    #[test]
    fn test_merge_alter_flags_second_statement() {
        let mut catalog = catalog_with(&[("orders", "CREATE TABLE orders (id INT PRIMARY KEY)")]);
        let results = advise(
            &mut catalog,
            &[rule_names::DDL_MERGE_ALTER_TABLE],
            "ALTER TABLE orders ADD COLUMN a INT;
             ALTER TABLE orders ADD COLUMN b INT;",
        );
        assert!(results[0].is_empty());
        assert_eq!(results[1].findings.len(), 1);
    }

    #[test]
    fn test_too_many_indexes() {
        let mut catalog = catalog_with(&[(
            "wide",
            "CREATE TABLE wide (
                id INT PRIMARY KEY, a INT, b INT, c INT, d INT, e INT,
                KEY k1 (a), KEY k2 (b), KEY k3 (c), KEY k4 (d)
            )",
        )]);
        let results = advise(
            &mut catalog,
            &[rule_names::DDL_TOO_MANY_INDEXES],
            "ALTER TABLE wide ADD KEY k5 (e);",
        );
        assert_eq!(results[0].findings.len(), 1);
        assert!(results[0].findings[0].message.contains("6 indexes"));
    }

    #[test]
    fn test_index_with_too_many_columns() {
        let mut catalog = catalog_with(&[]);
        let results = advise(
            &mut catalog,
            &[rule_names::DDL_INDEX_TOO_MANY_COLUMNS],
            "CREATE TABLE t (a INT, b INT, c INT, d INT, e INT, f INT,
                KEY wide_key (a, b, c, d, e, f));",
        );
        assert_eq!(results[0].findings.len(), 1);
        assert!(results[0].findings[0].message.contains("wide_key"));
    }

    #[test]
    fn test_index_on_blob_column() {
        let mut catalog = catalog_with(&[(
            "docs",
            "CREATE TABLE docs (id INT PRIMARY KEY, body TEXT)",
        )]);
        let results = advise(
            &mut catalog,
            &[rule_names::DDL_INDEX_ON_BLOB],
            "ALTER TABLE docs ADD KEY body_idx (body);",
        );
        assert_eq!(results[0].findings.len(), 1);
        assert!(results[0].findings[0].message.contains("body"));
    }

    #[test]
    fn test_keyword_collisions_are_joined() {
        let mut catalog = catalog_with(&[]);
        let results = advise(
            &mut catalog,
            &[
                rule_names::DDL_DISABLE_USING_KEYWORD,
                rule_names::DDL_IDENTIFIER_TOO_LONG,
            ],
            "CREATE TABLE `table` (v1 INT, INDEX `select` (v1));",
        );
        assert_eq!(results[0].findings.len(), 1);
        assert_eq!(
            results[0].findings[0].message,
            "identifiers collide with reserved keywords: table, select"
        );
    }

    #[test]
    fn test_identifier_length() {
        let long = "c".repeat(65);
        let mut catalog = catalog_with(&[]);
        let results = advise(
            &mut catalog,
            &[rule_names::DDL_IDENTIFIER_TOO_LONG],
            &format!("CREATE TABLE t ({} INT);", long),
        );
        assert_eq!(results[0].findings.len(), 1);
        assert!(results[0].findings[0].message.contains(&long));
    }

    #[test]
    fn test_destructive_drop() {
        let mut catalog = catalog_with(&[("orders", "CREATE TABLE orders (id INT PRIMARY KEY)")]);
        let results = advise(
            &mut catalog,
            &[rule_names::DDL_DISABLE_DROP],
            "DROP TABLE orders;",
        );
        assert_eq!(results[0].severity(), Severity::Error);
    }

    #[test]
    fn test_sharding_column_checks() {
        let registry = RuleRegistry::default();
        let mut config = ReviewConfig::default();
        config
            .sharding_columns
            .insert("shop.orders".to_string(), "shop_id".to_string());
        let mut catalog =
            catalog_with(&[("orders", "CREATE TABLE orders (id INT PRIMARY KEY, shop_id INT)")]);
        let active = vec![registry
            .rule(rule_names::DML_MISSING_SHARDING_COLUMN)
            .unwrap()
            .clone()];
        let statements = parse_all(
            SqlDialect::MySql,
            "UPDATE orders SET id = 2 WHERE id = 1;
             UPDATE orders SET id = 2 WHERE shop_id = 7;
             INSERT INTO orders (id) VALUES (1);",
        )
        .unwrap();
        let results = Advisor::new(&registry, &config)
            .advise(&mut catalog, &statements, &active)
            .unwrap();
        assert_eq!(results[0].findings.len(), 1);
        assert!(results[1].is_empty());
        assert_eq!(results[2].findings.len(), 1);
    }
}
