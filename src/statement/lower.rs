//! Lowering from the external parser's AST into the statement model.
//!
//! Only the constructs the review core understands are lowered structurally.
//! Everything else is carried as [`Statement::Unsupported`] with its rendered
//! text, so a batch never fails just because one statement falls outside the
//! modeled surface.

use sqlparser::ast::{
    self, AlterColumnOperation, AlterTableOperation, AssignmentTarget, ColumnDef, ColumnOption,
    DataType, Expr, FromTable, Ident, ObjectName, ObjectType, OrderByExpr, SchemaName, SetExpr,
    TableConstraint, TableFactor, TableObject, TableWithJoins, UnaryOperator, Use, Value,
};

use super::{
    AlterSpec, AlterTable, Assignment, Column, CreateIndex, CreateSchema, CreateTable, Delete,
    DropIndex, DropSchema, DropTable, ForeignKeyRef, IndexConstraint, IndexKind, Insert, Select,
    Statement, TableRef, Update, ValueExpr,
};

fn ident_value(ident: &Ident) -> String {
    ident.value.clone()
}

fn name_tail(name: &ObjectName) -> String {
    name.0.last().map(ident_value).unwrap_or_default()
}

fn table_ref(name: &ObjectName) -> TableRef {
    match name.0.as_slice() {
        [table] => TableRef {
            schema: None,
            name: ident_value(table),
        },
        [schema, .., table] => TableRef {
            schema: Some(ident_value(schema)),
            name: ident_value(table),
        },
        [] => TableRef {
            schema: None,
            name: String::new(),
        },
    }
}

fn expr_column_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident_value(ident),
        Expr::CompoundIdentifier(parts) => parts.last().map(ident_value).unwrap_or_default(),
        other => other.to_string(),
    }
}

fn value_expr(expr: &Expr) -> ValueExpr {
    match expr {
        Expr::Value(Value::Number(n, _)) => ValueExpr::Literal(n.clone()),
        Expr::Value(Value::SingleQuotedString(s)) => ValueExpr::Literal(s.clone()),
        Expr::Value(Value::DoubleQuotedString(s)) => ValueExpr::Literal(s.clone()),
        Expr::Value(Value::Boolean(b)) => ValueExpr::Literal(b.to_string()),
        Expr::Value(Value::Null) => ValueExpr::Null,
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match value_expr(expr) {
            ValueExpr::Literal(n) => ValueExpr::Literal(format!("-{}", n)),
            _ => ValueExpr::Expr(expr.to_string()),
        },
        other => ValueExpr::Expr(other.to_string()),
    }
}

/// Collect column identifiers referenced anywhere in a WHERE expression.
fn collect_where_columns(expr: &Expr, out: &mut Vec<String>) {
    let mut push = |name: String| {
        if !out.contains(&name) {
            out.push(name);
        }
    };
    match expr {
        Expr::Identifier(ident) => push(ident_value(ident)),
        Expr::CompoundIdentifier(parts) => {
            if let Some(last) = parts.last() {
                push(ident_value(last));
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            collect_where_columns(left, out);
            collect_where_columns(right, out);
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) => collect_where_columns(expr, out),
        Expr::IsNull(expr) | Expr::IsNotNull(expr) => collect_where_columns(expr, out),
        Expr::InList { expr, list, .. } => {
            collect_where_columns(expr, out);
            for item in list {
                collect_where_columns(item, out);
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            collect_where_columns(expr, out);
            collect_where_columns(low, out);
            collect_where_columns(high, out);
        }
        _ => {}
    }
}

fn where_columns(selection: &Option<Expr>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(expr) = selection {
        collect_where_columns(expr, &mut out);
    }
    out
}

fn tables_from_joins(items: &[TableWithJoins]) -> Vec<TableRef> {
    let mut out = Vec::new();
    for item in items {
        if let TableFactor::Table { name, .. } = &item.relation {
            out.push(table_ref(name));
        }
        for join in &item.joins {
            if let TableFactor::Table { name, .. } = &join.relation {
                out.push(table_ref(name));
            }
        }
    }
    out
}

fn is_auto_increment_tokens(tokens: &[sqlparser::tokenizer::Token]) -> bool {
    tokens
        .iter()
        .any(|t| t.to_string().eq_ignore_ascii_case("auto_increment"))
}

/// Fold a column's type and option list into the model shape. Inline
/// PRIMARY KEY / UNIQUE markers are reported back to the caller so CREATE
/// TABLE can register them as table-level constraints.
fn column_from_parts<'a>(
    name: String,
    data_type: &DataType,
    options: impl Iterator<Item = &'a ColumnOption>,
) -> (Column, Option<IndexKind>) {
    let mut column = Column {
        name,
        sql_type: data_type.to_string(),
        nullable: true,
        default: None,
        auto_increment: false,
        in_unique_key: false,
    };
    let mut inline_key = None;
    for option in options {
        match option {
            ColumnOption::NotNull => column.nullable = false,
            ColumnOption::Null => column.nullable = true,
            ColumnOption::Default(expr) => column.default = Some(expr.to_string()),
            ColumnOption::Unique { is_primary, .. } => {
                column.in_unique_key = true;
                if *is_primary {
                    column.nullable = false;
                    inline_key = Some(IndexKind::Primary);
                } else if inline_key.is_none() {
                    inline_key = Some(IndexKind::Unique);
                }
            }
            ColumnOption::DialectSpecific(tokens) if is_auto_increment_tokens(tokens) => {
                column.auto_increment = true;
            }
            _ => {}
        }
    }
    (column, inline_key)
}

fn column_from_def(def: &ColumnDef) -> (Column, Option<IndexKind>) {
    column_from_parts(
        ident_value(&def.name),
        &def.data_type,
        def.options.iter().map(|o| &o.option),
    )
}

fn constraint_from(tc: &TableConstraint) -> Option<IndexConstraint> {
    match tc {
        TableConstraint::PrimaryKey { name, columns, .. } => Some(IndexConstraint {
            name: name.as_ref().map(ident_value).unwrap_or_default(),
            kind: IndexKind::Primary,
            columns: columns.iter().map(ident_value).collect(),
            reference: None,
            options: vec![],
        }),
        TableConstraint::Unique {
            name,
            index_name,
            columns,
            ..
        } => Some(IndexConstraint {
            name: name
                .as_ref()
                .or(index_name.as_ref())
                .map(ident_value)
                .unwrap_or_default(),
            kind: IndexKind::Unique,
            columns: columns.iter().map(ident_value).collect(),
            reference: None,
            options: vec![],
        }),
        TableConstraint::Index { name, columns, .. } => Some(IndexConstraint {
            name: name.as_ref().map(ident_value).unwrap_or_default(),
            kind: IndexKind::Index,
            columns: columns.iter().map(ident_value).collect(),
            reference: None,
            options: vec![],
        }),
        TableConstraint::ForeignKey {
            name,
            columns,
            foreign_table,
            referred_columns,
            on_delete,
            on_update,
            ..
        } => Some(IndexConstraint {
            name: name.as_ref().map(ident_value).unwrap_or_default(),
            kind: IndexKind::ForeignKey,
            columns: columns.iter().map(ident_value).collect(),
            reference: Some(ForeignKeyRef {
                table: name_tail(foreign_table),
                columns: referred_columns.iter().map(ident_value).collect(),
                on_delete: on_delete.as_ref().map(|a| a.to_string()),
                on_update: on_update.as_ref().map(|a| a.to_string()),
            }),
            options: vec![],
        }),
        _ => None,
    }
}

fn alter_spec(op: &AlterTableOperation) -> Option<AlterSpec> {
    match op {
        AlterTableOperation::AddColumn { column_def, .. } => {
            let (column, _) = column_from_def(column_def);
            Some(AlterSpec::AddColumn(column))
        }
        AlterTableOperation::DropColumn { column_name, .. } => Some(AlterSpec::DropColumn {
            name: ident_value(column_name),
        }),
        AlterTableOperation::ChangeColumn {
            old_name,
            new_name,
            data_type,
            options,
            ..
        } => {
            let (column, _) = column_from_parts(ident_value(new_name), data_type, options.iter());
            Some(AlterSpec::ChangeColumn {
                old_name: ident_value(old_name),
                column,
            })
        }
        AlterTableOperation::ModifyColumn {
            col_name,
            data_type,
            options,
            ..
        } => {
            let (column, _) = column_from_parts(ident_value(col_name), data_type, options.iter());
            Some(AlterSpec::ChangeColumn {
                old_name: ident_value(col_name),
                column,
            })
        }
        AlterTableOperation::RenameColumn {
            old_column_name,
            new_column_name,
        } => Some(AlterSpec::RenameColumn {
            old_name: ident_value(old_column_name),
            new_name: ident_value(new_column_name),
        }),
        AlterTableOperation::AlterColumn { column_name, op } => {
            let column = ident_value(column_name);
            match op {
                AlterColumnOperation::SetDefault { value } => Some(AlterSpec::SetDefault {
                    column,
                    default: Some(value.to_string()),
                }),
                AlterColumnOperation::DropDefault => Some(AlterSpec::SetDefault {
                    column,
                    default: None,
                }),
                _ => None,
            }
        }
        AlterTableOperation::AddConstraint(tc) => constraint_from(tc).map(AlterSpec::AddConstraint),
        AlterTableOperation::DropConstraint { name, .. } => Some(AlterSpec::DropIndex {
            name: ident_value(name),
        }),
        AlterTableOperation::DropPrimaryKey => Some(AlterSpec::DropPrimaryKey),
        AlterTableOperation::RenameTable { table_name } => Some(AlterSpec::RenameTable {
            to: table_ref(table_name),
        }),
        _ => None,
    }
}

fn lower_create_table(ct: ast::CreateTable) -> Statement {
    let mut columns = Vec::with_capacity(ct.columns.len());
    let mut constraints: Vec<IndexConstraint> = Vec::new();
    for def in &ct.columns {
        let (column, inline_key) = column_from_def(def);
        if let Some(kind) = inline_key {
            constraints.push(IndexConstraint {
                name: String::new(),
                kind,
                columns: vec![column.name.clone()],
                reference: None,
                options: vec![],
            });
        }
        columns.push(column);
    }
    constraints.extend(ct.constraints.iter().filter_map(constraint_from));

    // Mark columns covered by a primary or unique key.
    for constraint in &constraints {
        if matches!(constraint.kind, IndexKind::Primary | IndexKind::Unique) {
            for column in columns.iter_mut() {
                if constraint.covers(&column.name) {
                    column.in_unique_key = true;
                }
            }
        }
    }

    Statement::CreateTable(CreateTable {
        table: table_ref(&ct.name),
        if_not_exists: ct.if_not_exists,
        columns,
        constraints,
        engine: ct.engine.as_ref().map(|e| e.to_string()),
        charset: ct.default_charset.clone(),
    })
}

fn lower_insert(ins: ast::Insert, rendered: String) -> Statement {
    let TableObject::TableName(name) = &ins.table else {
        return Statement::Unsupported(rendered);
    };
    let table = table_ref(name);

    // MySQL `INSERT ... SET col = val` lowers to a single explicit row.
    if !ins.assignments.is_empty() {
        let mut columns = Vec::new();
        let mut row = Vec::new();
        for assignment in &ins.assignments {
            match &assignment.target {
                AssignmentTarget::ColumnName(name) => {
                    columns.push(name_tail(name));
                    row.push(value_expr(&assignment.value));
                }
                _ => return Statement::Unsupported(rendered),
            }
        }
        return Statement::Insert(Insert {
            table,
            columns,
            rows: vec![row],
        });
    }

    let columns: Vec<String> = ins.columns.iter().map(ident_value).collect();
    let rows = match ins.source.as_deref() {
        Some(query) => match query.body.as_ref() {
            SetExpr::Values(values) => values
                .rows
                .iter()
                .map(|row| row.iter().map(value_expr).collect())
                .collect(),
            // INSERT ... SELECT carries no literal rows; keep the statement
            // so existence checks still apply, with nothing to invert.
            _ => Vec::new(),
        },
        None => Vec::new(),
    };

    Statement::Insert(Insert {
        table,
        columns,
        rows,
    })
}

/// Lower one parsed statement into the review model.
pub(crate) fn lower_statement(stmt: ast::Statement) -> Statement {
    let rendered = stmt.to_string();
    match stmt {
        ast::Statement::CreateSchema {
            schema_name,
            if_not_exists,
            ..
        } => match schema_name {
            SchemaName::Simple(name) => Statement::CreateSchema(CreateSchema {
                name: name_tail(&name),
                if_not_exists,
            }),
            _ => Statement::Unsupported(rendered),
        },
        ast::Statement::CreateDatabase {
            db_name,
            if_not_exists,
            ..
        } => Statement::CreateSchema(CreateSchema {
            name: name_tail(&db_name),
            if_not_exists,
        }),
        ast::Statement::CreateTable(ct) => lower_create_table(ct),
        ast::Statement::AlterTable {
            name, operations, ..
        } => Statement::AlterTable(AlterTable {
            table: table_ref(&name),
            specs: operations.iter().filter_map(alter_spec).collect(),
        }),
        ast::Statement::Drop {
            object_type,
            if_exists,
            names,
            ..
        } => match object_type {
            ObjectType::Table => Statement::DropTable(DropTable {
                tables: names.iter().map(table_ref).collect(),
                if_exists,
            }),
            ObjectType::Schema | ObjectType::Database => match names.first() {
                Some(name) => Statement::DropSchema(DropSchema {
                    name: name_tail(name),
                    if_exists,
                }),
                None => Statement::Unsupported(rendered),
            },
            ObjectType::Index => match names.first() {
                Some(name) => Statement::DropIndex(DropIndex {
                    name: name_tail(name),
                    table: None,
                }),
                None => Statement::Unsupported(rendered),
            },
            _ => Statement::Unsupported(rendered),
        },
        ast::Statement::CreateIndex(ci) => Statement::CreateIndex(CreateIndex {
            name: ci.name.as_ref().map(name_tail).unwrap_or_default(),
            table: table_ref(&ci.table_name),
            unique: ci.unique,
            columns: ci
                .columns
                .iter()
                .map(|ob: &OrderByExpr| expr_column_name(&ob.expr))
                .collect(),
            options: ci
                .using
                .as_ref()
                .map(|u| vec![format!("USING {}", u)])
                .unwrap_or_default(),
        }),
        ast::Statement::Insert(ins) => lower_insert(ins, rendered),
        ast::Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => {
            let mut model_assignments = Vec::with_capacity(assignments.len());
            for assignment in &assignments {
                if let AssignmentTarget::ColumnName(name) = &assignment.target {
                    model_assignments.push(Assignment {
                        column: name_tail(name),
                        value: value_expr(&assignment.value),
                    });
                }
            }
            Statement::Update(Update {
                tables: tables_from_joins(std::slice::from_ref(&table)),
                assignments: model_assignments,
                selection: selection.as_ref().map(|e| e.to_string()),
                where_columns: where_columns(&selection),
            })
        }
        ast::Statement::Delete(del) => {
            let from = match &del.from {
                FromTable::WithFromKeyword(items) | FromTable::WithoutKeyword(items) => {
                    tables_from_joins(items)
                }
            };
            Statement::Delete(Delete {
                tables: from,
                selection: del.selection.as_ref().map(|e| e.to_string()),
                where_columns: where_columns(&del.selection),
            })
        }
        ast::Statement::Query(query) => {
            let tables = match query.body.as_ref() {
                SetExpr::Select(select) => tables_from_joins(&select.from),
                _ => Vec::new(),
            };
            Statement::Select(Select {
                tables,
                text: rendered,
            })
        }
        ast::Statement::Use(u) => match u {
            Use::Object(name) | Use::Schema(name) | Use::Database(name) => {
                Statement::UseSchema(name_tail(&name))
            }
            _ => Statement::Unsupported(rendered),
        },
        _ => Statement::Unsupported(rendered),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlparser::dialect::MySqlDialect;
    use sqlparser::parser::Parser;

    fn lower_one(sql: &str) -> Statement {
        let mut parsed = Parser::parse_sql(&MySqlDialect {}, sql).unwrap();
        assert_eq!(parsed.len(), 1);
        lower_statement(parsed.remove(0))
    }

    #[test]
    fn test_lower_create_table() {
        let stmt = lower_one(
            "CREATE TABLE `shop`.`orders` (
                `id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT,
                `note` VARCHAR(64) DEFAULT 'none',
                PRIMARY KEY (`id`)
            )",
        );
        let ct = match stmt {
            Statement::CreateTable(ct) => ct,
            other => panic!("expected CreateTable, got {:?}", other),
        };
        assert_eq!(ct.table, TableRef::new(Some("shop"), "orders"));
        assert_eq!(ct.columns.len(), 2);
        assert!(ct.columns[0].auto_increment);
        assert!(ct.columns[0].is_auto_unsigned_bigint());
        assert!(ct.columns[0].in_unique_key);
        assert_eq!(ct.columns[1].default.as_deref(), Some("'none'"));
        assert_eq!(ct.constraints.len(), 1);
        assert_eq!(ct.constraints[0].kind, IndexKind::Primary);
    }

    #[test]
    fn test_lower_inline_primary_key() {
        let stmt = lower_one("CREATE TABLE t1 (id INT PRIMARY KEY, v VARCHAR(10))");
        let ct = match stmt {
            Statement::CreateTable(ct) => ct,
            other => panic!("expected CreateTable, got {:?}", other),
        };
        assert_eq!(ct.constraints.len(), 1);
        assert_eq!(ct.constraints[0].kind, IndexKind::Primary);
        assert_eq!(ct.constraints[0].columns, vec!["id".to_string()]);
        assert!(!ct.columns[0].nullable);
    }

    #[test]
    fn test_lower_alter_add_and_drop_column() {
        let stmt = lower_one("ALTER TABLE t1 ADD COLUMN c1 INT NOT NULL, DROP COLUMN c2");
        let at = match stmt {
            Statement::AlterTable(at) => at,
            other => panic!("expected AlterTable, got {:?}", other),
        };
        assert_eq!(at.specs.len(), 2);
        match &at.specs[0] {
            AlterSpec::AddColumn(col) => {
                assert_eq!(col.name, "c1");
                assert!(!col.nullable);
            }
            other => panic!("expected AddColumn, got {:?}", other),
        }
        assert_eq!(
            at.specs[1],
            AlterSpec::DropColumn {
                name: "c2".to_string()
            }
        );
    }

    #[test]
    fn test_lower_change_column() {
        let stmt = lower_one("ALTER TABLE t1 CHANGE COLUMN old_c new_c BIGINT NOT NULL");
        let at = match stmt {
            Statement::AlterTable(at) => at,
            other => panic!("expected AlterTable, got {:?}", other),
        };
        match &at.specs[0] {
            AlterSpec::ChangeColumn { old_name, column } => {
                assert_eq!(old_name, "old_c");
                assert_eq!(column.name, "new_c");
            }
            other => panic!("expected ChangeColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_lower_insert_values() {
        let stmt = lower_one("INSERT INTO t1 (id, name) VALUES (1, 'a'), (2, NULL)");
        let ins = match stmt {
            Statement::Insert(ins) => ins,
            other => panic!("expected Insert, got {:?}", other),
        };
        assert_eq!(ins.columns, vec!["id".to_string(), "name".to_string()]);
        assert_eq!(ins.rows.len(), 2);
        assert_eq!(ins.rows[0][0], ValueExpr::Literal("1".to_string()));
        assert_eq!(ins.rows[0][1], ValueExpr::Literal("a".to_string()));
        assert_eq!(ins.rows[1][1], ValueExpr::Null);
    }

    #[test]
    fn test_lower_insert_set_form() {
        let stmt = lower_one("INSERT INTO t1 SET id = 1, v = 'x'");
        let ins = match stmt {
            Statement::Insert(ins) => ins,
            other => panic!("expected Insert, got {:?}", other),
        };
        assert_eq!(ins.columns, vec!["id".to_string(), "v".to_string()]);
        assert_eq!(
            ins.rows,
            vec![vec![
                ValueExpr::Literal("1".to_string()),
                ValueExpr::Literal("x".to_string()),
            ]]
        );
    }

    #[test]
    fn test_lower_update_where_columns() {
        let stmt = lower_one("UPDATE t1 SET v = 'x' WHERE id = 5 AND region IN (1, 2)");
        let up = match stmt {
            Statement::Update(up) => up,
            other => panic!("expected Update, got {:?}", other),
        };
        assert_eq!(up.tables, vec![TableRef::new(None, "t1")]);
        assert_eq!(up.assignments.len(), 1);
        assert_eq!(
            up.where_columns,
            vec!["id".to_string(), "region".to_string()]
        );
        assert!(up.selection.is_some());
    }

    #[test]
    fn test_lower_delete_without_where() {
        let stmt = lower_one("DELETE FROM t1");
        let del = match stmt {
            Statement::Delete(del) => del,
            other => panic!("expected Delete, got {:?}", other),
        };
        assert_eq!(del.tables, vec![TableRef::new(None, "t1")]);
        assert_eq!(del.selection, None);
        assert!(del.where_columns.is_empty());
    }

    #[test]
    fn test_lower_create_database_as_schema() {
        let stmt = lower_one("CREATE DATABASE IF NOT EXISTS shop");
        assert_eq!(
            stmt,
            Statement::CreateSchema(CreateSchema {
                name: "shop".to_string(),
                if_not_exists: true,
            })
        );
    }

    #[test]
    fn test_lower_use_schema() {
        let stmt = lower_one("USE shop");
        assert_eq!(stmt, Statement::UseSchema("shop".to_string()));
    }

    #[test]
    fn test_lower_unmodeled_statement_is_carried() {
        let stmt = lower_one("SHOW TABLES");
        assert!(matches!(stmt, Statement::Unsupported(_)));
    }
}
