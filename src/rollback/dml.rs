//! DML inversion via literal values and pre-image capture.
//!
//! INSERT is inverted from its own literal values; UPDATE and DELETE capture
//! the affected rows from the backing source first, using the forward
//! statement's own WHERE clause. Statements without a usable primary key or
//! touching several tables contribute nothing, by design.

use tracing::warn;

use crate::catalog::{Row, SchemaCatalog, TableDefinition};
use crate::config::ReviewConfig;
use crate::error::ReviewResult;
use crate::statement::{quote_ident, quote_value, Delete, Insert, TableRef, Update, ValueExpr};

fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn row_value(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(Some(value)) => quote_value(&ValueExpr::Literal(value.clone())),
        _ => "NULL".to_string(),
    }
}

/// Resolve a single-table DML target to a definition plus its primary-key
/// columns. Any gap (unresolved name, missing table, no key) yields `None`.
fn keyed_definition(
    catalog: &mut SchemaCatalog,
    table: &TableRef,
) -> ReviewResult<Option<(TableDefinition, Vec<String>)>> {
    let Some((schema, name)) = catalog.resolve(table) else {
        return Ok(None);
    };
    let Some(def) = catalog.table_definition(&schema, &name)? else {
        return Ok(None);
    };
    let Some(pk_columns) = def.primary_key().map(|pk| pk.columns.clone()) else {
        return Ok(None);
    };
    Ok(Some((def, pk_columns)))
}

/// Capture the pre-image rows a forward WHERE clause covers.
fn capture_preimage(
    catalog: &mut SchemaCatalog,
    config: &ReviewConfig,
    def: &TableDefinition,
    selection: &Option<String>,
) -> ReviewResult<Vec<Row>> {
    let mut sql = format!("SELECT * FROM {}", qualified(&def.schema, &def.name));
    if let Some(clause) = selection {
        sql.push_str(&format!(" WHERE {}", clause));
    }
    let rows = catalog.query_rows(&sql)?;
    if config.exceeds_preimage_budget(rows.len() as u64) {
        warn!(
            table = %def.name,
            rows = rows.len(),
            limit = config.max_preimage_rows,
            "pre-image exceeds the rollback row budget"
        );
    }
    Ok(rows)
}

/// Inverse of an INSERT: one DELETE per row, keyed by the literal
/// primary-key values. Rows missing a primary-key literal (auto-increment,
/// expressions) make the whole statement uninvertible.
pub(super) fn invert_insert(
    catalog: &mut SchemaCatalog,
    ins: &Insert,
) -> ReviewResult<String> {
    let Some((def, pk_columns)) = keyed_definition(catalog, &ins.table)? else {
        return Ok(String::new());
    };
    if ins.rows.is_empty() {
        return Ok(String::new());
    }
    let columns: Vec<String> = if ins.columns.is_empty() {
        def.columns.iter().map(|c| c.name.clone()).collect()
    } else {
        ins.columns.clone()
    };

    let mut deletes = Vec::with_capacity(ins.rows.len());
    for row in &ins.rows {
        let mut conditions = Vec::with_capacity(pk_columns.len());
        for pk in &pk_columns {
            let value = columns
                .iter()
                .position(|c| c == pk)
                .and_then(|i| row.get(i));
            match value {
                Some(literal @ ValueExpr::Literal(_)) => {
                    conditions.push(format!("{} = {}", quote_ident(pk), quote_value(literal)));
                }
                _ => return Ok(String::new()),
            }
        }
        deletes.push(format!(
            "DELETE FROM {} WHERE {};",
            qualified(&def.schema, &def.name),
            conditions.join(" AND ")
        ));
    }
    Ok(deletes.join("\n"))
}

/// Inverse of a DELETE: a single multi-row INSERT reconstructing the
/// captured pre-image in table column order.
pub(super) fn invert_delete(
    catalog: &mut SchemaCatalog,
    config: &ReviewConfig,
    del: &Delete,
) -> ReviewResult<String> {
    if del.tables.len() != 1 {
        return Ok(String::new());
    }
    let Some((def, _)) = keyed_definition(catalog, &del.tables[0])? else {
        return Ok(String::new());
    };
    let rows = capture_preimage(catalog, config, &def, &del.selection)?;
    if rows.is_empty() {
        return Ok(String::new());
    }

    let column_names: Vec<&str> = def.columns.iter().map(|c| c.name.as_str()).collect();
    let values: Vec<String> = rows
        .iter()
        .map(|row| {
            let fields: Vec<String> = column_names.iter().map(|c| row_value(row, c)).collect();
            format!("({})", fields.join(", "))
        })
        .collect();
    Ok(format!(
        "INSERT INTO {} ({}) VALUES {};",
        qualified(&def.schema, &def.name),
        column_names
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", "),
        values.join(", ")
    ))
}

/// Inverse of an UPDATE: per captured row, restore every column the forward
/// SET list touched, keyed by the primary key. A primary-key column the
/// forward statement itself changed is matched by its new value, since that
/// is what identifies the row after the update ran.
pub(super) fn invert_update(
    catalog: &mut SchemaCatalog,
    config: &ReviewConfig,
    up: &Update,
) -> ReviewResult<String> {
    if up.tables.len() != 1 {
        return Ok(String::new());
    }
    let Some((def, pk_columns)) = keyed_definition(catalog, &up.tables[0])? else {
        return Ok(String::new());
    };
    if up.assignments.is_empty() {
        return Ok(String::new());
    }

    // Pre-compute the post-update key value for any primary-key column the
    // SET list touches; a non-literal value there defeats row addressing.
    let mut pk_overrides = Vec::new();
    for pk in &pk_columns {
        if let Some(assignment) = up.assignments.iter().find(|a| &a.column == pk) {
            match &assignment.value {
                ValueExpr::Literal(_) | ValueExpr::Null => {
                    pk_overrides.push((pk.clone(), quote_value(&assignment.value)))
                }
                ValueExpr::Expr(_) => return Ok(String::new()),
            }
        }
    }

    let rows = capture_preimage(catalog, config, &def, &up.selection)?;
    if rows.is_empty() {
        return Ok(String::new());
    }

    let mut updates = Vec::with_capacity(rows.len());
    for row in &rows {
        let sets: Vec<String> = up
            .assignments
            .iter()
            .map(|a| format!("{} = {}", quote_ident(&a.column), row_value(row, &a.column)))
            .collect();
        let conditions: Vec<String> = pk_columns
            .iter()
            .map(|pk| {
                let value = pk_overrides
                    .iter()
                    .find(|(name, _)| name == pk)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| row_value(row, pk));
                format!("{} = {}", quote_ident(pk), value)
            })
            .collect();
        updates.push(format!(
            "UPDATE {} SET {} WHERE {};",
            qualified(&def.schema, &def.name),
            sets.join(", "),
            conditions.join(" AND ")
        ));
    }
    Ok(updates.join("\n"))
}
