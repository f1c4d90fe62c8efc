//! Statement model
//!
//! The statement AST abstraction consumed from the external parser: a closed
//! set of statement variants, each exposing its structural fields and a
//! canonical re-render to text. The advisor, the schema catalog and the
//! rollback synthesizer all match exhaustively over [`Statement`], so a new
//! variant cannot silently compile against a forgotten consumer.

mod lower;
mod render;

pub(crate) use lower::lower_statement;
pub(crate) use render::{quote_ident, quote_value};

use serde::{Deserialize, Serialize};

/// Possibly schema-qualified table reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(|s| s.to_string()),
            name: name.to_string(),
        }
    }

    /// Resolve against the session's current schema. Returns `None` when the
    /// reference is unqualified and no current schema is set.
    pub fn resolve(&self, current_schema: Option<&str>) -> Option<(String, String)> {
        match (&self.schema, current_schema) {
            (Some(s), _) => Some((s.clone(), self.name.clone())),
            (None, Some(s)) => Some((s.to_string(), self.name.clone())),
            (None, None) => None,
        }
    }
}

/// Column definition shared by CREATE TABLE, ALTER TABLE and the catalog.
///
/// Immutable once constructed; a simulated ALTER replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    /// Declared type as rendered text, length/precision included.
    pub sql_type: String,
    pub nullable: bool,
    /// Default-value expression text; `None` means no default clause.
    pub default: Option<String>,
    pub auto_increment: bool,
    /// Derived: the column participates in a primary or unique key.
    #[serde(default)]
    pub in_unique_key: bool,
}

impl Column {
    /// BLOB/TEXT-class columns cannot be sensibly indexed without a prefix.
    pub fn is_blob_like(&self) -> bool {
        let ty = self.sql_type.to_lowercase();
        ty.contains("blob") || ty.contains("text")
    }

    /// True for the canonical surrogate-key shape: unsigned 64-bit integer
    /// with auto-increment.
    pub fn is_auto_unsigned_bigint(&self) -> bool {
        let ty = self.sql_type.to_lowercase();
        self.auto_increment && ty.contains("bigint") && ty.contains("unsigned")
    }
}

/// Index/constraint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
    ForeignKey,
}

/// Foreign-key payload of an [`IndexConstraint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyRef {
    pub table: String,
    pub columns: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

/// Index or key constraint on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexConstraint {
    /// Empty for unnamed indexes.
    pub name: String,
    pub kind: IndexKind,
    pub columns: Vec<String>,
    /// Present only for `IndexKind::ForeignKey`.
    pub reference: Option<ForeignKeyRef>,
    /// Storage/using options for ordinary indexes (e.g. `USING BTREE`).
    pub options: Vec<String>,
}

impl IndexConstraint {
    pub fn covers(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// A literal-or-expression value position in DML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueExpr {
    /// A plain literal, stored unquoted.
    Literal(String),
    Null,
    /// Anything else (function call, subquery, arithmetic), rendered as-is.
    Expr(String),
}

/// One `SET col = value` assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub column: String,
    pub value: ValueExpr,
}

/// One clause of an ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterSpec {
    AddColumn(Column),
    DropColumn { name: String },
    /// MySQL CHANGE/MODIFY: replaces the column found under `old_name` with
    /// the given definition (rename when the names differ).
    ChangeColumn { old_name: String, column: Column },
    RenameColumn { old_name: String, new_name: String },
    /// `ALTER COLUMN c SET DEFAULT expr` / `DROP DEFAULT` (`None`).
    SetDefault { column: String, default: Option<String> },
    AddConstraint(IndexConstraint),
    DropIndex { name: String },
    DropPrimaryKey,
    DropForeignKey { name: String },
    RenameTable { to: TableRef },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSchema {
    pub name: String,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropSchema {
    pub name: String,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub table: TableRef,
    pub if_not_exists: bool,
    pub columns: Vec<Column>,
    pub constraints: Vec<IndexConstraint>,
    pub engine: Option<String>,
    pub charset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTable {
    pub table: TableRef,
    pub specs: Vec<AlterSpec>,
}

impl AlterTable {
    /// Target of the rename clause, if this statement renames the table.
    pub fn rename_target(&self) -> Option<&TableRef> {
        self.specs.iter().find_map(|s| match s {
            AlterSpec::RenameTable { to } => Some(to),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub tables: Vec<TableRef>,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndex {
    /// Empty when the index is unnamed.
    pub name: String,
    pub table: TableRef,
    pub unique: bool,
    pub columns: Vec<String>,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIndex {
    pub name: String,
    pub table: Option<TableRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    pub table: TableRef,
    /// Explicit column list; empty means "all columns in table order".
    pub columns: Vec<String>,
    /// Literal rows; the `SET col = val` form lowers to a single row.
    pub rows: Vec<Vec<ValueExpr>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub tables: Vec<TableRef>,
    pub assignments: Vec<Assignment>,
    /// Rendered WHERE clause, if any.
    pub selection: Option<String>,
    /// Column identifiers referenced by the WHERE clause.
    pub where_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub tables: Vec<TableRef>,
    pub selection: Option<String>,
    pub where_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub tables: Vec<TableRef>,
    /// Full statement text; SELECT structure beyond table references is
    /// opaque to the review core.
    pub text: String,
}

/// Closed set of statement variants the review core models.
///
/// `Unsupported` carries statements the external parser accepted but the
/// core does not model; they produce no findings and no rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateSchema(CreateSchema),
    DropSchema(DropSchema),
    CreateTable(CreateTable),
    AlterTable(AlterTable),
    DropTable(DropTable),
    CreateIndex(CreateIndex),
    DropIndex(DropIndex),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Select(Select),
    UseSchema(String),
    Unsupported(String),
}
