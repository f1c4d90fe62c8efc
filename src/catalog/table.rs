//! Virtual table definition.
//!
//! A copy-on-write snapshot of one table's structure. Simulated DDL never
//! mutates a cached definition in place; the catalog clones, edits the clone
//! and swaps it in, so values handed to callers stay stable.

use serde::{Deserialize, Serialize};

use crate::error::{ReviewError, ReviewResult};
use crate::parser::{parse_one, SqlDialect};
use crate::statement::{
    AlterSpec, Column, CreateTable, IndexConstraint, IndexKind, Statement, TableRef,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub constraints: Vec<IndexConstraint>,
    pub engine: Option<String>,
    pub charset: Option<String>,
}

impl TableDefinition {
    /// Build a definition from a lowered CREATE TABLE statement resolved to
    /// `schema`.
    pub fn from_create(schema: &str, stmt: &CreateTable) -> Self {
        let mut def = Self {
            schema: schema.to_string(),
            name: stmt.table.name.clone(),
            columns: stmt.columns.clone(),
            constraints: stmt.constraints.clone(),
            engine: stmt.engine.clone(),
            charset: stmt.charset.clone(),
        };
        def.refresh_key_flags();
        def
    }

    /// Parse `SHOW CREATE TABLE` text fetched from the source.
    pub fn from_create_sql(schema: &str, dialect: SqlDialect, sql: &str) -> ReviewResult<Self> {
        match parse_one(dialect, sql)? {
            Statement::CreateTable(ct) => Ok(Self::from_create(schema, &ct)),
            other => Err(ReviewError::Syntax(format!(
                "expected CREATE TABLE, found {}",
                other
            ))),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The primary-key constraint, if the table has one.
    pub fn primary_key(&self) -> Option<&IndexConstraint> {
        self.constraints
            .iter()
            .find(|c| c.kind == IndexKind::Primary)
    }

    /// Indexes of every kind except foreign keys.
    pub fn indexes(&self) -> impl Iterator<Item = &IndexConstraint> {
        self.constraints
            .iter()
            .filter(|c| c.kind != IndexKind::ForeignKey)
    }

    /// Recompute each column's unique-key membership from the constraint
    /// list. Called after any structural edit.
    pub fn refresh_key_flags(&mut self) {
        for column in self.columns.iter_mut() {
            column.in_unique_key = false;
        }
        for i in 0..self.constraints.len() {
            if matches!(
                self.constraints[i].kind,
                IndexKind::Primary | IndexKind::Unique
            ) {
                let covered: Vec<String> = self.constraints[i].columns.clone();
                for column in self.columns.iter_mut() {
                    if covered.iter().any(|c| c == &column.name) {
                        column.in_unique_key = true;
                    }
                }
            }
        }
    }

    /// Apply one ALTER clause to this definition. Clauses referring to
    /// columns or keys that do not exist are ignored; the simulation tracks
    /// intent, it does not re-validate the server's rules.
    pub fn apply_spec(&mut self, spec: &AlterSpec) {
        match spec {
            AlterSpec::AddColumn(column) => {
                if self.column(&column.name).is_none() {
                    self.columns.push(column.clone());
                }
            }
            AlterSpec::DropColumn { name } => {
                self.columns.retain(|c| &c.name != name);
                for constraint in self.constraints.iter_mut() {
                    constraint.columns.retain(|c| c != name);
                }
                self.constraints.retain(|c| !c.columns.is_empty());
            }
            AlterSpec::ChangeColumn { old_name, column } => {
                if let Some(slot) = self.columns.iter_mut().find(|c| &c.name == old_name) {
                    *slot = column.clone();
                }
                if old_name != &column.name {
                    for constraint in self.constraints.iter_mut() {
                        for col in constraint.columns.iter_mut() {
                            if col == old_name {
                                *col = column.name.clone();
                            }
                        }
                    }
                }
            }
            AlterSpec::RenameColumn { old_name, new_name } => {
                if let Some(slot) = self.columns.iter_mut().find(|c| &c.name == old_name) {
                    slot.name = new_name.clone();
                }
                for constraint in self.constraints.iter_mut() {
                    for col in constraint.columns.iter_mut() {
                        if col == old_name {
                            *col = new_name.clone();
                        }
                    }
                }
            }
            AlterSpec::SetDefault { column, default } => {
                if let Some(slot) = self.columns.iter_mut().find(|c| &c.name == column) {
                    slot.default = default.clone();
                }
            }
            AlterSpec::AddConstraint(constraint) => {
                self.constraints.push(constraint.clone());
            }
            AlterSpec::DropIndex { name } => {
                self.constraints
                    .retain(|c| c.name != *name || c.kind == IndexKind::ForeignKey);
            }
            AlterSpec::DropPrimaryKey => {
                self.constraints.retain(|c| c.kind != IndexKind::Primary);
            }
            AlterSpec::DropForeignKey { name } => {
                self.constraints
                    .retain(|c| c.kind != IndexKind::ForeignKey || c.name != *name);
            }
            AlterSpec::RenameTable { to } => {
                self.name = to.name.clone();
                if let Some(schema) = &to.schema {
                    self.schema = schema.clone();
                }
            }
        }
        self.refresh_key_flags();
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(Some(&self.schema), &self.name)
    }

    /// Render this definition back to a CREATE TABLE statement.
    pub fn render_create(&self) -> String {
        Statement::CreateTable(CreateTable {
            table: self.table_ref(),
            if_not_exists: false,
            columns: self.columns.clone(),
            constraints: self.constraints.clone(),
            engine: self.engine.clone(),
            charset: self.charset.clone(),
        })
        .to_string()
    }
}
