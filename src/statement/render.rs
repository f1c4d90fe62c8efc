//! Canonical MySQL re-rendering of the statement model.

use super::*;
use std::fmt;

/// Backtick-quote an identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Single-quote a literal value for synthesized SQL.
pub(crate) fn quote_value(value: &ValueExpr) -> String {
    match value {
        ValueExpr::Literal(s) => format!("'{}'", s.replace('\'', "''")),
        ValueExpr::Null => "NULL".to_string(),
        ValueExpr::Expr(s) => s.clone(),
    }
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(s) => write!(f, "{}.{}", quote_ident(s), quote_ident(&self.name)),
            None => write!(f, "{}", quote_ident(&self.name)),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote_ident(&self.name), self.sql_type)?;
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", default)?;
        }
        if self.auto_increment {
            write!(f, " AUTO_INCREMENT")?;
        }
        Ok(())
    }
}

impl fmt::Display for IndexConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IndexKind::Primary => {
                write!(f, "PRIMARY KEY ({})", quoted_list(&self.columns))?;
            }
            IndexKind::Unique => {
                write!(f, "UNIQUE KEY")?;
                if !self.name.is_empty() {
                    write!(f, " {}", quote_ident(&self.name))?;
                }
                write!(f, " ({})", quoted_list(&self.columns))?;
            }
            IndexKind::Index => {
                write!(f, "KEY")?;
                if !self.name.is_empty() {
                    write!(f, " {}", quote_ident(&self.name))?;
                }
                write!(f, " ({})", quoted_list(&self.columns))?;
            }
            IndexKind::ForeignKey => {
                if !self.name.is_empty() {
                    write!(f, "CONSTRAINT {} ", quote_ident(&self.name))?;
                }
                write!(f, "FOREIGN KEY ({})", quoted_list(&self.columns))?;
                if let Some(fk) = &self.reference {
                    write!(
                        f,
                        " REFERENCES {} ({})",
                        quote_ident(&fk.table),
                        quoted_list(&fk.columns)
                    )?;
                    if let Some(action) = &fk.on_delete {
                        write!(f, " ON DELETE {}", action)?;
                    }
                    if let Some(action) = &fk.on_update {
                        write!(f, " ON UPDATE {}", action)?;
                    }
                }
            }
        }
        for opt in &self.options {
            write!(f, " {}", opt)?;
        }
        Ok(())
    }
}

impl fmt::Display for AlterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlterSpec::AddColumn(col) => write!(f, "ADD COLUMN {}", col),
            AlterSpec::DropColumn { name } => write!(f, "DROP COLUMN {}", quote_ident(name)),
            AlterSpec::ChangeColumn { old_name, column } => {
                if old_name == &column.name {
                    write!(f, "MODIFY COLUMN {}", column)
                } else {
                    write!(f, "CHANGE COLUMN {} {}", quote_ident(old_name), column)
                }
            }
            AlterSpec::RenameColumn { old_name, new_name } => write!(
                f,
                "RENAME COLUMN {} TO {}",
                quote_ident(old_name),
                quote_ident(new_name)
            ),
            AlterSpec::SetDefault { column, default } => match default {
                Some(expr) => write!(
                    f,
                    "ALTER COLUMN {} SET DEFAULT {}",
                    quote_ident(column),
                    expr
                ),
                None => write!(f, "ALTER COLUMN {} DROP DEFAULT", quote_ident(column)),
            },
            AlterSpec::AddConstraint(c) => write!(f, "ADD {}", c),
            AlterSpec::DropIndex { name } => write!(f, "DROP INDEX {}", quote_ident(name)),
            AlterSpec::DropPrimaryKey => write!(f, "DROP PRIMARY KEY"),
            AlterSpec::DropForeignKey { name } => {
                write!(f, "DROP FOREIGN KEY {}", quote_ident(name))
            }
            AlterSpec::RenameTable { to } => write!(f, "RENAME TO {}", to),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateSchema(s) => {
                write!(
                    f,
                    "CREATE SCHEMA {}{}",
                    if s.if_not_exists { "IF NOT EXISTS " } else { "" },
                    quote_ident(&s.name)
                )
            }
            Statement::DropSchema(s) => {
                write!(
                    f,
                    "DROP SCHEMA {}{}",
                    if s.if_exists { "IF EXISTS " } else { "" },
                    quote_ident(&s.name)
                )
            }
            Statement::CreateTable(s) => {
                write!(
                    f,
                    "CREATE TABLE {}{} (",
                    if s.if_not_exists { "IF NOT EXISTS " } else { "" },
                    s.table
                )?;
                let mut items: Vec<String> = s.columns.iter().map(|c| c.to_string()).collect();
                items.extend(s.constraints.iter().map(|c| c.to_string()));
                write!(f, "{})", items.join(", "))?;
                if let Some(engine) = &s.engine {
                    write!(f, " ENGINE={}", engine)?;
                }
                if let Some(charset) = &s.charset {
                    write!(f, " DEFAULT CHARSET={}", charset)?;
                }
                Ok(())
            }
            Statement::AlterTable(s) => {
                let specs: Vec<String> = s.specs.iter().map(|sp| sp.to_string()).collect();
                write!(f, "ALTER TABLE {} {}", s.table, specs.join(", "))
            }
            Statement::DropTable(s) => {
                let tables: Vec<String> = s.tables.iter().map(|t| t.to_string()).collect();
                write!(
                    f,
                    "DROP TABLE {}{}",
                    if s.if_exists { "IF EXISTS " } else { "" },
                    tables.join(", ")
                )
            }
            Statement::CreateIndex(s) => {
                write!(f, "CREATE {}INDEX", if s.unique { "UNIQUE " } else { "" })?;
                if !s.name.is_empty() {
                    write!(f, " {}", quote_ident(&s.name))?;
                }
                write!(f, " ON {} ({})", s.table, quoted_list(&s.columns))?;
                for opt in &s.options {
                    write!(f, " {}", opt)?;
                }
                Ok(())
            }
            Statement::DropIndex(s) => {
                write!(f, "DROP INDEX {}", quote_ident(&s.name))?;
                if let Some(table) = &s.table {
                    write!(f, " ON {}", table)?;
                }
                Ok(())
            }
            Statement::Insert(s) => {
                write!(f, "INSERT INTO {}", s.table)?;
                if !s.columns.is_empty() {
                    write!(f, " ({})", quoted_list(&s.columns))?;
                }
                let rows: Vec<String> = s
                    .rows
                    .iter()
                    .map(|row| {
                        let vals: Vec<String> = row.iter().map(quote_value).collect();
                        format!("({})", vals.join(", "))
                    })
                    .collect();
                write!(f, " VALUES {}", rows.join(", "))
            }
            Statement::Update(s) => {
                let tables: Vec<String> = s.tables.iter().map(|t| t.to_string()).collect();
                let sets: Vec<String> = s
                    .assignments
                    .iter()
                    .map(|a| format!("{} = {}", quote_ident(&a.column), quote_value(&a.value)))
                    .collect();
                write!(f, "UPDATE {} SET {}", tables.join(", "), sets.join(", "))?;
                if let Some(cond) = &s.selection {
                    write!(f, " WHERE {}", cond)?;
                }
                Ok(())
            }
            Statement::Delete(s) => {
                let tables: Vec<String> = s.tables.iter().map(|t| t.to_string()).collect();
                write!(f, "DELETE FROM {}", tables.join(", "))?;
                if let Some(cond) = &s.selection {
                    write!(f, " WHERE {}", cond)?;
                }
                Ok(())
            }
            Statement::Select(s) => write!(f, "{}", s.text),
            Statement::UseSchema(name) => write!(f, "USE {}", quote_ident(name)),
            Statement::Unsupported(text) => write!(f, "{}", text),
        }
    }
}
