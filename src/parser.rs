//! SQL text parsing front end.
//!
//! Wraps the external parser and lowers its AST into the statement model.
//! Parse failures are fatal for the whole batch; unmodeled statements that
//! still parse are carried through as unsupported.

use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect};
use sqlparser::parser::Parser;
use tracing::debug;

use crate::error::{ReviewError, ReviewResult};
use crate::statement::{lower_statement, Statement};

/// SQL dialect accepted by the review core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    MySql,
    Generic,
}

impl SqlDialect {
    fn dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::MySql => Box::new(MySqlDialect {}),
            SqlDialect::Generic => Box::new(GenericDialect {}),
        }
    }
}

/// Parse a batch of semicolon-separated statements.
pub fn parse_all(dialect: SqlDialect, sql: &str) -> ReviewResult<Vec<Statement>> {
    let parsed = Parser::parse_sql(dialect.dialect().as_ref(), sql)?;
    debug!(count = parsed.len(), "parsed statement batch");
    Ok(parsed.into_iter().map(lower_statement).collect())
}

/// Parse exactly one statement.
pub fn parse_one(dialect: SqlDialect, sql: &str) -> ReviewResult<Statement> {
    let mut statements = parse_all(dialect, sql)?;
    if statements.len() != 1 {
        return Err(ReviewError::Syntax(format!(
            "expected exactly one statement, found {}",
            statements.len()
        )));
    }
    Ok(statements.remove(0))
}
