//! Review session façade.
//!
//! Owns one catalog and drives the advisor and the rollback synthesizer
//! over a batch in lockstep: each statement is checked against the catalog
//! state left by its predecessors, then its inverse is computed and the
//! statement's effect is folded in. The assembled report carries one audit
//! entry per statement plus the whole-batch rollback script.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::advisor::{Advisor, BatchState, FindingSet, Rule, RuleRegistry, Severity};
use crate::catalog::{CatalogSource, SchemaCatalog};
use crate::config::ReviewConfig;
use crate::error::ReviewResult;
use crate::parser::{parse_all, SqlDialect};
use crate::rollback::RollbackSynthesizer;
use crate::statement::Statement;

/// Audit result for one statement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementReview {
    /// Canonical re-render of the statement.
    pub sql: String,
    pub severity: Severity,
    /// Newline-joined `[severity]message` lines; empty when clean.
    pub message: String,
    pub findings: FindingSet,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    pub id: Uuid,
    /// Digest of the reviewed statement texts.
    pub checksum: String,
    pub reviewed_at: DateTime<Utc>,
    pub results: Vec<StatementReview>,
    /// Rollback script in replay order: entry i undoes statement N-1-i.
    pub rollback: Vec<String>,
}

fn batch_checksum(statements: &[Statement]) -> String {
    let mut hasher = Sha256::new();
    for stmt in statements {
        hasher.update(stmt.to_string().as_bytes());
        hasher.update(b";");
    }
    format!("{:x}", hasher.finalize())
}

pub struct ReviewSession {
    catalog: SchemaCatalog,
    config: ReviewConfig,
    registry: RuleRegistry,
}

impl ReviewSession {
    pub fn new(source: Box<dyn CatalogSource>, dialect: SqlDialect, config: ReviewConfig) -> Self {
        Self {
            catalog: SchemaCatalog::new(source, dialect),
            config,
            registry: RuleRegistry::default(),
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn catalog_mut(&mut self) -> &mut SchemaCatalog {
        &mut self.catalog
    }

    pub fn set_current_schema(&mut self, schema: &str) {
        self.catalog.set_current_schema(schema);
    }

    /// Review a pre-parsed batch under the caller's active rules.
    pub fn review(
        &mut self,
        statements: &[Statement],
        active: &[Rule],
    ) -> ReviewResult<ReviewReport> {
        let advisor = Advisor::new(&self.registry, &self.config);
        let synthesizer = RollbackSynthesizer::new(&self.config);
        let mut batch_state = BatchState::default();

        let mut results = Vec::with_capacity(statements.len());
        let mut rollback = Vec::with_capacity(statements.len());
        for stmt in statements {
            // Check against the pre-statement catalog, then let the
            // synthesizer advance it exactly once.
            let findings =
                advisor.check(&mut self.catalog, &mut batch_state, stmt, active)?;
            rollback.push(synthesizer.process(&mut self.catalog, stmt)?);
            results.push(StatementReview {
                sql: stmt.to_string(),
                severity: findings.severity(),
                message: findings.message(),
                findings,
            });
        }
        rollback.reverse();

        let report = ReviewReport {
            id: Uuid::new_v4(),
            checksum: batch_checksum(statements),
            reviewed_at: Utc::now(),
            results,
            rollback,
        };
        info!(
            id = %report.id,
            statements = statements.len(),
            worst = %report
                .results
                .iter()
                .map(|r| r.severity)
                .max()
                .unwrap_or(Severity::Normal),
            "review batch complete"
        );
        Ok(report)
    }

    /// Parse and review raw SQL text.
    pub fn review_sql(&mut self, sql: &str, active: &[Rule]) -> ReviewResult<ReviewReport> {
        let statements = parse_all(self.catalog.dialect(), sql)?;
        self.review(&statements, active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::rule_names;
    use crate::catalog::memory::MemorySource;
    use pretty_assertions::assert_eq;

    fn session() -> ReviewSession {
        let source = MemorySource::new(&["shop"]).with_table(
            "shop",
            "orders",
            "CREATE TABLE orders (id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT, v1 VARCHAR(255), PRIMARY KEY (id))",
        );
        let mut session =
            ReviewSession::new(Box::new(source), SqlDialect::MySql, ReviewConfig::default());
        session.set_current_schema("shop");
        session
    }

    #[test]
    fn test_review_batch_end_to_end() {
        let mut session = session();
        let active = session.registry().default_rules();
        let report = session
            .review_sql(
                "CREATE TABLE t_new (id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT, PRIMARY KEY (id));
                 ALTER TABLE t_new ADD COLUMN note VARCHAR(32);
                 INSERT INTO t_new (id) VALUES (42);",
                &active,
            )
            .unwrap();

        assert_eq!(report.results.len(), 3);
        // The ALTER sees the table created one statement earlier.
        assert!(!report.results[1]
            .message
            .contains("does not exist"));
        assert_eq!(
            report.rollback,
            vec![
                "DELETE FROM `shop`.`t_new` WHERE `id` = '42';".to_string(),
                "ALTER TABLE `shop`.`t_new` DROP COLUMN `note`;".to_string(),
                "DROP TABLE IF EXISTS `shop`.`t_new`;".to_string(),
            ]
        );
        assert!(!report.checksum.is_empty());
    }

    #[test]
    fn test_review_reports_worst_severity() {
        let mut session = session();
        let active = vec![
            session
                .registry()
                .rule(rule_names::DDL_DISABLE_DROP)
                .unwrap()
                .clone(),
            session
                .registry()
                .rule(rule_names::DDL_MERGE_ALTER_TABLE)
                .unwrap()
                .clone(),
        ];
        let report = session
            .review_sql("DROP TABLE orders;", &active)
            .unwrap();
        assert_eq!(report.results[0].severity, Severity::Error);
        assert!(report.results[0].message.starts_with("[error]"));
    }

    #[test]
    fn test_syntax_error_aborts_batch() {
        let mut session = session();
        let err = session.review_sql("SELEC 1", &[]).unwrap_err();
        assert!(matches!(err, crate::error::ReviewError::Syntax(_)));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let mut session = session();
        let active = vec![session
            .registry()
            .rule(rule_names::DDL_DISABLE_DROP)
            .unwrap()
            .clone()];
        let report = session.review_sql("DROP TABLE orders;", &active).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("reviewedAt").is_some());
        assert_eq!(json["results"][0]["severity"], "error");
        assert!(json["rollback"][0]
            .as_str()
            .unwrap()
            .starts_with("CREATE TABLE"));
    }

    #[test]
    fn test_identical_batches_share_checksum() {
        let sql = "INSERT INTO orders (id) VALUES (1);";
        let mut first = session();
        let mut second = session();
        let a = first.review_sql(sql, &[]).unwrap();
        let b = second.review_sql(sql, &[]).unwrap();
        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.id, b.id);
    }
}
