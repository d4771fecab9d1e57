//! Quality metric persistence, score derivation, and rule storage.
//!
//! Metrics are append-only rows owned by a run. The aggregate quality score
//! is always derived from the persisted metrics, never stored, so it can be
//! recomputed for any historical run.

use crate::error::{MetaError, MetaResult, MetaResultExt};
use duckdb::Connection;
use silo_core::rules::{QualityRule, RuleCategory, RuleKind, RuleSeverity, Ruleset};

/// One rule evaluation outcome, tied to exactly one run.
#[derive(Debug, Clone)]
pub struct QualityMetricRecord {
    pub run_id: String,
    pub check_name: String,
    pub category: RuleCategory,
    pub table_name: Option<String>,
    pub column_name: Option<String>,
    pub passed: bool,
    pub metric_value: Option<f64>,
    pub threshold_value: Option<f64>,
    pub row_count: Option<i64>,
    pub failure_count: Option<i64>,
    pub details: Option<serde_json::Value>,
}

/// Insert one quality metric row.
pub fn record_quality_metric(conn: &Connection, record: &QualityMetricRecord) -> MetaResult<()> {
    if let (Some(failures), Some(rows)) = (record.failure_count, record.row_count) {
        if failures > rows {
            return Err(MetaError::InvalidRecord(format!(
                "check '{}': failure_count {failures} exceeds row_count {rows}",
                record.check_name
            )));
        }
    }
    conn.execute(
        "INSERT INTO silo_meta.data_quality_metrics
         (run_id, check_name, check_category, table_name, column_name,
          passed, metric_value, threshold_value, row_count, failure_count, details)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        duckdb::params![
            record.run_id,
            record.check_name,
            record.category.as_str(),
            record.table_name,
            record.column_name,
            record.passed,
            record.metric_value,
            record.threshold_value,
            record.row_count,
            record.failure_count,
            record.details.as_ref().map(|d| d.to_string()),
        ],
    )
    .populate_context("insert data_quality_metrics")?;
    Ok(())
}

/// Quality score for a run: `100 x passed / total`, rounded to two decimals.
///
/// Derived lazily from the persisted metrics; a run with no checks scores
/// 0, not NaN.
pub fn quality_score(conn: &Connection, run_id: &str) -> MetaResult<f64> {
    let (total, passed): (i64, i64) = conn
        .query_row(
            "SELECT COUNT(*),
                    CAST(COALESCE(SUM(CASE WHEN passed THEN 1 ELSE 0 END), 0) AS BIGINT)
             FROM silo_meta.data_quality_metrics WHERE run_id = ?",
            duckdb::params![run_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .query_context("select quality score inputs")?;

    if total == 0 {
        return Ok(0.0);
    }
    let score = 100.0 * passed as f64 / total as f64;
    Ok((score * 100.0).round() / 100.0)
}

/// Per-category pass counts for a run.
#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: String,
    pub total_checks: i64,
    pub passed_checks: i64,
}

/// Check counts grouped by category for one run.
pub fn quality_by_category(conn: &Connection, run_id: &str) -> MetaResult<Vec<CategorySummary>> {
    let mut stmt = conn
        .prepare(
            "SELECT check_category, COUNT(*),
                    CAST(SUM(CASE WHEN passed THEN 1 ELSE 0 END) AS BIGINT)
             FROM silo_meta.data_quality_metrics
             WHERE run_id = ?
             GROUP BY check_category
             ORDER BY check_category",
        )
        .query_context("prepare quality_by_category")?;
    let rows = stmt
        .query_map(duckdb::params![run_id], |row| {
            Ok(CategorySummary {
                category: row.get(0)?,
                total_checks: row.get(1)?,
                passed_checks: row.get(2)?,
            })
        })
        .query_context("query quality_by_category")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("collect quality_by_category")?;
    Ok(rows)
}

/// A failed check with its run context, from `v_failed_quality_checks`.
#[derive(Debug, Clone)]
pub struct FailedCheck {
    pub check_name: String,
    pub check_category: String,
    pub table_name: Option<String>,
    pub column_name: Option<String>,
    pub metric_value: Option<f64>,
    pub threshold_value: Option<f64>,
    pub failure_count: Option<i64>,
    pub details: Option<String>,
    pub checked_at: String,
    pub pipeline_name: String,
    pub source_file: Option<String>,
}

/// Most recent failed quality checks.
pub fn failed_checks(conn: &Connection, limit: usize) -> MetaResult<Vec<FailedCheck>> {
    let mut stmt = conn
        .prepare(
            "SELECT check_name, check_category, table_name, column_name,
                    metric_value, threshold_value, failure_count, details,
                    CAST(checked_at AS VARCHAR), pipeline_name, source_file
             FROM silo_meta.v_failed_quality_checks
             LIMIT ?",
        )
        .query_context("prepare failed_checks")?;
    let rows = stmt
        .query_map(duckdb::params![limit as i64], |row| {
            Ok(FailedCheck {
                check_name: row.get(0)?,
                check_category: row.get(1)?,
                table_name: row.get(2)?,
                column_name: row.get(3)?,
                metric_value: row.get(4)?,
                threshold_value: row.get(5)?,
                failure_count: row.get(6)?,
                details: row.get(7)?,
                checked_at: row.get(8)?,
                pipeline_name: row.get(9)?,
                source_file: row.get(10)?,
            })
        })
        .query_context("query failed_checks")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("collect failed_checks")?;
    Ok(rows)
}

/// Upsert a ruleset into `quality_rules`, keyed by `rule_name`.
///
/// Kind parameters serialize into the `rule_config` JSON column. Returns
/// the number of rules written.
pub fn store_rules(conn: &Connection, ruleset: &Ruleset) -> MetaResult<usize> {
    for rule in &ruleset.rules {
        let config = serde_json::to_string(&rule.kind)
            .map_err(|e| MetaError::RuleError(format!("serialize rule '{}': {e}", rule.name)))?;
        conn.execute(
            "INSERT INTO silo_meta.quality_rules
             (rule_name, rule_category, table_name, column_name, rule_type,
              rule_config, is_active, severity)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (rule_name) DO UPDATE SET
                 rule_category = excluded.rule_category,
                 table_name = excluded.table_name,
                 column_name = excluded.column_name,
                 rule_type = excluded.rule_type,
                 rule_config = excluded.rule_config,
                 is_active = excluded.is_active,
                 severity = excluded.severity",
            duckdb::params![
                rule.name,
                rule.category.as_str(),
                rule.table_name,
                rule.column_name,
                rule.kind.type_name(),
                config,
                rule.is_active,
                rule.severity.to_string(),
            ],
        )
        .populate_context("upsert quality_rules")?;
    }
    Ok(ruleset.rules.len())
}

/// Load every stored rule (active and inactive) back into a [`Ruleset`].
///
/// A stored config that no longer parses is an error naming the rule, not
/// a silent skip.
pub fn load_rules(conn: &Connection) -> MetaResult<Ruleset> {
    let mut stmt = conn
        .prepare(
            "SELECT rule_name, rule_category, table_name, column_name,
                    rule_config, is_active, severity
             FROM silo_meta.quality_rules
             ORDER BY rule_name",
        )
        .query_context("prepare load_rules")?;

    let raw: Vec<(String, String, String, Option<String>, String, bool, String)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })
        .query_context("query load_rules")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("collect load_rules")?;

    let mut rules = Vec::with_capacity(raw.len());
    for (name, category, table_name, column_name, config, is_active, severity) in raw {
        let kind: RuleKind = serde_json::from_str(&config)
            .map_err(|e| MetaError::RuleError(format!("rule '{name}' has invalid config: {e}")))?;
        let category = parse_category(&category)
            .ok_or_else(|| MetaError::RuleError(format!("rule '{name}' has invalid category '{category}'")))?;
        let severity = match severity.as_str() {
            "critical" => RuleSeverity::Critical,
            "warning" => RuleSeverity::Warning,
            other => {
                return Err(MetaError::RuleError(format!(
                    "rule '{name}' has invalid severity '{other}'"
                )))
            }
        };
        rules.push(QualityRule {
            name,
            category,
            table_name,
            column_name,
            kind,
            severity,
            is_active,
        });
    }
    Ok(Ruleset { rules })
}

fn parse_category(s: &str) -> Option<RuleCategory> {
    match s {
        "completeness" => Some(RuleCategory::Completeness),
        "validity" => Some(RuleCategory::Validity),
        "consistency" => Some(RuleCategory::Consistency),
        "uniqueness" => Some(RuleCategory::Uniqueness),
        "timeliness" => Some(RuleCategory::Timeliness),
        _ => None,
    }
}

#[cfg(test)]
#[path = "quality_test.rs"]
mod tests;
