//! Rule evaluation over row batches.
//!
//! Each active rule produces exactly one persisted quality metric tied to
//! the supplied run. Critical rules gate the overall result; warning rules
//! are recorded and scored but never flip it.

use crate::error::{QualityError, QualityResult};
use crate::reference::ReferenceResolver;
use serde_json::json;
use silo_core::row::Row;
use silo_core::rules::{QualityRule, RuleKind, RuleSeverity, Ruleset};
use silo_meta::quality::{quality_score, record_quality_metric, QualityMetricRecord};
use silo_meta::MetaDb;
use std::collections::HashMap;

/// Aggregate outcome of one validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSummary {
    pub checks_run: usize,
    pub checks_passed: usize,
    pub checks_failed: usize,
    /// Failures among critical-severity rules only.
    pub critical_failures: usize,
    /// True iff every critical rule passed.
    pub overall_passed: bool,
    /// Quality score for the run so far, derived from persisted metrics.
    pub score: f64,
}

/// One rule's evaluation before persistence.
struct Evaluation {
    passed: bool,
    metric_value: Option<f64>,
    threshold_value: Option<f64>,
    row_count: i64,
    failure_count: i64,
    details: serde_json::Value,
}

/// Batch validator bound to a metadata store and a reference resolver.
pub struct Validator<'a> {
    meta: &'a MetaDb,
    refs: &'a dyn ReferenceResolver,
}

impl<'a> Validator<'a> {
    pub fn new(meta: &'a MetaDb, refs: &'a dyn ReferenceResolver) -> Self {
        Self { meta, refs }
    }

    /// Evaluate every active rule in `ruleset` against `rows`.
    ///
    /// Persists one metric per rule under `run_id` and returns the batch
    /// summary. The caller decides how a critical failure propagates into
    /// the run's terminal status.
    pub fn validate(
        &self,
        rows: &[Row],
        ruleset: &Ruleset,
        run_id: &str,
    ) -> QualityResult<ValidationSummary> {
        let mut checks_run = 0;
        let mut checks_passed = 0;
        let mut critical_failures = 0;

        for rule in ruleset.active_rules() {
            let evaluation = self.evaluate_rule(rows, rule)?;
            checks_run += 1;
            if evaluation.passed {
                checks_passed += 1;
            } else if rule.severity == RuleSeverity::Critical {
                critical_failures += 1;
            }

            log::debug!(
                "[{}] {} - {}",
                if evaluation.passed { "PASS" } else { "FAIL" },
                rule.name,
                evaluation
                    .metric_value
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "n/a".to_string()),
            );

            record_quality_metric(
                self.meta.conn(),
                &QualityMetricRecord {
                    run_id: run_id.to_string(),
                    check_name: rule.name.clone(),
                    category: rule.category,
                    table_name: Some(rule.table_name.clone()),
                    column_name: rule.column_name.clone(),
                    passed: evaluation.passed,
                    metric_value: evaluation.metric_value,
                    threshold_value: evaluation.threshold_value,
                    row_count: Some(evaluation.row_count),
                    failure_count: Some(evaluation.failure_count),
                    details: Some(evaluation.details),
                },
            )?;
        }

        let score = quality_score(self.meta.conn(), run_id)?;
        Ok(ValidationSummary {
            checks_run,
            checks_passed,
            checks_failed: checks_run - checks_passed,
            critical_failures,
            overall_passed: critical_failures == 0,
            score,
        })
    }

    fn evaluate_rule(&self, rows: &[Row], rule: &QualityRule) -> QualityResult<Evaluation> {
        match &rule.kind {
            RuleKind::Threshold { min_ratio } => {
                Ok(evaluate_threshold(rows, rule, *min_ratio))
            }
            RuleKind::Range {
                min,
                max,
                tolerance,
            } => Ok(evaluate_range(rows, rule, *min, *max, *tolerance)),
            RuleKind::Uniqueness { key_columns } => Ok(evaluate_uniqueness(rows, key_columns)),
            RuleKind::Custom {
                reference_table,
                reference_column,
            } => self.evaluate_custom(rows, rule, reference_table, reference_column),
        }
    }

    fn evaluate_custom(
        &self,
        rows: &[Row],
        rule: &QualityRule,
        reference_table: &str,
        reference_column: &str,
    ) -> QualityResult<Evaluation> {
        let column = rule.column_name.as_deref().ok_or_else(|| {
            QualityError::Evaluation {
                rule: rule.name.clone(),
                reason: "custom rule has no column_name".to_string(),
            }
        })?;
        let keys = self.refs.resolve_keys(reference_table, reference_column)?;

        let mut orphan_count: i64 = 0;
        let mut orphan_sample: Vec<String> = Vec::new();
        for row in rows {
            let Some(value) = row.get(column).and_then(|v| v.as_text()) else {
                continue; // nulls are completeness territory, not orphans
            };
            if !keys.contains(&value) {
                orphan_count += 1;
                if orphan_sample.len() < 5 {
                    orphan_sample.push(value);
                }
            }
        }

        Ok(Evaluation {
            passed: orphan_count == 0,
            metric_value: Some(orphan_count as f64),
            threshold_value: Some(0.0),
            row_count: rows.len() as i64,
            failure_count: orphan_count,
            details: json!({
                "reference": format!("{reference_table}.{reference_column}"),
                "orphan_sample": orphan_sample,
            }),
        })
    }
}

/// Completeness: fraction of rows with a non-null target column.
fn evaluate_threshold(rows: &[Row], rule: &QualityRule, min_ratio: f64) -> Evaluation {
    // validated at definition time
    let column = rule.column_name.as_deref().unwrap_or_default();
    let total = rows.len() as i64;
    let null_count = rows.iter().filter(|r| r.is_null(column)).count() as i64;
    let ratio = if total == 0 {
        0.0
    } else {
        (total - null_count) as f64 / total as f64
    };

    Evaluation {
        passed: ratio >= min_ratio,
        metric_value: Some(ratio),
        threshold_value: Some(min_ratio),
        row_count: total,
        failure_count: null_count,
        details: json!({
            "null_count": null_count,
            "null_pct": if total == 0 { 0.0 } else { null_count as f64 / total as f64 },
        }),
    }
}

/// Validity: count of numeric values outside `[min, max]`.
fn evaluate_range(rows: &[Row], rule: &QualityRule, min: f64, max: f64, tolerance: u64) -> Evaluation {
    let column = rule.column_name.as_deref().unwrap_or_default();
    let mut evaluated: i64 = 0;
    let mut out_of_range: i64 = 0;
    let mut observed_min = f64::INFINITY;
    let mut observed_max = f64::NEG_INFINITY;

    for row in rows {
        let Some(value) = row.get(column).and_then(|v| v.as_number()) else {
            continue;
        };
        evaluated += 1;
        observed_min = observed_min.min(value);
        observed_max = observed_max.max(value);
        if !value.is_finite() || value < min || value > max {
            out_of_range += 1;
        }
    }

    let details = if evaluated > 0 {
        json!({
            "expected_range": [min, max],
            "observed_min": observed_min,
            "observed_max": observed_max,
        })
    } else {
        json!({ "expected_range": [min, max], "evaluated": 0 })
    };

    Evaluation {
        passed: out_of_range as u64 <= tolerance,
        metric_value: Some(out_of_range as f64),
        threshold_value: Some(tolerance as f64),
        row_count: evaluated,
        failure_count: out_of_range,
        details,
    }
}

/// Uniqueness: rows whose key tuple occurs more than once.
fn evaluate_uniqueness(rows: &[Row], key_columns: &[String]) -> Evaluation {
    let mut counts: HashMap<Vec<String>, i64> = HashMap::new();
    for row in rows {
        let key: Vec<String> = key_columns
            .iter()
            .map(|c| {
                row.get(c)
                    .and_then(|v| v.as_text())
                    .unwrap_or_else(|| "<null>".to_string())
            })
            .collect();
        *counts.entry(key).or_insert(0) += 1;
    }

    let duplicate_rows: i64 = counts.values().filter(|&&n| n > 1).sum();
    let duplicate_keys = counts.values().filter(|&&n| n > 1).count() as i64;

    Evaluation {
        passed: duplicate_rows == 0,
        metric_value: Some(duplicate_rows as f64),
        threshold_value: Some(0.0),
        row_count: rows.len() as i64,
        failure_count: duplicate_rows,
        details: json!({
            "key_columns": key_columns,
            "duplicate_keys": duplicate_keys,
        }),
    }
}

#[cfg(test)]
#[path = "validator_test.rs"]
mod tests;
