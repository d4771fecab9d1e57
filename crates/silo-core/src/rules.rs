//! Quality rule definitions and ruleset loading.
//!
//! A ruleset is a named collection of [`QualityRule`]s. Each rule carries a
//! category, a target table/column, a severity, and a [`RuleKind`] variant
//! holding only the parameters that kind needs. Rulesets load from YAML
//! files and persist to the `quality_rules` metadata table.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// Quality check category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Completeness,
    Validity,
    Consistency,
    Uniqueness,
    Timeliness,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Completeness => "completeness",
            RuleCategory::Validity => "validity",
            RuleCategory::Consistency => "consistency",
            RuleCategory::Uniqueness => "uniqueness",
            RuleCategory::Timeliness => "timeliness",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a rule. Fixed at definition time; a failing critical rule
/// fails the batch, a failing warning rule is recorded only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Critical,
    Warning,
}

impl std::fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSeverity::Critical => write!(f, "critical"),
            RuleSeverity::Warning => write!(f, "warning"),
        }
    }
}

fn default_tolerance() -> u64 {
    0
}

/// Evaluation semantics for a rule, one variant per rule type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Fraction of rows with a non-null target column must reach `min_ratio`.
    Threshold { min_ratio: f64 },

    /// Count of rows outside `[min, max]` must not exceed `tolerance`.
    Range {
        min: f64,
        max: f64,
        #[serde(default = "default_tolerance")]
        tolerance: u64,
    },

    /// No two rows may share the same key tuple.
    Uniqueness { key_columns: Vec<String> },

    /// Every target value must exist in the reference column (zero orphans).
    Custom {
        reference_table: String,
        reference_column: String,
    },
}

impl RuleKind {
    /// Stable identifier stored in the `rule_type` column.
    pub fn type_name(&self) -> &'static str {
        match self {
            RuleKind::Threshold { .. } => "threshold",
            RuleKind::Range { .. } => "range",
            RuleKind::Uniqueness { .. } => "uniqueness",
            RuleKind::Custom { .. } => "custom",
        }
    }
}

/// One quality rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityRule {
    /// Unique rule name, e.g. `completeness_value`.
    pub name: String,

    /// Check category.
    pub category: RuleCategory,

    /// Table or dataset the rule targets.
    pub table_name: String,

    /// Column the rule targets, if column-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,

    /// Evaluation semantics and parameters.
    #[serde(flatten)]
    pub kind: RuleKind,

    /// Severity; defaults to critical.
    #[serde(default = "default_severity")]
    pub severity: RuleSeverity,

    /// Inactive rules are persisted but skipped during validation.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_severity() -> RuleSeverity {
    RuleSeverity::Critical
}

fn default_active() -> bool {
    true
}

impl QualityRule {
    /// Validate internal consistency of the rule definition.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::RuleInvalid {
                name: self.name.clone(),
                reason: "rule name must not be empty".to_string(),
            });
        }
        match &self.kind {
            RuleKind::Threshold { min_ratio } => {
                if !(0.0..=1.0).contains(min_ratio) {
                    return Err(CoreError::RuleInvalid {
                        name: self.name.clone(),
                        reason: format!("min_ratio {min_ratio} outside [0, 1]"),
                    });
                }
                if self.column_name.is_none() {
                    return Err(CoreError::RuleInvalid {
                        name: self.name.clone(),
                        reason: "threshold rules require a column_name".to_string(),
                    });
                }
            }
            RuleKind::Range { min, max, .. } => {
                if min > max {
                    return Err(CoreError::RuleInvalid {
                        name: self.name.clone(),
                        reason: format!("range min {min} exceeds max {max}"),
                    });
                }
                if self.column_name.is_none() {
                    return Err(CoreError::RuleInvalid {
                        name: self.name.clone(),
                        reason: "range rules require a column_name".to_string(),
                    });
                }
            }
            RuleKind::Uniqueness { key_columns } => {
                if key_columns.is_empty() {
                    return Err(CoreError::RuleInvalid {
                        name: self.name.clone(),
                        reason: "uniqueness rules require at least one key column".to_string(),
                    });
                }
            }
            RuleKind::Custom {
                reference_table,
                reference_column,
            } => {
                if reference_table.trim().is_empty() || reference_column.trim().is_empty() {
                    return Err(CoreError::RuleInvalid {
                        name: self.name.clone(),
                        reason: "custom rules require reference_table and reference_column"
                            .to_string(),
                    });
                }
                if self.column_name.is_none() {
                    return Err(CoreError::RuleInvalid {
                        name: self.name.clone(),
                        reason: "custom rules require a column_name".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A named collection of quality rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ruleset {
    /// Rules in file order.
    #[serde(default)]
    pub rules: Vec<QualityRule>,
}

impl Ruleset {
    /// Parse a ruleset from YAML text and validate every rule.
    pub fn from_yaml_str(yaml: &str) -> CoreResult<Self> {
        let ruleset: Ruleset =
            serde_yaml::from_str(yaml).map_err(|e| CoreError::RulesetParseError {
                message: e.to_string(),
            })?;
        for rule in &ruleset.rules {
            rule.validate()?;
        }
        log::debug!("Parsed ruleset with {} rules", ruleset.rules.len());
        Ok(ruleset)
    }

    /// Load a ruleset from a YAML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::RulesetNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Rules currently active, in definition order.
    pub fn active_rules(&self) -> impl Iterator<Item = &QualityRule> {
        self.rules.iter().filter(|r| r.is_active)
    }

    /// Look up a rule by name.
    pub fn get(&self, name: &str) -> Option<&QualityRule> {
        self.rules.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
#[path = "rules_test.rs"]
mod tests;
