//! silo-core - Core library for Silo
//!
//! This crate provides the shared types used across all Silo components:
//! row batches, quality rule definitions, content/structural checksums,
//! run status types, and project configuration.

pub mod checksum;
pub mod config;
pub mod error;
pub mod row;
pub mod rules;
pub mod run;

pub use checksum::{compute_checksum, structural_fingerprint};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use row::{FieldValue, Row};
pub use rules::{QualityRule, RuleCategory, RuleKind, RuleSeverity, Ruleset};
pub use run::{RunStatus, StageOutcome};
