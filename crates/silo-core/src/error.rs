//! Error types for silo-core

use thiserror::Error;

/// Core error type for Silo
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Ruleset file not found
    #[error("[C004] Ruleset file not found: {path}")]
    RulesetNotFound { path: String },

    /// C005: Failed to parse a ruleset
    #[error("[C005] Failed to parse ruleset: {message}")]
    RulesetParseError { message: String },

    /// C006: A rule definition is invalid
    #[error("[C006] Invalid rule '{name}': {reason}")]
    RuleInvalid { name: String, reason: String },

    /// C007: IO error
    #[error("[C007] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// C008: IO error with file path context
    #[error("[C008] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C009: YAML parse error
    #[error("[C009] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
