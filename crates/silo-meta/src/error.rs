//! Error types for the metadata database.

use thiserror::Error;

/// Metadata database errors.
#[derive(Error, Debug)]
pub enum MetaError {
    /// Failed to open or create the metadata database (M001).
    #[error("[M001] Metadata database connection failed: {0}")]
    ConnectionError(String),

    /// Schema migration failed (M002).
    #[error("[M002] Metadata database migration failed: {0}")]
    MigrationError(String),

    /// SQL execution error inside the metadata database (M003).
    #[error("[M003] Metadata database query failed: {0}")]
    QueryError(String),

    /// Transaction management error (M004).
    #[error("[M004] Metadata database transaction failed: {0}")]
    TransactionError(String),

    /// Population error — data could not be inserted (M005).
    #[error("[M005] Metadata database population failed: {0}")]
    PopulationError(String),

    /// Persisted rule could not be stored or reconstructed (M006).
    #[error("[M006] Quality rule persistence failed: {0}")]
    RuleError(String),

    /// Illegal run-state transition (M007).
    #[error("[M007] Invalid run transition: {0}")]
    RunStateError(String),

    /// A record violates a metadata invariant (M008).
    #[error("[M008] Invalid record: {0}")]
    InvalidRecord(String),

    /// DuckDB driver error with preserved source chain (M009).
    #[error("[M009] DuckDB error")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for [`MetaError`].
pub type MetaResult<T> = Result<T, MetaError>;

impl From<duckdb::Error> for MetaError {
    fn from(err: duckdb::Error) -> Self {
        MetaError::DuckDb(err)
    }
}

/// Context helpers for mapping driver errors onto [`MetaError`] variants.
pub(crate) trait MetaResultExt<T> {
    /// Map a driver error to [`MetaError::PopulationError`] with context.
    fn populate_context(self, ctx: &str) -> MetaResult<T>;

    /// Map a driver error to [`MetaError::QueryError`] with context.
    fn query_context(self, ctx: &str) -> MetaResult<T>;
}

impl<T> MetaResultExt<T> for Result<T, duckdb::Error> {
    fn populate_context(self, ctx: &str) -> MetaResult<T> {
        self.map_err(|e| MetaError::PopulationError(format!("{ctx}: {e}")))
    }

    fn query_context(self, ctx: &str) -> MetaResult<T> {
        self.map_err(|e| MetaError::QueryError(format!("{ctx}: {e}")))
    }
}
