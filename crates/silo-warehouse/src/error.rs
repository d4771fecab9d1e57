//! Error types for the warehouse.

use thiserror::Error;

/// Warehouse errors.
#[derive(Error, Debug)]
pub enum WarehouseError {
    /// Failed to open or create the warehouse database (W001).
    #[error("[W001] Warehouse connection failed: {0}")]
    ConnectionError(String),

    /// Warehouse schema migration failed (W002).
    #[error("[W002] Warehouse migration failed: {0}")]
    MigrationError(String),

    /// SQL execution error against the warehouse (W003).
    #[error("[W003] Warehouse query failed: {0}")]
    QueryError(String),

    /// A dimension natural key could not be resolved or created (W004).
    #[error("[W004] Dimension resolution failed: {0}")]
    DimensionError(String),

    /// Batch load failed and was rolled back (W005).
    #[error("[W005] Fact load failed: {0}")]
    LoadError(String),

    /// Metadata recording failed during a load (W006).
    #[error("[W006] Metadata write failed")]
    Meta(#[from] silo_meta::MetaError),

    /// Quality validation failed to execute (W007).
    #[error("[W007] Quality validation failed")]
    Quality(#[from] silo_quality::QualityError),

    /// DuckDB driver error with preserved source chain (W008).
    #[error("[W008] DuckDB error")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for [`WarehouseError`].
pub type WarehouseResult<T> = Result<T, WarehouseError>;

impl From<duckdb::Error> for WarehouseError {
    fn from(err: duckdb::Error) -> Self {
        WarehouseError::DuckDb(err)
    }
}
