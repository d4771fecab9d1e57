//! Star-schema warehouse for Silo.
//!
//! Resolves natural keys into dimension surrogate keys (creating dimension
//! rows as needed) and upserts fact rows so reruns of the same source never
//! duplicate data. Shares one DuckDB file with the metadata store so a
//! batch load and its observability records live side by side.

pub mod ddl;
pub mod dimensions;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod schema;
pub mod stage;

pub use error::{WarehouseError, WarehouseResult};
pub use ingest::read_csv_rows;
pub use loader::{load_facts, FactRow, LoadResult};
pub use schema::Warehouse;
pub use stage::{run_load_stage, run_load_stages, FileBatch, StageReport, StageTally};
