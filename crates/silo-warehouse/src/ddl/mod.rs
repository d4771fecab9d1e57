//! Embedded DDL migrations for the warehouse schema.
//!
//! Same shape as the metadata migrations: numbered `.sql` files embedded
//! via `include_str!`, tracked in `warehouse.schema_version`.

/// A single DDL migration.
pub struct Migration {
    /// Sequential version number (1-based).
    pub version: i32,
    /// Raw SQL to execute.
    pub sql: &'static str,
}

/// All known migrations, in order.
pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("v001_star_schema.sql"),
}];
