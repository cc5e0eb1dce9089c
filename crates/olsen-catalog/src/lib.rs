//! SQLite-backed catalog store for the Olsen photo index.
//!
//! Mirrors `session-db`'s shape: one connection, one set of tables, simple
//! transactional writers. The catalog is the single source of truth that the
//! indexer writes to and the query/facet engine reads from.

pub mod db;
pub mod records;
pub mod schema;

pub use db::{BurstAssignment, CatalogDb};
pub use records::{
    BurstGroupRecord, BurstScanRow, ColorSampleRecord, NewColorSample, NewPhoto, NewThumbnail,
    PhotoRecord, ThumbnailSize,
};
