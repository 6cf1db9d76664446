//! Schema catalog for Quarry.
//!
//! The catalog turns live database metadata into an immutable
//! [`SchemaSnapshot`], the only source of truth for which databases, tables
//! and columns a request may name. Snapshots are published as `Arc`s and
//! replaced wholesale on refresh; readers never observe a half-built map.
//!
//! Metadata comes from a [`MetadataSource`], implemented for MySQL by
//! `quarry-adapter-mysql` and by in-memory fakes in tests.

pub mod catalog;
pub mod error;
pub mod snapshot;
pub mod source;

pub use catalog::{CatalogPolicy, SchemaCatalog};
pub use error::CatalogError;
pub use snapshot::{
    ColumnSchema, DatabaseSchema, IndexSchema, SYSTEM_DATABASES, SchemaSnapshot, TableSchema,
};
pub use source::{
    MetadataSource, RawColumn, RawIndexColumn, RawMetadata, RawTable, StaticMetadataSource,
};
