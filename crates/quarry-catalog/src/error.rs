//! Error types for the schema catalog.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Metadata could not be fetched, even after the retry. The driver
    /// error stays in the source chain and is only logged.
    #[error("schema catalog unavailable")]
    Unavailable(#[source] anyhow::Error),
}
