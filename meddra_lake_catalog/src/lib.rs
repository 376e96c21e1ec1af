//! The catalog pipeline of the MedDRA lake.
//!
//! Runs independently of the conversion pipeline, with no shared memory and
//! no transactional coupling: it rediscovers version partitions from what
//! storage actually contains and converges catalog metadata onto them. Both
//! pipelines agree on partition naming only through `meddra_lake_types`.
//!
//! The catalog service itself is a collaborator behind the [`Catalog`]
//! trait; this crate ships an in-memory backend and an object-store-backed
//! JSON snapshot backend.

pub mod catalog;
pub mod discover;
pub mod memory;
pub mod object_store;
pub mod reconcile;
pub mod schema;
pub mod sync;

pub use catalog::Catalog;
pub use memory::MemoryCatalog;
pub use self::object_store::ObjectStoreCatalog;
pub use sync::{CatalogSyncConfig, CatalogSyncPipeline, SyncReport};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The expected signal that a looked-up object needs creation.
    #[error("{what} not found")]
    NotFound { what: String },

    /// The expected signal that a concurrent run created the object first.
    #[error("{what} already exists")]
    AlreadyExists { what: String },

    #[error("object store error: {0}")]
    ObjectStore(#[from] ::object_store::Error),

    #[error("catalog serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists { what: what.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
