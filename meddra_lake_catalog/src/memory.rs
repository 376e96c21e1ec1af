//! Implementation of the catalog that sits entirely in memory.

use crate::catalog::{
    Catalog, CatalogState, DatabaseDefinition, PartitionDefinition, TableDefinition,
};
use crate::Result;
use async_trait::async_trait;
use meddra_lake_types::CanonicalVersion;
use parking_lot::RwLock;

/// In-memory catalog backend. State lives for the life of the process; used
/// by tests and by embedded single-run setups.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<CatalogState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn get_database(&self, name: &str) -> Result<DatabaseDefinition> {
        self.inner.read().get_database(name)
    }

    async fn create_database(&self, database: DatabaseDefinition) -> Result<()> {
        self.inner.write().create_database(database)
    }

    async fn get_table(&self, database: &str, table: &str) -> Result<TableDefinition> {
        self.inner.read().get_table(database, table)
    }

    async fn create_table(&self, database: &str, table: TableDefinition) -> Result<()> {
        self.inner.write().create_table(database, table)
    }

    async fn get_partition(
        &self,
        database: &str,
        table: &str,
        version: &CanonicalVersion,
    ) -> Result<PartitionDefinition> {
        self.inner.read().get_partition(database, table, version)
    }

    async fn create_partitions(
        &self,
        database: &str,
        table: &str,
        partitions: Vec<PartitionDefinition>,
    ) -> Result<()> {
        self.inner.write().create_partitions(database, table, partitions)
    }
}
