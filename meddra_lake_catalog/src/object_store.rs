//! Catalog backend persisted as a JSON snapshot in object storage.
//!
//! Every operation loads the current snapshot, applies the same state
//! transition the in-memory backend uses, and stores the result back. There
//! is no lock between the load and the store; concurrent runs racing on the
//! same object both observe it absent and both attempt the create, which is
//! why callers treat a create that fails `AlreadyExists` as success.

use crate::catalog::{
    Catalog, CatalogState, DatabaseDefinition, PartitionDefinition, TableDefinition,
};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use meddra_lake_types::CanonicalVersion;
use object_store::path::Path as ObjPath;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;

/// File name of the catalog snapshot under `{prefix}/catalog/`
const CATALOG_SNAPSHOT_FILE: &str = "catalog.json";

#[derive(Debug)]
pub struct ObjectStoreCatalog {
    object_store: Arc<dyn ObjectStore>,
    snapshot_path: ObjPath,
}

impl ObjectStoreCatalog {
    pub fn new(object_store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        Self {
            object_store,
            snapshot_path: ObjPath::from(format!("{prefix}/catalog/{CATALOG_SNAPSHOT_FILE}")),
        }
    }

    /// Load the snapshot, treating an absent file as an empty catalog.
    async fn load(&self) -> Result<CatalogState> {
        match self.object_store.get(&self.snapshot_path).await {
            Ok(response) => {
                let bytes = response.bytes().await?;
                Ok(serde_json::from_slice(&bytes)?)
            }
            Err(object_store::Error::NotFound { .. }) => Ok(CatalogState::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, state: &CatalogState) -> Result<()> {
        let bytes = Bytes::from(serde_json::to_vec_pretty(state)?);
        self.object_store
            .put(&self.snapshot_path, PutPayload::from_bytes(bytes))
            .await?;
        Ok(())
    }

    /// Load, apply a mutation, store. The mutation only persists when it
    /// succeeds, so a failed create leaves the snapshot untouched.
    async fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut CatalogState) -> Result<()> + Send,
    {
        let mut state = self.load().await?;
        mutate(&mut state)?;
        self.store(&state).await
    }
}

#[async_trait]
impl Catalog for ObjectStoreCatalog {
    async fn get_database(&self, name: &str) -> Result<DatabaseDefinition> {
        self.load().await?.get_database(name)
    }

    async fn create_database(&self, database: DatabaseDefinition) -> Result<()> {
        self.update(|state| state.create_database(database)).await
    }

    async fn get_table(&self, database: &str, table: &str) -> Result<TableDefinition> {
        self.load().await?.get_table(database, table)
    }

    async fn create_table(&self, database: &str, table: TableDefinition) -> Result<()> {
        self.update(|state| state.create_table(database, table)).await
    }

    async fn get_partition(
        &self,
        database: &str,
        table: &str,
        version: &CanonicalVersion,
    ) -> Result<PartitionDefinition> {
        self.load().await?.get_partition(database, table, version)
    }

    async fn create_partitions(
        &self,
        database: &str,
        table: &str,
        partitions: Vec<PartitionDefinition>,
    ) -> Result<()> {
        self.update(|state| state.create_partitions(database, table, partitions))
            .await
    }
}
