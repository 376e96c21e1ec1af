//! The catalog pipeline: one triggered run that makes catalog metadata
//! match storage.

use crate::catalog::Catalog;
use crate::discover::discover_versions;
use crate::reconcile::{reconcile_partitions, ReconcileReport};
use crate::schema::{ensure_database, ensure_table, meddra_table_definition, EnsureOutcome};
use crate::Result;
use meddra_lake_types::{ObjectEvent, StorageNotification};
use object_store::ObjectStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Names binding one deployment of the catalog pipeline: which database and
/// table to maintain, over which storage prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSyncConfig {
    pub database: String,
    pub table: String,
    pub base_prefix: String,
}

/// Aggregate result of one catalog sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub database: EnsureOutcome,
    pub table: EnsureOutcome,
    pub reconcile: ReconcileReport,
}

/// One catalog run per triggering event: ensure the database and table
/// exist, rediscover version partitions from storage, and register the
/// missing ones.
///
/// Every step is idempotent or additive, so re-triggering after a failed run
/// is always safe and converges on the same catalog state.
#[derive(Debug)]
pub struct CatalogSyncPipeline {
    object_store: Arc<dyn ObjectStore>,
    catalog: Arc<dyn Catalog>,
    config: CatalogSyncConfig,
}

impl CatalogSyncPipeline {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        catalog: Arc<dyn Catalog>,
        config: CatalogSyncConfig,
    ) -> Self {
        Self {
            object_store,
            catalog,
            config,
        }
    }

    /// Entry point for a raw storage notification: process its first record,
    /// or nothing when the notification carries none.
    pub async fn handle_notification(
        &self,
        notification: &StorageNotification,
    ) -> Result<Option<SyncReport>> {
        match notification.primary_event() {
            Some(event) => Ok(Some(self.handle(event).await?)),
            None => Ok(None),
        }
    }

    pub async fn handle(&self, event: &ObjectEvent) -> Result<SyncReport> {
        info!(
            bucket = %event.bucket,
            key = %event.decoded_key(),
            database = %self.config.database,
            table = %self.config.table,
            "catalog sync triggered"
        );

        let database = ensure_database(self.catalog.as_ref(), &self.config.database).await?;
        let table_definition =
            meddra_table_definition(&self.config.table, &self.config.base_prefix);
        let table = ensure_table(
            self.catalog.as_ref(),
            &self.config.database,
            table_definition.clone(),
        )
        .await?;

        let discovered =
            discover_versions(self.object_store.as_ref(), &self.config.base_prefix).await?;
        info!(versions = ?discovered, "versions found in storage");

        let reconcile = reconcile_partitions(
            self.catalog.as_ref(),
            &self.config.database,
            &table_definition,
            &self.config.base_prefix,
            &discovered,
        )
        .await;
        info!(added = ?reconcile.added, "catalog sync finished");

        Ok(SyncReport {
            database,
            table,
            reconcile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalog;
    use bytes::Bytes;
    use meddra_lake_types::CanonicalVersion;
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjPath;
    use object_store::PutPayload;
    use pretty_assertions::assert_eq;

    fn version(s: &str) -> CanonicalVersion {
        CanonicalVersion::normalize(s).unwrap()
    }

    fn config() -> CatalogSyncConfig {
        CatalogSyncConfig {
            database: "meddra".to_string(),
            table: "terms".to_string(),
            base_prefix: "record_folders".to_string(),
        }
    }

    async fn seeded_pipeline(keys: &[&str]) -> CatalogSyncPipeline {
        let store = Arc::new(InMemory::new());
        for key in keys {
            store
                .put(
                    &ObjPath::from(*key),
                    PutPayload::from_bytes(Bytes::from_static(b"x")),
                )
                .await
                .unwrap();
        }
        CatalogSyncPipeline::new(store, Arc::new(MemoryCatalog::new()), config())
    }

    #[test_log::test(tokio::test)]
    async fn first_run_creates_everything() {
        let pipeline = seeded_pipeline(&[
            "record_folders/Record_3.0/x.parquet",
            "record_folders/Record_3/y.parquet",
            "record_folders/Record_5.1/z.parquet",
        ])
        .await;
        let event = ObjectEvent::new("lake", "record_folders/Record_5.1/z.parquet");

        let report = pipeline.handle(&event).await.unwrap();
        assert_eq!(report.database, EnsureOutcome::Created);
        assert_eq!(report.table, EnsureOutcome::Created);
        // Record_3.0 and Record_3 collapse into one partition.
        assert_eq!(report.reconcile.added, vec![version("3.0"), version("5.1")]);
    }

    #[test_log::test(tokio::test)]
    async fn rerun_without_storage_change_is_a_no_op() {
        let pipeline = seeded_pipeline(&["record_folders/Record_26.1/a.parquet"]).await;
        let event = ObjectEvent::new("lake", "record_folders/Record_26.1/a.parquet");

        let first = pipeline.handle(&event).await.unwrap();
        assert_eq!(first.reconcile.added, vec![version("26.1")]);

        let second = pipeline.handle(&event).await.unwrap();
        assert_eq!(second.database, EnsureOutcome::Existed);
        assert_eq!(second.table, EnsureOutcome::Existed);
        assert!(second.reconcile.added.is_empty());
        assert_eq!(second.reconcile.existing, vec![version("26.1")]);
    }

    #[test_log::test(tokio::test)]
    async fn empty_storage_creates_schema_but_no_partitions() {
        let pipeline = seeded_pipeline(&[]).await;
        let event = ObjectEvent::new("lake", "incoming/terms.csv");

        let report = pipeline.handle(&event).await.unwrap();
        assert_eq!(report.database, EnsureOutcome::Created);
        assert_eq!(report.reconcile, ReconcileReport::default());
    }
}
