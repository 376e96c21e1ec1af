//! Convergence of catalog partition metadata onto the discovered storage
//! state.

use crate::catalog::{Catalog, PartitionDefinition, StorageDescriptor, TableDefinition};
use meddra_lake_types::paths::PartitionDirPath;
use meddra_lake_types::CanonicalVersion;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Per-version outcomes of one reconciliation pass. Failures are values
/// here, not raised errors: one version failing to register never aborts the
/// rest of the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: Vec<CanonicalVersion>,
    pub existing: Vec<CanonicalVersion>,
    pub failed: Vec<CanonicalVersion>,
}

/// Register a catalog partition for every discovered version that lacks one.
///
/// Purely additive: versions already registered are skipped, and catalog
/// partitions whose storage has disappeared are left in place. Running this
/// twice with the same discovered set leaves the catalog identical and the
/// second `added` list empty.
pub async fn reconcile_partitions(
    catalog: &dyn Catalog,
    database: &str,
    table: &TableDefinition,
    base_prefix: &str,
    discovered: &BTreeSet<CanonicalVersion>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for version in discovered {
        match catalog.get_partition(database, &table.name, version).await {
            Ok(_) => report.existing.push(version.clone()),
            Err(e) if e.is_not_found() => {
                let partition = PartitionDefinition {
                    version: version.clone(),
                    storage: StorageDescriptor {
                        location: PartitionDirPath::new(base_prefix, version).to_string(),
                        format: table.storage.format,
                        compression: table.storage.compression,
                    },
                };
                match catalog
                    .create_partitions(database, &table.name, vec![partition])
                    .await
                {
                    Ok(()) => {
                        info!(%version, "registered catalog partition");
                        report.added.push(version.clone());
                    }
                    Err(e) if e.is_already_exists() => {
                        // A concurrent run registered it between our lookup
                        // and our create.
                        report.existing.push(version.clone());
                    }
                    Err(error) => {
                        warn!(%version, %error, "failed to register partition, skipping it");
                        report.failed.push(version.clone());
                    }
                }
            }
            Err(error) => {
                warn!(%version, %error, "partition lookup failed, skipping it");
                report.failed.push(version.clone());
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalog;
    use crate::schema::{ensure_database, ensure_table, meddra_table_definition};
    use pretty_assertions::assert_eq;

    fn version(s: &str) -> CanonicalVersion {
        CanonicalVersion::normalize(s).unwrap()
    }

    fn discovered(tokens: &[&str]) -> BTreeSet<CanonicalVersion> {
        tokens.iter().map(|t| version(t)).collect()
    }

    async fn catalog_with_table() -> (MemoryCatalog, TableDefinition) {
        let catalog = MemoryCatalog::new();
        let table = meddra_table_definition("terms", "record_folders");
        ensure_database(&catalog, "meddra").await.unwrap();
        ensure_table(&catalog, "meddra", table.clone()).await.unwrap();
        (catalog, table)
    }

    #[tokio::test]
    async fn registers_missing_partitions_at_their_prefix() {
        let (catalog, table) = catalog_with_table().await;

        let report = reconcile_partitions(
            &catalog,
            "meddra",
            &table,
            "record_folders",
            &discovered(&["5.0", "5.1"]),
        )
        .await;

        assert_eq!(report.added, vec![version("5.0"), version("5.1")]);
        assert!(report.existing.is_empty());
        assert!(report.failed.is_empty());

        let partition = catalog
            .get_partition("meddra", "terms", &version("5.1"))
            .await
            .unwrap();
        assert_eq!(partition.storage.location, "record_folders/Record_5.1");
        assert_eq!(partition.storage.format, table.storage.format);
    }

    #[tokio::test]
    async fn second_pass_adds_nothing() {
        let (catalog, table) = catalog_with_table().await;
        let versions = discovered(&["5.0", "5.1"]);

        let first =
            reconcile_partitions(&catalog, "meddra", &table, "record_folders", &versions).await;
        assert_eq!(first.added.len(), 2);

        let second =
            reconcile_partitions(&catalog, "meddra", &table, "record_folders", &versions).await;
        assert!(second.added.is_empty());
        assert_eq!(second.existing, vec![version("5.0"), version("5.1")]);
        assert!(second.failed.is_empty());
    }

    #[tokio::test]
    async fn new_versions_join_without_touching_old_ones() {
        let (catalog, table) = catalog_with_table().await;

        reconcile_partitions(
            &catalog,
            "meddra",
            &table,
            "record_folders",
            &discovered(&["5.0"]),
        )
        .await;
        let report = reconcile_partitions(
            &catalog,
            "meddra",
            &table,
            "record_folders",
            &discovered(&["5.0", "26.1"]),
        )
        .await;

        assert_eq!(report.added, vec![version("26.1")]);
        assert_eq!(report.existing, vec![version("5.0")]);
    }

    #[tokio::test]
    async fn vanished_storage_never_removes_a_partition() {
        let (catalog, table) = catalog_with_table().await;
        reconcile_partitions(
            &catalog,
            "meddra",
            &table,
            "record_folders",
            &discovered(&["5.0"]),
        )
        .await;

        // Storage now reports nothing at all; the registered partition stays.
        let report =
            reconcile_partitions(&catalog, "meddra", &table, "record_folders", &BTreeSet::new())
                .await;
        assert_eq!(report, ReconcileReport::default());
        assert!(catalog
            .get_partition("meddra", "terms", &version("5.0"))
            .await
            .is_ok());
    }
}
