//! The fixed MedDRA table schema and the idempotent ensure operations.

use crate::catalog::{
    Catalog, ColumnDefinition, DatabaseDefinition, FileCompression, FileFormat, StorageDescriptor,
    TableDefinition,
};
use crate::Result;
use serde::Serialize;
use tracing::info;

/// The MedDRA terminology hierarchy columns, all string-typed.
pub const MEDDRA_COLUMNS: [&str; 15] = [
    "pt_code",
    "hlt_code",
    "hlgt_code",
    "soc_code",
    "pt_name",
    "hlt_name",
    "hlgt_name",
    "soc_name",
    "soc_abbrev",
    "pt_soc_code",
    "primary_soc_fg",
    "llt_code",
    "llt_name",
    "llt_currency",
    "name",
];

/// Name of the single partition key column.
pub const VERSION_PARTITION_KEY: &str = "version";

/// The lake's table definition: 15 MedDRA string columns, a string `version`
/// partition key, Snappy-compressed Parquet rooted at `base_location`.
pub fn meddra_table_definition(name: &str, base_location: &str) -> TableDefinition {
    TableDefinition {
        name: name.to_string(),
        columns: MEDDRA_COLUMNS
            .iter()
            .map(|column| ColumnDefinition::string(*column))
            .collect(),
        partition_key: ColumnDefinition::string(VERSION_PARTITION_KEY),
        storage: StorageDescriptor {
            location: base_location.to_string(),
            format: FileFormat::Parquet,
            compression: FileCompression::Snappy,
        },
    }
}

/// Whether an ensure operation had to create its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsureOutcome {
    Created,
    Existed,
}

/// Make sure the database exists, creating it if absent.
///
/// A create that loses the race to a concurrent run (`AlreadyExists`) counts
/// as `Existed`. When the database is already present nothing is mutated and
/// nothing is validated against it.
pub async fn ensure_database(catalog: &dyn Catalog, name: &str) -> Result<EnsureOutcome> {
    match catalog.get_database(name).await {
        Ok(_) => Ok(EnsureOutcome::Existed),
        Err(e) if e.is_not_found() => {
            match catalog.create_database(DatabaseDefinition::new(name)).await {
                Ok(()) => {
                    info!(database = name, "created catalog database");
                    Ok(EnsureOutcome::Created)
                }
                Err(e) if e.is_already_exists() => Ok(EnsureOutcome::Existed),
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

/// Make sure the table exists, creating it with the given definition if
/// absent.
///
/// Presence alone short-circuits: an existing table's schema is not
/// re-validated or altered, so a table created earlier with a different
/// schema silently persists.
pub async fn ensure_table(
    catalog: &dyn Catalog,
    database: &str,
    table: TableDefinition,
) -> Result<EnsureOutcome> {
    match catalog.get_table(database, &table.name).await {
        Ok(_) => Ok(EnsureOutcome::Existed),
        Err(e) if e.is_not_found() => {
            let name = table.name.clone();
            match catalog.create_table(database, table).await {
                Ok(()) => {
                    info!(database, table = %name, "created catalog table");
                    Ok(EnsureOutcome::Created)
                }
                Err(e) if e.is_already_exists() => Ok(EnsureOutcome::Existed),
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PartitionDefinition;
    use crate::memory::MemoryCatalog;
    use crate::Error;
    use async_trait::async_trait;
    use meddra_lake_types::CanonicalVersion;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts mutating calls so tests can assert an ensure on a present
    /// object performs none.
    #[derive(Debug, Default)]
    struct CountingCatalog {
        inner: MemoryCatalog,
        mutating_calls: AtomicUsize,
    }

    impl CountingCatalog {
        fn mutations(&self) -> usize {
            self.mutating_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Catalog for CountingCatalog {
        async fn get_database(&self, name: &str) -> Result<DatabaseDefinition> {
            self.inner.get_database(name).await
        }

        async fn create_database(&self, database: DatabaseDefinition) -> Result<()> {
            self.mutating_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.create_database(database).await
        }

        async fn get_table(&self, database: &str, table: &str) -> Result<TableDefinition> {
            self.inner.get_table(database, table).await
        }

        async fn create_table(&self, database: &str, table: TableDefinition) -> Result<()> {
            self.mutating_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.create_table(database, table).await
        }

        async fn get_partition(
            &self,
            database: &str,
            table: &str,
            version: &CanonicalVersion,
        ) -> Result<PartitionDefinition> {
            self.inner.get_partition(database, table, version).await
        }

        async fn create_partitions(
            &self,
            database: &str,
            table: &str,
            partitions: Vec<PartitionDefinition>,
        ) -> Result<()> {
            self.mutating_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.create_partitions(database, table, partitions).await
        }
    }

    #[tokio::test]
    async fn table_definition_has_fifteen_string_columns() {
        let table = meddra_table_definition("terms", "record_folders");
        assert_eq!(table.columns.len(), 15);
        assert_eq!(table.partition_key.name, "version");
        assert_eq!(table.storage.location, "record_folders");
    }

    #[tokio::test]
    async fn ensure_creates_then_leaves_alone() {
        let catalog = CountingCatalog::default();

        assert_eq!(
            ensure_database(&catalog, "meddra").await.unwrap(),
            EnsureOutcome::Created
        );
        assert_eq!(
            ensure_table(&catalog, "meddra", meddra_table_definition("terms", "rf"))
                .await
                .unwrap(),
            EnsureOutcome::Created
        );
        assert_eq!(catalog.mutations(), 2);

        // Second invocation with everything present: zero mutating calls.
        assert_eq!(
            ensure_database(&catalog, "meddra").await.unwrap(),
            EnsureOutcome::Existed
        );
        assert_eq!(
            ensure_table(&catalog, "meddra", meddra_table_definition("terms", "rf"))
                .await
                .unwrap(),
            EnsureOutcome::Existed
        );
        assert_eq!(catalog.mutations(), 2);
    }

    #[tokio::test]
    async fn ensure_treats_lost_create_race_as_existed() {
        // Simulate the race: the lookup misses, then another run creates the
        // database before ours does.
        #[derive(Debug, Default)]
        struct RacingCatalog {
            inner: MemoryCatalog,
        }

        #[async_trait]
        impl Catalog for RacingCatalog {
            async fn get_database(&self, name: &str) -> Result<DatabaseDefinition> {
                Err(Error::not_found(format!("database {name}")))
            }

            async fn create_database(&self, database: DatabaseDefinition) -> Result<()> {
                self.inner
                    .create_database(DatabaseDefinition::new(database.name.clone()))
                    .await
                    .ok();
                self.inner.create_database(database).await
            }

            async fn get_table(&self, database: &str, table: &str) -> Result<TableDefinition> {
                self.inner.get_table(database, table).await
            }

            async fn create_table(&self, database: &str, table: TableDefinition) -> Result<()> {
                self.inner.create_table(database, table).await
            }

            async fn get_partition(
                &self,
                database: &str,
                table: &str,
                version: &CanonicalVersion,
            ) -> Result<PartitionDefinition> {
                self.inner.get_partition(database, table, version).await
            }

            async fn create_partitions(
                &self,
                database: &str,
                table: &str,
                partitions: Vec<PartitionDefinition>,
            ) -> Result<()> {
                self.inner.create_partitions(database, table, partitions).await
            }
        }

        let catalog = RacingCatalog::default();
        assert_eq!(
            ensure_database(&catalog, "meddra").await.unwrap(),
            EnsureOutcome::Existed
        );
    }
}
