//! The metadata catalog collaborator boundary: databases, tables and
//! version partitions, with create-if-absent as the only mutation.

use crate::{Error, Result};
use async_trait::async_trait;
use meddra_lake_types::CanonicalVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: ColumnType,
}

impl ColumnDefinition {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: ColumnType::String,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Parquet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCompression {
    Snappy,
}

/// Where a table or partition's data lives and how it is encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    pub location: String,
    pub format: FileFormat,
    pub compression: FileCompression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDefinition {
    pub name: String,
    pub description: Option<String>,
}

impl DatabaseDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub partition_key: ColumnDefinition,
    pub storage: StorageDescriptor,
}

/// A registered version partition. Its storage descriptor carries the same
/// format the owning table declares, pointed at the partition's own prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDefinition {
    pub version: CanonicalVersion,
    pub storage: StorageDescriptor,
}

/// The catalog service interface.
///
/// Lookups signal a miss with [`Error::NotFound`]; creates signal a
/// concurrent winner with [`Error::AlreadyExists`]. Nothing here modifies an
/// existing object; the lake's mutation discipline is create if absent,
/// never modify if present.
#[async_trait]
pub trait Catalog: Debug + Send + Sync + 'static {
    async fn get_database(&self, name: &str) -> Result<DatabaseDefinition>;

    async fn create_database(&self, database: DatabaseDefinition) -> Result<()>;

    async fn get_table(&self, database: &str, table: &str) -> Result<TableDefinition>;

    async fn create_table(&self, database: &str, table: TableDefinition) -> Result<()>;

    async fn get_partition(
        &self,
        database: &str,
        table: &str,
        version: &CanonicalVersion,
    ) -> Result<PartitionDefinition>;

    async fn create_partitions(
        &self,
        database: &str,
        table: &str,
        partitions: Vec<PartitionDefinition>,
    ) -> Result<()>;
}

/// Catalog contents as plain data. Both backends speak through this one
/// implementation of the lookup/create semantics, so their behavior cannot
/// diverge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CatalogState {
    databases: BTreeMap<String, DatabaseState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DatabaseState {
    definition: DatabaseDefinition,
    tables: BTreeMap<String, TableState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TableState {
    definition: TableDefinition,
    partitions: BTreeMap<CanonicalVersion, PartitionDefinition>,
}

impl CatalogState {
    pub(crate) fn get_database(&self, name: &str) -> Result<DatabaseDefinition> {
        self.databases
            .get(name)
            .map(|db| db.definition.clone())
            .ok_or_else(|| Error::not_found(format!("database {name}")))
    }

    pub(crate) fn create_database(&mut self, database: DatabaseDefinition) -> Result<()> {
        if self.databases.contains_key(&database.name) {
            return Err(Error::already_exists(format!("database {}", database.name)));
        }
        self.databases.insert(
            database.name.clone(),
            DatabaseState {
                definition: database,
                tables: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub(crate) fn get_table(&self, database: &str, table: &str) -> Result<TableDefinition> {
        self.database(database)?
            .tables
            .get(table)
            .map(|t| t.definition.clone())
            .ok_or_else(|| Error::not_found(format!("table {database}.{table}")))
    }

    pub(crate) fn create_table(&mut self, database: &str, table: TableDefinition) -> Result<()> {
        let db = self.database_mut(database)?;
        if db.tables.contains_key(&table.name) {
            return Err(Error::already_exists(format!(
                "table {database}.{}",
                table.name
            )));
        }
        db.tables.insert(
            table.name.clone(),
            TableState {
                definition: table,
                partitions: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub(crate) fn get_partition(
        &self,
        database: &str,
        table: &str,
        version: &CanonicalVersion,
    ) -> Result<PartitionDefinition> {
        self.table(database, table)?
            .partitions
            .get(version)
            .cloned()
            .ok_or_else(|| {
                Error::not_found(format!("partition {database}.{table}/version={version}"))
            })
    }

    pub(crate) fn create_partitions(
        &mut self,
        database: &str,
        table: &str,
        partitions: Vec<PartitionDefinition>,
    ) -> Result<()> {
        let table_state = self.table_mut(database, table)?;
        for partition in &partitions {
            if table_state.partitions.contains_key(&partition.version) {
                return Err(Error::already_exists(format!(
                    "partition {database}.{table}/version={}",
                    partition.version
                )));
            }
        }
        for partition in partitions {
            table_state
                .partitions
                .insert(partition.version.clone(), partition);
        }
        Ok(())
    }

    fn database(&self, name: &str) -> Result<&DatabaseState> {
        self.databases
            .get(name)
            .ok_or_else(|| Error::not_found(format!("database {name}")))
    }

    fn database_mut(&mut self, name: &str) -> Result<&mut DatabaseState> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| Error::not_found(format!("database {name}")))
    }

    fn table(&self, database: &str, table: &str) -> Result<&TableState> {
        self.database(database)?
            .tables
            .get(table)
            .ok_or_else(|| Error::not_found(format!("table {database}.{table}")))
    }

    fn table_mut(&mut self, database: &str, table: &str) -> Result<&mut TableState> {
        self.database_mut(database)?
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::not_found(format!("table {database}.{table}")))
    }
}
