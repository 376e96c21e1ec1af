use super::common::LakeConfig;
use clap::Parser;
use meddra_lake_catalog::{CatalogSyncConfig, CatalogSyncPipeline, ObjectStoreCatalog};
use meddra_lake_types::ObjectEvent;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Catalog(#[from] meddra_lake_catalog::Error),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("failed to render report: {0}")]
    Report(#[from] serde_json::Error),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Parser)]
pub(crate) struct Config {
    #[clap(flatten)]
    lake: LakeConfig,

    /// Catalog database to maintain
    #[clap(long, env = "MEDDRA_LAKE_DATABASE", default_value = "meddra")]
    database: String,

    /// Catalog table to maintain
    #[clap(long, env = "MEDDRA_LAKE_TABLE", default_value = "meddra_records")]
    table: String,

    /// Prefix under the data dir where the catalog snapshot lives
    #[clap(long, env = "MEDDRA_LAKE_CATALOG_PREFIX", default_value = "meta")]
    catalog_prefix: String,
}

pub(crate) async fn command(config: Config) -> Result<()> {
    let store = config.lake.object_store()?;
    let catalog = Arc::new(ObjectStoreCatalog::new(
        Arc::clone(&store),
        &config.catalog_prefix,
    ));

    let pipeline = CatalogSyncPipeline::new(
        Arc::clone(&store),
        catalog,
        CatalogSyncConfig {
            database: config.database.clone(),
            table: config.table.clone(),
            base_prefix: config.lake.output_prefix.clone(),
        },
    );

    // The deployed system is driven by storage-write notifications; the CLI
    // stands in for the trigger with an event naming the partition root.
    let event = ObjectEvent::new(
        config.lake.bucket.clone(),
        config.lake.output_prefix.clone(),
    );
    let report = pipeline.handle(&event).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
