use super::common::LakeConfig;
use clap::Parser;
use meddra_lake_convert::ConversionPipeline;
use meddra_lake_types::ObjectEvent;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Convert(#[from] meddra_lake_convert::Error),

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

    /// Key of the raw CSV object to convert
    key: String,
}

pub(crate) async fn command(config: Config) -> Result<()> {
    let store = config.lake.object_store()?;
    let pipeline = ConversionPipeline::new(
        Arc::clone(&store),
        store,
        config.lake.output_prefix.clone(),
    );

    let event = ObjectEvent::new(config.lake.bucket.clone(), config.key.clone());
    let outcome = pipeline.handle(&event).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
