//! Config shared by the lake commands.

use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use std::sync::Arc;

/// Where the lake lives on disk and how its prefixes are laid out.
#[derive(Debug, clap::Parser)]
pub(crate) struct LakeConfig {
    /// Directory holding the lake's objects
    #[clap(long = "data-dir", env = "MEDDRA_LAKE_DATA_DIR")]
    pub(crate) data_dir: String,

    /// Prefix under the data dir where converted partitions live
    #[clap(
        long = "output-prefix",
        env = "MEDDRA_LAKE_OUTPUT_PREFIX",
        default_value = "record_folders"
    )]
    pub(crate) output_prefix: String,

    /// Bucket name reported in the simulated trigger event
    #[clap(long = "bucket", env = "MEDDRA_LAKE_BUCKET", default_value = "local")]
    pub(crate) bucket: String,
}

impl LakeConfig {
    pub(crate) fn object_store(&self) -> Result<Arc<dyn ObjectStore>, object_store::Error> {
        Ok(Arc::new(LocalFileSystem::new_with_prefix(&self.data_dir)?))
    }
}
