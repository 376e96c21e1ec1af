//! Entrypoint of the meddra_lake binary

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands {
    pub(crate) mod catalog;
    pub(crate) mod common;
    pub(crate) mod convert;
}

enum ReturnCode {
    Failure = 1,
}

#[derive(Debug, clap::Parser)]
#[clap(
    name = "meddra_lake",
    about = "MedDRA version-partitioned record lake tools",
    long_about = r#"MedDRA version-partitioned record lake tools

Examples:
    # Convert a raw CSV extract into per-version Parquet partitions
    meddra_lake convert --data-dir ~/.meddra_lake incoming/meddra_terms.csv

    # Bring the catalog in line with the partitions present in storage
    meddra_lake catalog-sync --data-dir ~/.meddra_lake

    # Run with debug logging
    LOG_FILTER=debug meddra_lake catalog-sync --data-dir ~/.meddra_lake
"#
)]
struct Config {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Convert one raw CSV object into version-partitioned Parquet files
    Convert(commands::convert::Config),

    /// Make catalog partition metadata match what storage contains
    CatalogSync(commands::catalog::Config),
}

fn main() -> Result<(), std::io::Error> {
    init_logging();
    let config = Config::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        match config.command {
            None => {
                eprintln!("command required, --help for more information");
                std::process::exit(ReturnCode::Failure as _)
            }
            Some(Command::Convert(config)) => {
                if let Err(error) = commands::convert::command(config).await {
                    eprintln!("Convert command failed: {error}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
            Some(Command::CatalogSync(config)) => {
                if let Err(error) = commands::catalog::command(config).await {
                    eprintln!("Catalog-sync command failed: {error}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
        }
    });
    Ok(())
}

/// Logging goes to stderr, filtered by the `LOG_FILTER` environment
/// variable, `info` when unset.
fn init_logging() {
    let filter = EnvFilter::try_from_env("LOG_FILTER").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
