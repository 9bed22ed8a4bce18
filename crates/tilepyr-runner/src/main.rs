//! `tilepyr` - ingest tile records into MBTiles containers.

use anyhow::Result;
use clap::Parser;
use tilepyr_runner::{Cli, LogFormat};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    tilepyr_metrics::describe_metrics();

    let reports = cli.execute()?;
    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }
    Ok(())
}
