//! tracerlog headless host entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Pipe stdin lines through an intercepted console and flush them as traces.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (defaults to the platform config path).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Page location recorded in every entry.
    #[arg(long)]
    url: Option<String>,

    /// Directory receiving exported log files.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Buffer length that triggers a flush.
    #[arg(long)]
    limit: Option<usize>,

    /// Export every flush as a file.
    #[arg(long)]
    save_file: bool,

    /// Also print intercepted calls through the log output.
    #[arg(long)]
    pass_through: bool,
}

impl Args {
    fn apply(&self, config: &mut config::Config) {
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if let Some(limit) = self.limit {
            config.tracer.limit = limit;
        }
        config.tracer.save_file |= self.save_file;
        config.tracer.pass_through |= self.pass_through;
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting tracerlog");

    let mut config = config::Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    tracing::info!(url = %config.url, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("page unloaded cleanly");
    Ok(())
}
