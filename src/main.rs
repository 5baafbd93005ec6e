use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use teia_status::{Settings, StatusChecker};

#[derive(Parser, Debug)]
#[command(name = "teia-status")]
#[command(about = "Health checker for the services backing teia.art")]
#[command(version)]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between check cycles (overrides the settings file)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Run a single cycle, print the report, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref())?;
    if args.interval.is_some() {
        settings.interval_secs = args.interval;
    }

    let checker = StatusChecker::new(&settings);

    if args.once {
        checker.run_cycle().await;
        println!("{}", checker.status());
        return Ok(());
    }

    info!(
        interval_secs = settings.interval().as_secs(),
        "starting status checks"
    );
    checker.start();
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
