mod config;
mod error;
mod upload;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use tracing::{error, info};

use config::UploadConfig;

/// Periodically push local sorting records to the remote collection
/// endpoint.
#[derive(Debug, Parser)]
#[command(name = "sortbot-uploader", version)]
struct Args {
    /// Path to the sorting database
    #[arg(long, default_value = "data/sorting_data.db")]
    db: PathBuf,

    /// Path to the uploader config / watermark file
    #[arg(long, default_value = "upload_config.json")]
    config: PathBuf,

    /// Keep running, uploading on the configured interval
    #[arg(long)]
    daemon: bool,

    /// Upload even when no new events are past the watermark
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sortbot_uploader=info".into()),
        )
        .init();

    let args = Args::parse();

    if !args.db.exists() {
        bail!("database file not found: {}", args.db.display());
    }
    let db = sortbot_db::Database::open(&args.db)?;

    let mut config = UploadConfig::load_or_create(&args.config)?;
    let client = upload::build_client()?;

    if args.daemon {
        let interval = Duration::from_secs(config.upload_interval_minutes * 60);
        info!(
            "Starting daemon mode (interval: {} minutes)",
            config.upload_interval_minutes
        );

        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) =
                upload::run_cycle(&client, &db, &mut config, &args.config, args.force).await
            {
                error!("Upload cycle error: {e:#}");
            }
        }
    }

    let succeeded = upload::run_cycle(&client, &db, &mut config, &args.config, args.force).await?;
    if !succeeded {
        bail!("upload failed after {} attempts", config.retry_attempts);
    }
    Ok(())
}
