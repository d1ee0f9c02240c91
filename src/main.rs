//! # Story Miner
//!
//! A background job that polls a ranked story feed (Hacker News by default),
//! enriches every story it has not seen before with an Open Graph preview
//! image and a short description scraped from the linked page, and uploads
//! the batch to an ingestion endpoint.
//!
//! ## Usage
//!
//! ```sh
//! story_miner -c config/default.yaml
//! story_miner --once
//! ```
//!
//! ## Architecture
//!
//! Each cycle is a straight pipeline:
//! 1. **List**: fetch the top-story ids
//! 2. **Filter**: drop ids recorded in the ledger, cap at the batch size
//! 3. **Fetch**: download item records, then linked pages (concurrently)
//! 4. **Format**: scrape preview fields and build upload records
//! 5. **Upload**: POST the batch, then record every attempted id
//!
//! A scheduler runs one cycle per configured interval and halts for good once
//! the top-stories request has failed `request.retries` times in a row.

use clap::Parser;
use std::error::Error;
use tracing::{error, info};

mod cli;
mod config;
mod error;
mod format;
mod http;
mod ledger;
mod logging;
mod models;
mod pipeline;
mod retry;
mod scheduler;
mod scrapers;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use config::Config;
use http::ReqwestClient;
use pipeline::{CycleOutcome, Pipeline};
use scheduler::{Scheduler, StopReason};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    // --- Tracing init ---
    // Console only until the config says where the log files go.
    let bootstrap = logging::bootstrap();

    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    if let Err(e) = ensure_writable_dir(&config.logger.dir).await {
        error!(
            path = %config.logger.dir.display(),
            error = %e,
            "Log directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    let _log_guard = match logging::init(&config.logger) {
        Ok(guard) => guard,
        Err(e) => {
            error!(error = %e, "Could not set up file logging");
            return Err(e);
        }
    };
    drop(bootstrap);

    let top_stories = config.top_stories_url()?;
    let log_dir = config.logger.dir.display().to_string();
    info!(
        source = %config.source.name,
        %top_stories,
        upload = %config.upload.url,
        interval_secs = config.request.interval_secs,
        batch_size = config.request.batch_size,
        %log_dir,
        "story_miner starting up"
    );

    // Early check: without a writable ledger every story would be re-uploaded each cycle.
    if let Err(e) = ensure_writable_dir(&config.ledger.dir).await {
        error!(
            path = %config.ledger.dir.display(),
            error = %e,
            "Ledger directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let client = ReqwestClient::new(&config)?;
    let period = config.interval();
    let mut scheduler = Scheduler::new(Pipeline::new(client, config), period);
    info!(
        ledger = %scheduler.pipeline().ledger().path().display(),
        retries = scheduler.pipeline().governor().remaining(),
        "Pipeline ready"
    );

    if args.once {
        return match scheduler.tick().await {
            Some(CycleOutcome::Finished(_)) => {
                info!("Single cycle finished");
                Ok(())
            }
            _ => Err("top stories list could not be fetched".into()),
        };
    }

    match scheduler.run().await {
        StopReason::Shutdown => {
            info!("story_miner stopped");
            Ok(())
        }
        StopReason::Exhausted => {
            error!(halted = scheduler.is_halted(), "Retries maxed out; polling halted");
            Err("retries maxed out; polling halted".into())
        }
    }
}

/// Read the config file, apply command-line overrides, then validate.
async fn load_config(args: &Cli) -> error::Result<Config> {
    let mut config = Config::load(args.config.as_deref()).await?;
    if let Some(dir) = &args.ledger_dir {
        config.ledger.dir = dir.clone();
    }
    if let Some(url) = &args.upload_url {
        config.upload.url = url.clone();
    }
    config.validate()?;
    Ok(config)
}
