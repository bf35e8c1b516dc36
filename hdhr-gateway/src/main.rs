//! hdhr-gateway: Bridges an HDHomeRun tuner into IPTV players.
//!
//! The gateway discovers the tuner on the local network, turns its channel
//! lineup into an M3U playlist, fetches the XMLTV guide from the vendor API
//! and serves both over HTTP, refreshing them on a schedule.

use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::sync::watch;

mod config;
mod device;
mod epg;
mod error;
mod http;
mod logging;
mod output;
mod refresh;
mod scheduler;
mod web;

#[cfg(test)]
mod test_support;

use config::{Args, ConfigFile, Settings};
use device::{DiscoveryResolver, LineupFetcher};
use epg::EpgFetcher;
use output::{ArtifactStore, PlaylistGenerator};
use refresh::RefreshOrchestrator;
use scheduler::RefreshScheduler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config file: explicit path > auto-detect > default
    let file_config = match config::config_path(&args) {
        Some(path) => match config::load_config(&path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e.into());
            }
        },
        None => ConfigFile::default(),
    };
    let settings = Settings::resolve(&args, file_config)?;

    logging::init_logging(
        &settings.log_dir,
        settings.log_retention_days,
        settings.verbose,
        settings.log_level.as_deref(),
    )?;

    info!("hdhr-gateway starting...");
    info!("  Listen address: {}", settings.listen);
    info!("  Refresh interval: {:?}", settings.refresh.interval);
    info!(
        "  Discovery: {}:{}",
        settings.device.broadcast_addr, settings.device.discover_port
    );

    let store = ArtifactStore::new(&settings.output_dir);
    info!("  Output directory: {}", store.dir().display());
    if let Err(e) = store.ensure_dir().await {
        error!("Failed to create output directory: {}", e);
        return Err(e.into());
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("hdhr-gateway/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let orchestrator = RefreshOrchestrator::new(
        DiscoveryResolver::new(client.clone(), settings.device.clone()),
        LineupFetcher::new(client.clone(), &settings.device),
        PlaylistGenerator::new(settings.advertised_guide_url()),
        EpgFetcher::new(client, settings.guide_url.clone(), settings.guide_timeout),
        store.clone(),
    );

    let scheduler = Arc::new(RefreshScheduler::new(orchestrator, settings.refresh.clone()));
    let scheduler_task = Arc::clone(&scheduler).start();

    let listener = match web::bind_listener(settings.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", settings.listen, e);
            scheduler.stop();
            let _ = scheduler_task.await;
            return Err(e.into());
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let web_state = web::WebState::new(Arc::clone(&scheduler), store);
    let mut web_task = tokio::spawn(web::start_web_server(listener, web_state, shutdown_rx));

    let web_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
            web_task.await
        }
        result = &mut web_task => {
            error!("Web server exited unexpectedly");
            result
        }
    };

    scheduler.stop();
    let _ = scheduler_task.await;

    match web_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Web server error: {}", e);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    info!("hdhr-gateway stopped");
    Ok(())
}
