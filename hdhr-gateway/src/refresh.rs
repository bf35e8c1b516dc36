//! One refresh cycle: discovery, lineup, playlist, guide.
//!
//! Stages run in order and report into a [`RefreshOutcome`]. A failing stage
//! never aborts an unrelated one: a dead lineup endpoint does not stop the
//! guide fetch, and a bad guide leaves a freshly written playlist in place.

use std::time::Instant;

use hdhr_protocol::{Channel, DeviceIdentity, RefreshOutcome};
use log::{error, info, warn};

use crate::device::{DiscoveryResolver, LineupFetcher};
use crate::epg::EpgFetcher;
use crate::error::Result;
use crate::output::{Artifact, ArtifactStore, PlaylistGenerator};

/// Sequences the pipeline stages against a caller-owned identity cache.
pub struct RefreshOrchestrator {
    resolver: DiscoveryResolver,
    lineup: LineupFetcher,
    playlist: PlaylistGenerator,
    epg: EpgFetcher,
    store: ArtifactStore,
}

impl RefreshOrchestrator {
    pub fn new(
        resolver: DiscoveryResolver,
        lineup: LineupFetcher,
        playlist: PlaylistGenerator,
        epg: EpgFetcher,
        store: ArtifactStore,
    ) -> Self {
        Self {
            resolver,
            lineup,
            playlist,
            epg,
            store,
        }
    }

    /// Run one refresh cycle.
    ///
    /// Discovery runs only when `cache` is empty or lacks an auth token. A
    /// failed rediscovery keeps a previously known address. Nothing here
    /// clears the cache.
    pub async fn refresh(&self, cache: &mut Option<DeviceIdentity>) -> RefreshOutcome {
        let started = Instant::now();
        let mut outcome = RefreshOutcome::default();
        info!("Refresh: Starting data update");

        if !cache.as_ref().is_some_and(DeviceIdentity::is_complete) {
            info!("Refresh: Discovering device...");
            match self.resolver.resolve().await {
                Ok(identity) => *cache = Some(identity),
                Err(e) => match cache.as_ref() {
                    Some(previous) => warn!(
                        "Refresh: {}; keeping previously resolved device {}",
                        e,
                        previous.ip()
                    ),
                    None => error!("Refresh: {}", e),
                },
            }
        }

        let identity = match cache.as_ref() {
            Some(identity) => identity,
            None => {
                error!("Refresh: Could not discover a tuner device, skipping update");
                return outcome;
            }
        };
        outcome.discovery_succeeded = true;

        match self.lineup.fetch_lineup(identity.ip()).await {
            Ok(lineup) => {
                outcome.lineup_fetched = true;
                match self.write_playlist(&lineup, identity.ip()).await {
                    Ok(count) => {
                        outcome.playlist_written = true;
                        info!("Refresh: Playlist stage done ({} channels)", count);
                    }
                    Err(e) => error!("Refresh: Playlist stage failed: {}", e),
                }
            }
            Err(e) => error!("Refresh: {}", e),
        }

        match self.write_guide(identity.auth_token()).await {
            Ok(size) => {
                outcome.guide_written = true;
                info!("Refresh: Guide stage done ({} bytes)", size);
            }
            Err(e) => error!("Refresh: Guide stage failed: {}", e),
        }

        if outcome.success() {
            info!(
                "Refresh: Data update completed successfully in {:?}",
                started.elapsed()
            );
        } else {
            warn!(
                "Refresh: Data update completed with errors in {:?} ({:?})",
                started.elapsed(),
                outcome
            );
        }
        outcome
    }

    async fn write_playlist(&self, lineup: &[Channel], device_ip: &str) -> Result<usize> {
        let artifact = self.playlist.generate(lineup, device_ip)?;
        self.store.commit(Artifact::Playlist, &artifact.contents).await?;
        Ok(artifact.channel_count)
    }

    async fn write_guide(&self, auth_token: Option<&str>) -> Result<usize> {
        let artifact = self.epg.fetch_and_validate(auth_token).await?;
        self.store.commit(Artifact::Guide, &artifact.contents).await?;
        Ok(artifact.contents.len())
    }
}
