//! M3U playlist generation from the device lineup.

use hdhr_protocol::Channel;
use log::{debug, info};

use crate::error::{GatewayError, Result};

/// Header line every playlist starts with.
pub const M3U_HEADER: &str = "#EXTM3U";

/// Port of the device's streaming endpoint.
pub const STREAM_PORT: u16 = 5004;

/// Rendered playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistArtifact {
    pub contents: String,
    /// Number of channel entries emitted.
    pub channel_count: usize,
}

/// Renders a lineup into an M3U playlist.
#[derive(Debug, Clone, Default)]
pub struct PlaylistGenerator {
    /// Guide URL advertised to players via `url-tvg`.
    guide_url: Option<String>,
}

impl PlaylistGenerator {
    pub fn new(guide_url: Option<String>) -> Self {
        Self { guide_url }
    }

    /// Render the playlist.
    ///
    /// DRM channels are dropped. A channel without a URL gets one built from
    /// its guide number, or is dropped when it has neither.
    pub fn generate(&self, lineup: &[Channel], device_ip: &str) -> Result<PlaylistArtifact> {
        if lineup.is_empty() {
            return Err(GatewayError::EmptyLineup);
        }

        let mut lines = vec![self.header()];
        let mut channel_count = 0;

        for channel in lineup {
            if channel.drm {
                debug!("Playlist: Skipping DRM channel {}", channel.guide_name);
                continue;
            }

            let url = match stream_url(channel, device_ip) {
                Some(url) => url,
                None => {
                    debug!(
                        "Playlist: Skipping {} (no URL or guide number)",
                        channel.guide_name
                    );
                    continue;
                }
            };

            lines.push(format!(
                "#EXTINF:-1 tvg-id=\"{num}\" tvg-name=\"{name}\" tvg-chno=\"{num}\",{name}",
                num = channel.guide_number,
                name = channel.guide_name,
            ));
            lines.push(url);
            channel_count += 1;
        }

        info!(
            "Playlist: Generated {} of {} channels",
            channel_count,
            lineup.len()
        );

        Ok(PlaylistArtifact {
            contents: lines.join("\n"),
            channel_count,
        })
    }

    fn header(&self) -> String {
        match &self.guide_url {
            Some(url) => format!("{} url-tvg=\"{}\"", M3U_HEADER, url),
            None => M3U_HEADER.to_string(),
        }
    }
}

/// The channel's own URL, else the device stream URL for its guide number.
pub fn stream_url(channel: &Channel, device_ip: &str) -> Option<String> {
    if let Some(url) = channel.url.as_deref().filter(|u| !u.is_empty()) {
        return Some(url.to_string());
    }
    if channel.guide_number.is_empty() {
        return None;
    }
    Some(format!(
        "http://{}:{}/auto/v{}",
        device_ip, STREAM_PORT, channel.guide_number
    ))
}
