//! Access to the tuner device and the vendor discovery cloud.
//!
//! This module provides:
//! - [`DiscoveryResolver`]: locate the device and read its auth token
//! - [`LineupFetcher`]: read the device's channel lineup

pub mod discovery;
pub mod lineup;

use std::net::Ipv4Addr;
use std::time::Duration;

use hdhr_protocol::DISCOVER_PORT;

pub use discovery::DiscoveryResolver;
pub use lineup::LineupFetcher;

/// Cloud endpoint listing devices seen from this public address.
pub const DEFAULT_CLOUD_DISCOVER_URL: &str = "http://ipv4-api.hdhomerun.com/discover";

/// Device and discovery settings.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Destination of the UDP discovery broadcast.
    pub broadcast_addr: Ipv4Addr,
    /// UDP port of the discovery broadcast.
    pub discover_port: u16,
    /// How long to wait for a UDP reply.
    pub udp_timeout: Duration,
    /// Cloud discovery fallback endpoint.
    pub cloud_discover_url: String,
    /// Port of the device's HTTP API.
    pub http_port: u16,
    /// Timeout for cloud, `discover.json` and `lineup.json` requests.
    pub http_timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            broadcast_addr: Ipv4Addr::BROADCAST,
            discover_port: DISCOVER_PORT,
            udp_timeout: Duration::from_secs(3),
            cloud_discover_url: DEFAULT_CLOUD_DISCOVER_URL.to_string(),
            http_port: 80,
            http_timeout: Duration::from_secs(5),
        }
    }
}
