//! Device discovery.
//!
//! # How It Works
//!
//! 1. A fixed discover request is broadcast over UDP and the first reply's
//!    source address is taken as the device IP
//! 2. Without a reply, the vendor cloud is asked for devices on this network
//!    and the first entry's `LocalIP` is used
//! 3. The device's `discover.json` is read for its `DeviceAuth` token
//!
//! The two lookups run strictly in sequence. A device found without a token
//! is still returned; the guide fetch will report the missing token.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use hdhr_protocol::{
    decode_discover_reply, encode_discover_request, CloudDevice, DeviceIdentity, DeviceInfo,
};
use log::{debug, error, info, warn};
use reqwest::Client;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::device::DeviceConfig;
use crate::error::{GatewayError, Result};
use crate::http::{device_base_url, get_ok, HttpError};

/// Resolves the tuner's address and auth token.
pub struct DiscoveryResolver {
    client: Client,
    config: DeviceConfig,
}

impl DiscoveryResolver {
    pub fn new(client: Client, config: DeviceConfig) -> Self {
        Self { client, config }
    }

    /// Locate the device and fetch its auth token.
    pub async fn resolve(&self) -> Result<DeviceIdentity> {
        let ip = match self.discover_via_udp().await {
            Some(ip) => ip,
            None => {
                info!("Discovery: UDP discovery failed, trying cloud API...");
                match self.discover_via_cloud().await {
                    Some(ip) => ip,
                    None => {
                        error!("Discovery: No device found");
                        return Err(GatewayError::DiscoveryNotFound);
                    }
                }
            }
        };

        info!("Discovery: Device found at {}", ip);
        let auth_token = self.fetch_device_auth(&ip).await;
        Ok(DeviceIdentity::new(ip, auth_token))
    }

    /// Broadcast a discover request and return the first responder's IP.
    pub async fn discover_via_udp(&self) -> Option<String> {
        match self.udp_probe().await {
            Ok(Some(ip)) => Some(ip),
            Ok(None) => {
                debug!(
                    "Discovery: No UDP reply within {:?}",
                    self.config.udp_timeout
                );
                None
            }
            Err(e) => {
                warn!("Discovery: UDP discovery error: {}", e);
                None
            }
        }
    }

    async fn udp_probe(&self) -> io::Result<Option<String>> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;

        let target = SocketAddr::from((self.config.broadcast_addr, self.config.discover_port));
        socket.send_to(&encode_discover_request(), target).await?;
        debug!("Discovery: Sent discover request to {}", target);

        let mut buf = [0u8; 1024];
        match timeout(self.config.udp_timeout, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, from))) => {
                // The reply body is informational only
                match decode_discover_reply(&buf[..len]) {
                    Ok(reply) => debug!(
                        "Discovery: Reply from {}: type={:?} id={:?}",
                        from,
                        reply.device_type,
                        reply.device_id.map(|id| format!("{:08X}", id))
                    ),
                    Err(e) => debug!("Discovery: Undecodable reply from {}: {}", from, e),
                }
                Ok(Some(from.ip().to_string()))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }

    /// Ask the vendor cloud for devices and return the first `LocalIP`.
    pub async fn discover_via_cloud(&self) -> Option<String> {
        match self.fetch_cloud_devices().await {
            Ok(devices) => {
                debug!("Discovery: Cloud API listed {} device(s)", devices.len());
                devices
                    .into_iter()
                    .next()
                    .and_then(|d| d.local_ip)
                    .filter(|ip| !ip.is_empty())
            }
            Err(e) => {
                warn!("Discovery: Cloud API discovery error: {}", e);
                None
            }
        }
    }

    async fn fetch_cloud_devices(&self) -> std::result::Result<Vec<CloudDevice>, HttpError> {
        let response = get_ok(
            &self.client,
            &self.config.cloud_discover_url,
            self.config.http_timeout,
        )
        .await?;
        Ok(response.json().await?)
    }

    /// Read `DeviceAuth` from the device's `discover.json`.
    pub async fn fetch_device_auth(&self, ip: &str) -> Option<String> {
        let url = format!("{}/discover.json", device_base_url(ip, self.config.http_port));

        let info = match get_ok(&self.client, &url, self.config.http_timeout).await {
            Ok(response) => match response.json::<DeviceInfo>().await {
                Ok(info) => info,
                Err(e) => {
                    warn!("Discovery: Invalid discover.json: {}", e);
                    return None;
                }
            },
            Err(e) => {
                warn!("Discovery: Failed to fetch discover.json: {}", e);
                return None;
            }
        };

        info!(
            "Discovery: Device {} ({}, firmware {}, {} tuners)",
            info.device_id.as_deref().unwrap_or("?"),
            info.model_number
                .as_deref()
                .or(info.friendly_name.as_deref())
                .unwrap_or("unknown model"),
            info.firmware_version.as_deref().unwrap_or("?"),
            info.tuner_count.unwrap_or(0)
        );

        match info.device_auth.filter(|auth| !auth.is_empty()) {
            Some(auth) => {
                debug!("Discovery: DeviceAuth retrieved ({} chars)", auth.len());
                Some(auth)
            }
            None => {
                warn!("Discovery: DeviceAuth not found in discover.json");
                None
            }
        }
    }
}
