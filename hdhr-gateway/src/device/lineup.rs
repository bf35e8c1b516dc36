//! Channel lineup retrieval.

use std::time::Duration;

use hdhr_protocol::Lineup;
use log::{debug, info};
use reqwest::Client;

use crate::device::DeviceConfig;
use crate::error::{GatewayError, Result};
use crate::http::{device_base_url, get_ok};

/// Reads `lineup.json` from the device. One attempt, no pagination.
pub struct LineupFetcher {
    client: Client,
    http_port: u16,
    timeout: Duration,
}

impl LineupFetcher {
    pub fn new(client: Client, config: &DeviceConfig) -> Self {
        Self {
            client,
            http_port: config.http_port,
            timeout: config.http_timeout,
        }
    }

    /// Fetch the lineup in device order.
    pub async fn fetch_lineup(&self, ip: &str) -> Result<Lineup> {
        let url = format!("{}/lineup.json", device_base_url(ip, self.http_port));
        debug!("Lineup: GET {}", url);

        let response = get_ok(&self.client, &url, self.timeout)
            .await
            .map_err(|e| GatewayError::LineupFetch(e.to_string()))?;
        let lineup: Lineup = response
            .json()
            .await
            .map_err(|e| GatewayError::LineupFetch(format!("invalid lineup.json: {}", e)))?;

        info!("Lineup: Retrieved {} channels", lineup.len());
        Ok(lineup)
    }
}
