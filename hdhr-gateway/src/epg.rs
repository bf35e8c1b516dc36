//! XMLTV guide retrieval and validation.

use std::time::Duration;

use log::{info, warn};
use reqwest::{Client, Url};

use crate::error::{GatewayError, Result};
use crate::http::get_ok;

/// Vendor endpoint serving XMLTV for a device.
pub const DEFAULT_GUIDE_URL: &str = "http://api.hdhomerun.com/api/xmltv";

/// Guide bodies shorter than this are rejected.
pub const MIN_GUIDE_SIZE: usize = 100;

/// Validated guide document, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideArtifact {
    pub contents: String,
}

/// Fetches the guide from the vendor API using the device's auth token.
pub struct EpgFetcher {
    client: Client,
    guide_url: String,
    timeout: Duration,
}

impl EpgFetcher {
    pub fn new(client: Client, guide_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            guide_url: guide_url.into(),
            timeout,
        }
    }

    /// Fetch the guide and validate it. No request is made without a token.
    pub async fn fetch_and_validate(&self, auth_token: Option<&str>) -> Result<GuideArtifact> {
        let token = match auth_token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(GatewayError::AuthMissing),
        };

        let url = Url::parse_with_params(&self.guide_url, &[("DeviceAuth", token)])
            .map_err(|e| GatewayError::GuideFetch(format!("invalid guide URL: {}", e)))?;
        info!("Epg: Fetching guide data from {}", self.guide_url);

        let response = get_ok(&self.client, url.as_str(), self.timeout)
            .await
            .map_err(|e| GatewayError::GuideFetch(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::GuideFetch(e.to_string()))?;

        validate_guide(body)
    }
}

/// Reject bodies that are too small or do not open with an XML declaration.
pub fn validate_guide(body: String) -> Result<GuideArtifact> {
    if body.len() < MIN_GUIDE_SIZE {
        warn!("Epg: Guide data appears to be empty or invalid ({} bytes)", body.len());
        return Err(GatewayError::GuideEmptyOrTooSmall(body.len()));
    }
    if !body.trim_start().starts_with("<?xml") {
        warn!("Epg: Guide data does not appear to be valid XML");
        return Err(GatewayError::GuideNotXml);
    }
    Ok(GuideArtifact { contents: body })
}
