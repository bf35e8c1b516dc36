//! JSON shapes of the device and cloud APIs, and the values the gateway
//! passes between pipeline stages.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Resolved tuner: where it lives and the token its guide data needs.
///
/// Fields are private so an identity cannot change after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    ip: String,
    auth_token: Option<String>,
}

impl DeviceIdentity {
    /// Create an identity. An empty token is stored as absent.
    pub fn new(ip: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            ip: ip.into(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Whether both the address and the auth token are known.
    pub fn is_complete(&self) -> bool {
        !self.ip.is_empty() && self.auth_token.is_some()
    }
}

/// One entry of `lineup.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Virtual channel number such as `10.1`.
    #[serde(rename = "GuideNumber", default, deserialize_with = "lenient_string")]
    pub guide_number: String,
    #[serde(rename = "GuideName", default = "unknown_name", deserialize_with = "guide_name")]
    pub guide_name: String,
    /// Stream URL; empty strings are read as absent.
    #[serde(
        rename = "URL",
        default,
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    /// The device reports this as `1`, `true` or omits it.
    #[serde(rename = "DRM", default, deserialize_with = "truthy")]
    pub drm: bool,
}

/// Channel lineup in device order.
pub type Lineup = Vec<Channel>;

/// One element of the cloud discovery list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudDevice {
    #[serde(rename = "LocalIP", default)]
    pub local_ip: Option<String>,
    #[serde(rename = "DeviceID", default)]
    pub device_id: Option<String>,
    #[serde(rename = "BaseURL", default)]
    pub base_url: Option<String>,
    #[serde(rename = "LineupURL", default)]
    pub lineup_url: Option<String>,
}

/// The device's `discover.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "DeviceAuth", default)]
    pub device_auth: Option<String>,
    #[serde(rename = "DeviceID", default)]
    pub device_id: Option<String>,
    #[serde(rename = "FriendlyName", default)]
    pub friendly_name: Option<String>,
    #[serde(rename = "ModelNumber", default)]
    pub model_number: Option<String>,
    #[serde(rename = "FirmwareVersion", default)]
    pub firmware_version: Option<String>,
    #[serde(rename = "TunerCount", default)]
    pub tuner_count: Option<u32>,
}

/// Result of one refresh cycle. Each flag is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub discovery_succeeded: bool,
    pub lineup_fetched: bool,
    pub playlist_written: bool,
    pub guide_written: bool,
}

impl RefreshOutcome {
    /// Overall success as reported to callers: both artifacts written.
    pub fn success(&self) -> bool {
        self.playlist_written && self.guide_written
    }
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(value).unwrap_or_default())
}

fn guide_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(value).unwrap_or_else(unknown_name))
}

fn non_empty_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(value).filter(|s| !s.is_empty()))
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    })
}
