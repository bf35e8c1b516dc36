//! Wire types for HDHomeRun tuner discovery and device APIs.
//!
//! This crate defines the data exchanged with an HDHomeRun-style tuner and
//! the vendor cloud, without performing any I/O itself:
//!
//! - [`discovery`]: the UDP discovery packet codec
//! - [`types`]: JSON shapes for `discover.json`, `lineup.json` and the cloud
//!   discovery list, plus the [`DeviceIdentity`] and [`RefreshOutcome`] values
//!   shared by the gateway
//!
//! # Example
//!
//! ```rust
//! use hdhr_protocol::{encode_discover_request, Channel, DISCOVER_REQUEST_SIZE};
//!
//! let packet = encode_discover_request();
//! assert_eq!(packet.len(), DISCOVER_REQUEST_SIZE);
//!
//! let lineup: Vec<Channel> = serde_json::from_str(
//!     r#"[{"GuideNumber":"2.1","GuideName":"NEWS","URL":"http://10.0.0.9:5004/auto/v2.1"}]"#,
//! ).unwrap();
//! assert_eq!(lineup[0].guide_name, "NEWS");
//! assert!(!lineup[0].drm);
//! ```

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    decode_discover_reply, encode_discover_request, DiscoverReply, DEVICE_TYPE_TUNER,
    DISCOVER_PORT, DISCOVER_REQUEST_SIZE, TYPE_DISCOVER_REPLY, TYPE_DISCOVER_REQUEST,
};
pub use error::ProtocolError;
pub use types::{Channel, CloudDevice, DeviceIdentity, DeviceInfo, Lineup, RefreshOutcome};
