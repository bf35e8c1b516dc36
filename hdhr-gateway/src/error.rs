//! Error types for the refresh pipeline.

use thiserror::Error;

/// Failures of the individual pipeline stages.
///
/// None of these are fatal; the orchestrator logs them where they occur and
/// folds them into a [`hdhr_protocol::RefreshOutcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Neither UDP broadcast nor cloud discovery found a device.
    #[error("No tuner device found via UDP broadcast or cloud discovery")]
    DiscoveryNotFound,

    /// No device auth token is available for the guide request.
    #[error("No device auth token available")]
    AuthMissing,

    /// The lineup request failed.
    #[error("Failed to fetch lineup: {0}")]
    LineupFetch(String),

    /// The lineup contained no channels.
    #[error("Lineup is empty")]
    EmptyLineup,

    /// The guide request failed.
    #[error("Failed to fetch guide data: {0}")]
    GuideFetch(String),

    /// The guide body is below the minimum size.
    #[error("Guide data is empty or too small ({0} bytes)")]
    GuideEmptyOrTooSmall(usize),

    /// The guide body does not start with an XML declaration.
    #[error("Guide data does not start with an XML declaration")]
    GuideNotXml,

    /// An artifact could not be committed to disk.
    #[error("Failed to write {artifact}: {reason}")]
    ArtifactWrite {
        artifact: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, GatewayError>;
