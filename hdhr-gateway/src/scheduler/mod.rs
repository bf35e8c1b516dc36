//! Scheduled task management for hdhr-gateway.
//!
//! This module provides:
//! - [`RefreshScheduler`]: Periodic and on-demand refresh with coalescing

pub mod refresh_scheduler;

pub use refresh_scheduler::{RefreshScheduler, RefreshSchedulerConfig};
