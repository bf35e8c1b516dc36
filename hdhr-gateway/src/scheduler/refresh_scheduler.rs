//! Periodic refresh scheduler.
//!
//! Keeps the playlist and guide current by running the refresh pipeline on a
//! fixed interval and whenever a client asks for it.
//!
//! # How It Works
//!
//! 1. The scheduler runs as a background task, refreshing once at start and
//!    then every `interval`
//! 2. [`RefreshScheduler::trigger`] starts a run unless one is in flight, in
//!    which case it waits for that run and returns its outcome
//! 3. Each run executes in its own task, holding the identity cache lock
//!    from start to finish
//! 4. When the run ends it publishes a [`RefreshReport`] and a
//!    [`DeviceStatus`] for the status endpoint
//!
//! # Configuration
//!
//! - `interval`: Time between scheduled refreshes
//! - `rediscover_after_failures`: Forget the cached device after this many
//!   consecutive lineup failures (0 = never)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use hdhr_protocol::{DeviceIdentity, RefreshOutcome};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};

use crate::refresh::RefreshOrchestrator;

/// Refresh scheduler configuration.
#[derive(Debug, Clone)]
pub struct RefreshSchedulerConfig {
    /// Interval between scheduled refreshes.
    pub interval: Duration,
    /// Consecutive lineup failures before the cached device is dropped.
    pub rediscover_after_failures: u32,
}

impl Default for RefreshSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(4 * 60 * 60),
            rediscover_after_failures: 0,
        }
    }
}

/// Refresh scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Scheduler loop is running.
    Running,
    /// Scheduler loop has been asked to stop.
    Stopped,
}

/// Result of the most recent completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub outcome: RefreshOutcome,
    /// Unix timestamp (seconds) of completion.
    pub completed_at: i64,
    pub duration_ms: u64,
}

/// Device as last seen by a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub device_ip: Option<String>,
    pub has_auth_token: bool,
}

#[derive(Debug, Default)]
struct IdentityCache {
    identity: Option<DeviceIdentity>,
    consecutive_failures: u32,
}

type OutcomeReceiver = watch::Receiver<Option<RefreshOutcome>>;

/// Periodic and on-demand refresh scheduler.
pub struct RefreshScheduler {
    /// Pipeline stages.
    orchestrator: RefreshOrchestrator,
    /// Configuration.
    config: RefreshSchedulerConfig,
    /// Device identity shared across runs.
    cache: Mutex<IdentityCache>,
    /// Completion signal of the run in flight, if any.
    in_flight: std::sync::Mutex<Option<OutcomeReceiver>>,
    last_report: RwLock<Option<RefreshReport>>,
    device_status: RwLock<DeviceStatus>,
    /// Shutdown signal for the scheduler loop.
    shutdown: watch::Sender<bool>,
    /// Number of pipeline executions so far.
    run_count: AtomicU64,
}

impl RefreshScheduler {
    /// Create a new refresh scheduler.
    pub fn new(orchestrator: RefreshOrchestrator, config: RefreshSchedulerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            orchestrator,
            config,
            cache: Mutex::new(IdentityCache::default()),
            in_flight: std::sync::Mutex::new(None),
            last_report: RwLock::new(None),
            device_status: RwLock::new(DeviceStatus::default()),
            shutdown,
            run_count: AtomicU64::new(0),
        }
    }

    /// Start the scheduler background task.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop.
    async fn run(self: Arc<Self>) {
        info!(
            "RefreshScheduler: Starting with refresh interval {:?}",
            self.config.interval
        );

        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.state() == SchedulerState::Stopped {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("RefreshScheduler: Scheduled refresh due");
                    self.trigger().await;
                }
                _ = shutdown.changed() => {}
            }
        }

        info!("RefreshScheduler: Stopped");
    }

    /// Run a refresh now, or join the one already in flight.
    #[allow(clippy::let_and_return)]
    pub async fn trigger(self: &Arc<Self>) -> RefreshOutcome {
        let mut completion = self.join_or_spawn();
        // Bound to a local so the borrowed value drops before `completion`
        let outcome = match completion.wait_for(Option::is_some).await {
            Ok(value) => (*value).unwrap_or_default(),
            Err(_) => {
                warn!("RefreshScheduler: Refresh task ended without an outcome");
                RefreshOutcome::default()
            }
        };
        outcome
    }

    fn join_or_spawn(self: &Arc<Self>) -> OutcomeReceiver {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        // A closed sender means the run died without clearing its slot
        if let Some(existing) = slot.as_ref().filter(|rx| rx.has_changed().is_ok()) {
            debug!("RefreshScheduler: Refresh already in progress, joining it");
            return existing.clone();
        }

        let (tx, rx) = watch::channel(None);
        *slot = Some(rx.clone());
        drop(slot);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = this.run_pipeline().await;
            this.in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            let _ = tx.send(Some(outcome));
        });

        rx
    }

    async fn run_pipeline(&self) -> RefreshOutcome {
        let started = Instant::now();
        let mut cache = self.cache.lock().await;

        let outcome = self.orchestrator.refresh(&mut cache.identity).await;
        self.apply_staleness_policy(&mut cache, &outcome);

        let status = DeviceStatus {
            device_ip: cache.identity.as_ref().map(|id| id.ip().to_string()),
            has_auth_token: cache.identity.as_ref().is_some_and(DeviceIdentity::is_complete),
        };
        drop(cache);

        self.run_count.fetch_add(1, Ordering::SeqCst);
        *self.device_status.write().await = status;
        *self.last_report.write().await = Some(RefreshReport {
            outcome,
            completed_at: chrono::Utc::now().timestamp(),
            duration_ms: started.elapsed().as_millis() as u64,
        });

        outcome
    }

    fn apply_staleness_policy(&self, cache: &mut IdentityCache, outcome: &RefreshOutcome) {
        if outcome.lineup_fetched {
            cache.consecutive_failures = 0;
            return;
        }
        if !outcome.discovery_succeeded {
            return;
        }

        cache.consecutive_failures += 1;
        let limit = self.config.rediscover_after_failures;
        if limit > 0 && cache.consecutive_failures >= limit {
            warn!(
                "RefreshScheduler: Lineup failed {} times in a row, forgetting cached device",
                cache.consecutive_failures
            );
            cache.identity = None;
            cache.consecutive_failures = 0;
        }
    }

    /// Stop the scheduler loop. A run in flight is allowed to finish.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
        info!("RefreshScheduler: Stop requested");
    }

    /// Get the current scheduler state.
    pub fn state(&self) -> SchedulerState {
        if *self.shutdown.borrow() {
            SchedulerState::Stopped
        } else {
            SchedulerState::Running
        }
    }

    pub async fn last_report(&self) -> Option<RefreshReport> {
        *self.last_report.read().await
    }

    pub async fn device_status(&self) -> DeviceStatus {
        self.device_status.read().await.clone()
    }

    /// Number of pipeline executions so far.
    pub fn run_count(&self) -> u64 {
        self.run_count.load(Ordering::SeqCst)
    }
}
