//! Request state tracking.
//!
//! Every fetch and send attempt reports here. The tracker keeps, per logical
//! service, the latest status, when it was last touched, and how many attempts
//! succeeded or failed. A background task logs a snapshot periodically.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Logical services observed by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Service {
    ListingSource,
    DetailSource,
    Notifier,
}

impl Service {
    pub const ALL: [Service; 3] = [Self::ListingSource, Self::DetailSource, Self::Notifier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListingSource => "listing-source",
            Self::DetailSource => "detail-source",
            Self::Notifier => "notifier",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known status of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Idle,
    Fetching,
    Sending,
    Completed,
    Error,
}

impl ServiceStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Sending => "sending",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-service counters and last status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceState {
    pub status: ServiceStatus,
    pub last_attempt: Option<DateTime<Utc>>,
    pub success_count: u64,
    pub error_count: u64,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            status: ServiceStatus::Idle,
            last_attempt: None,
            success_count: 0,
            error_count: 0,
        }
    }
}

/// Shared handle to the request state map.
///
/// Clones share the same state. Updates are synchronous and the lock is never
/// held across an `.await`.
#[derive(Debug, Clone)]
pub struct RequestTracker {
    inner: Arc<Mutex<BTreeMap<Service, ServiceState>>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        let states: BTreeMap<Service, ServiceState> = Service::ALL
            .into_iter()
            .map(|service| (service, ServiceState::default()))
            .collect();
        Self {
            inner: Arc::new(Mutex::new(states)),
        }
    }

    /// Record an attempt transition.
    ///
    /// `Completed` counts a success and `Error` counts a failure; in-flight
    /// statuses only move the status and timestamp.
    pub fn record(&self, service: Service, status: ServiceStatus) {
        let mut states = self.lock();
        let state = states.entry(service).or_default();
        state.status = status;
        state.last_attempt = Some(Utc::now());
        match status {
            ServiceStatus::Completed => state.success_count += 1,
            ServiceStatus::Error => state.error_count += 1,
            _ => {}
        }
    }

    /// Copy of the current state of every service.
    pub fn snapshot(&self) -> BTreeMap<Service, ServiceState> {
        self.lock().clone()
    }

    /// Copy of the current state of one service.
    pub fn state(&self, service: Service) -> ServiceState {
        self.lock().get(&service).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Service, ServiceState>> {
        // Updates are single assignments, so a poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a snapshot as one log line per service.
pub fn format_snapshot(snapshot: &BTreeMap<Service, ServiceState>) -> Vec<String> {
    snapshot
        .iter()
        .map(|(service, state)| {
            let last = state
                .last_attempt
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string());
            format!(
                "{service}: status={} ok={} err={} last={last}",
                state.status, state.success_count, state.error_count
            )
        })
        .collect()
}

/// Spawn the periodic snapshot logger.
///
/// The task only reads the tracker. It checks `token` at every sleep and
/// returns as soon as it is cancelled.
pub fn spawn_snapshot_logger(
    tracker: RequestTracker,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    for line in format_snapshot(&tracker.snapshot()) {
                        log::info!("[state] {line}");
                    }
                }
            }
        }
        log::debug!("Snapshot logger stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle_for_every_service() {
        let tracker = RequestTracker::new();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.values().all(|s| *s == ServiceState::default()));
    }

    #[test]
    fn test_counts_match_outcomes() {
        let tracker = RequestTracker::new();
        let outcomes = [true, false, true, true, false];

        for ok in outcomes {
            tracker.record(Service::ListingSource, ServiceStatus::Fetching);
            let status = if ok {
                ServiceStatus::Completed
            } else {
                ServiceStatus::Error
            };
            tracker.record(Service::ListingSource, status);
        }

        let state = tracker.state(Service::ListingSource);
        assert_eq!(state.success_count, 3);
        assert_eq!(state.error_count, 2);
        assert_eq!(state.status, ServiceStatus::Error);
        assert!(state.last_attempt.is_some());

        // Other services untouched
        assert_eq!(tracker.state(Service::Notifier), ServiceState::default());
    }

    #[test]
    fn test_clones_share_state() {
        let tracker = RequestTracker::new();
        let other = tracker.clone();
        other.record(Service::Notifier, ServiceStatus::Completed);
        assert_eq!(tracker.state(Service::Notifier).success_count, 1);
    }

    #[test]
    fn test_format_snapshot() {
        let tracker = RequestTracker::new();
        let lines = format_snapshot(&tracker.snapshot());
        assert_eq!(
            lines[0],
            "listing-source: status=idle ok=0 err=0 last=never"
        );
        assert!(lines[2].starts_with("notifier:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_logger_stops_on_cancel() {
        let tracker = RequestTracker::new();
        tracker.record(Service::DetailSource, ServiceStatus::Completed);
        let before = tracker.snapshot();

        let token = CancellationToken::new();
        let handle = spawn_snapshot_logger(
            tracker.clone(),
            Duration::from_secs(10),
            token.clone(),
        );

        tokio::time::sleep(Duration::from_secs(35)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(tracker.snapshot(), before);
    }
}
