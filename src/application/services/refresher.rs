//! Snapshot refresher
//!
//! Periodically re-fetches the full reservation + attendance snapshot and
//! swaps it in atomically. A failed fetch keeps the previous snapshot and
//! records the error so the dashboard can show a non-fatal notice.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{AttendanceSource, DomainError, DomainResult, Snapshot};
use crate::shared::shutdown::ShutdownSignal;
use crate::shared::utils::{retry_with_backoff, RetryConfig};

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Seconds between fetches
    pub interval_secs: u64,
    pub retry: RetryConfig,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

/// Last good snapshot plus the outcome of the latest fetch
#[derive(Debug, Clone, Default)]
pub struct SnapshotState {
    pub snapshot: Snapshot,
    /// When `snapshot` was fetched; `None` until the first success
    pub fetched_at: Option<NaiveDateTime>,
    /// Error from the latest fetch, cleared on success
    pub last_error: Option<String>,
}

impl SnapshotState {
    pub fn is_loaded(&self) -> bool {
        self.fetched_at.is_some()
    }
}

pub struct SnapshotRefresher {
    source: Arc<dyn AttendanceSource>,
    config: RefreshConfig,
    state: Arc<RwLock<SnapshotState>>,
    /// Bumped after every successful swap
    generation: watch::Sender<u64>,
}

impl SnapshotRefresher {
    pub fn new(source: Arc<dyn AttendanceSource>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            source,
            config: RefreshConfig::default(),
            state: Arc::new(RwLock::new(SnapshotState::default())),
            generation,
        }
    }

    pub fn with_config(mut self, config: RefreshConfig) -> Self {
        self.config = config;
        self
    }

    /// Receiver notified after each successful refresh
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub async fn state(&self) -> SnapshotState {
        self.state.read().await.clone()
    }

    /// Fetch once and swap the snapshot in. On failure the previous
    /// snapshot stays in place and the error is returned.
    pub async fn refresh_once(&self) -> DomainResult<()> {
        let result = retry_with_backoff(
            &self.config.retry,
            || self.source.fetch_all(),
            DomainError::is_transient,
            "fetch_all",
        )
        .await;

        match result {
            Ok(snapshot) => {
                let reservations = snapshot.reservations.len();
                let attendance = snapshot.attendance.len();
                {
                    let mut state = self.state.write().await;
                    state.snapshot = snapshot;
                    state.fetched_at = Some(Local::now().naive_local());
                    state.last_error = None;
                }
                self.generation.send_modify(|g| *g += 1);
                debug!(reservations, attendance, "Snapshot refreshed");
                Ok(())
            }
            Err(e) => {
                self.state.write().await.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Spawn the refresh loop. The first fetch happens immediately.
    pub fn start(self: &Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let refresher = Arc::clone(self);

        tokio::spawn(async move {
            let interval_secs = refresher.config.interval_secs.max(1);
            info!(interval_secs, "🔄 Snapshot refresher started");

            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = refresher.refresh_once().await {
                            warn!(error = %e, "Snapshot refresh failed, keeping previous data");
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("🔄 Snapshot refresher shutting down");
                        break;
                    }
                }
            }

            info!("🔄 Snapshot refresher stopped");
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::domain::{AttendanceEvent, Reservation};

    /// Source that can be switched into a failing state
    struct FlakySource {
        down: AtomicBool,
        snapshot: Snapshot,
    }

    #[async_trait]
    impl AttendanceSource for FlakySource {
        async fn fetch_all(&self) -> DomainResult<Snapshot> {
            if self.down.load(Ordering::SeqCst) {
                Err(DomainError::Validation("sheet unavailable".into()))
            } else {
                Ok(self.snapshot.clone())
            }
        }

        async fn append_attendance_event(&self, _event: AttendanceEvent) -> DomainResult<()> {
            Ok(())
        }

        async fn save_reservation(&self, _reservation: Reservation) -> DomainResult<()> {
            Ok(())
        }
    }

    fn source() -> Arc<FlakySource> {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        Arc::new(FlakySource {
            down: AtomicBool::new(false),
            snapshot: Snapshot {
                reservations: vec![Reservation::new(date, "20315", "김민준", "채움터", "1", "점심")],
                attendance: Vec::new(),
            },
        })
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let src = source();
        let refresher = SnapshotRefresher::new(src.clone());

        refresher.refresh_once().await.unwrap();
        assert!(refresher.state().await.is_loaded());

        src.down.store(true, Ordering::SeqCst);
        assert!(refresher.refresh_once().await.is_err());

        let state = refresher.state().await;
        assert_eq!(state.snapshot.reservations.len(), 1);
        assert!(state.last_error.is_some());

        src.down.store(false, Ordering::SeqCst);
        refresher.refresh_once().await.unwrap();
        assert!(refresher.state().await.last_error.is_none());
    }

    #[tokio::test]
    async fn nothing_loaded_before_first_success() {
        let src = source();
        src.down.store(true, Ordering::SeqCst);
        let refresher = SnapshotRefresher::new(src);
        assert!(refresher.refresh_once().await.is_err());
        assert!(!refresher.state().await.is_loaded());
    }

    #[tokio::test]
    async fn background_loop_refreshes_and_stops_on_shutdown() {
        let refresher = Arc::new(SnapshotRefresher::new(source()));
        let mut updates = refresher.subscribe();
        let shutdown = ShutdownSignal::new();

        let handle = refresher.start(shutdown.clone());
        tokio::time::timeout(Duration::from_secs(2), updates.changed())
            .await
            .expect("first refresh should happen immediately")
            .unwrap();
        assert_eq!(*updates.borrow(), 1);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop should stop")
            .unwrap();
    }
}
