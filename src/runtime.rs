//! Reusable application runtime.
//!
//! Provides [`AppHandle`] that wires the configured attendance source, the
//! slot catalog and the background snapshot refresher, and owns graceful
//! shutdown. The CLI's long-running commands start one of these; one-shot
//! commands only use the services it hands out.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::application::{
    BookingPolicy, CheckinService, DashboardQuery, DashboardView, SnapshotRefresher, SnapshotState,
};
use crate::config::{AppConfig, ConfigError};
use crate::domain::{AttendanceSource, TimeSlotCatalog};
use crate::infrastructure::JsonFileStore;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

pub struct RuntimeOptions {
    pub config: AppConfig,
    /// Source to use instead of the JSON file named in the config
    pub source: Option<Arc<dyn AttendanceSource>>,
    /// Spawn the periodic refresh loop. One-shot callers refresh by hand.
    pub background_refresh: bool,
}

impl RuntimeOptions {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            source: None,
            background_refresh: true,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn AttendanceSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn without_background_refresh(mut self) -> Self {
        self.background_refresh = false;
        self
    }
}

// ── AppHandle ──────────────────────────────────────────────────────

/// Handle to a running refresher plus the services built around it.
pub struct AppHandle {
    pub config: AppConfig,
    pub catalog: Arc<TimeSlotCatalog>,
    pub source: Arc<dyn AttendanceSource>,
    pub refresher: Arc<SnapshotRefresher>,

    shutdown: ShutdownCoordinator,
    /// Subscribed before the loop starts, so its first refresh is never missed
    updates: watch::Receiver<u64>,
    refresh_task: Option<JoinHandle<()>>,
}

impl AppHandle {
    /// Build the catalog and source from the config and start the refresher
    /// unless `background_refresh` is off.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(opts: RuntimeOptions) -> Result<Self, ConfigError> {
        let config = opts.config;
        config.validate()?;

        let catalog = Arc::new(config.catalog()?);
        let source: Arc<dyn AttendanceSource> = match opts.source {
            Some(source) => source,
            None => {
                info!(path = %config.source.path.display(), "Using JSON data file");
                Arc::new(JsonFileStore::new(config.source.path.clone()))
            }
        };

        let refresher = Arc::new(
            SnapshotRefresher::new(source.clone()).with_config(config.refresh.refresh_config()),
        );

        let shutdown = ShutdownCoordinator::new(config.refresh.shutdown_timeout_secs);
        let updates = refresher.subscribe();
        let refresh_task = opts
            .background_refresh
            .then(|| refresher.start(shutdown.signal()));

        info!(
            slots = catalog.slots().len(),
            interval_secs = config.refresh.interval_secs,
            "✅ Study room runtime started"
        );

        Ok(Self {
            config,
            catalog,
            source,
            refresher,
            shutdown,
            updates,
            refresh_task,
        })
    }

    pub fn checkin_service(&self) -> CheckinService {
        CheckinService::new(
            self.source.clone(),
            self.catalog.clone(),
            self.config.checkin.location.clone(),
        )
        .with_retry(self.config.refresh.retry_config())
    }

    pub fn booking_policy(&self) -> BookingPolicy {
        BookingPolicy::new(self.catalog.clone(), self.config.seat_counts())
    }

    /// Dashboard over the latest refreshed snapshot, plus that snapshot's state
    pub async fn dashboard(
        &self,
        query: &DashboardQuery,
        now: NaiveDateTime,
    ) -> (DashboardView, SnapshotState) {
        let state = self.refresher.state().await;
        let view = DashboardView::build(&state.snapshot, &self.catalog, now, query);
        (view, state)
    }

    /// Receiver that fires after every successful refresh, including the
    /// first one of the background loop.
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.updates.clone()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown to be triggered and the refresher to stop.
    pub async fn wait(self) {
        let task = self.refresh_task;
        let completed = self
            .shutdown
            .shutdown_with_cleanup(|| async move {
                if let Some(task) = task {
                    if let Err(e) = task.await {
                        error!("Snapshot refresher task panicked: {}", e);
                    }
                }
            })
            .await;

        if completed {
            info!("👋 Study room runtime stopped");
        }
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down study room runtime...");
        self.trigger_shutdown();
        self.wait().await;
    }

    /// Whether the background refresh loop is still running
    pub fn is_running(&self) -> bool {
        self.refresh_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

/// Initialize tracing (logging) from the application config.
///
/// `RUST_LOG` takes precedence over `logging.level`. Calling this more than
/// once keeps the first subscriber.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}

// ── Tests ──────────────────────────────────────────────────────
