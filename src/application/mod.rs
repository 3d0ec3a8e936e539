pub mod dashboard;
pub mod reconciliation;
pub mod services;

// Re-export key types for convenience
pub use dashboard::{DashboardQuery, DashboardStats, DashboardView};
pub use reconciliation::{filter_summaries, reconcile, summarize, GRACE_PERIOD_MINUTES};
pub use services::{
    BookingError, BookingPolicy, BookingRequest, CheckinError, CheckinReceipt, CheckinRequest,
    CheckinService, RefreshConfig, SnapshotRefresher, SnapshotState,
};
