//! # Study Room Attendance
//!
//! Reconciles study-room reservations against the check-in/check-out log,
//! derives each booking's status and studied minutes, and scores mileage
//! points per student.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Entities, the time slot catalog and the attendance source port
//! - **application**: Reconciliation engine, mileage aggregation, dashboard
//!   projection, check-in and booking services, snapshot refresher
//! - **infrastructure**: Attendance source implementations (in-memory, JSON file)
//! - **config**: TOML configuration
//! - **runtime**: Wiring, background refresh and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod runtime;
pub mod shared;

pub use config::{default_config_path, AppConfig, ConfigError};

pub use application::{
    filter_summaries, reconcile, summarize, DashboardQuery, DashboardView, GRACE_PERIOD_MINUTES,
};
pub use domain::{
    AttendanceAction, AttendanceEvent, AttendanceSource, MileageSummary, Reservation, Snapshot,
    StudyRecord, StudyStatus, TimeSlotCatalog,
};
pub use runtime::{init_tracing, AppHandle, RuntimeOptions};
