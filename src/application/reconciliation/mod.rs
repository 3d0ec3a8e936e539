//! Attendance reconciliation and mileage scoring
//!
//! Turns the raw reservation and attendance snapshots into per-reservation
//! [`StudyRecord`](crate::domain::StudyRecord)s and per-student
//! [`MileageSummary`](crate::domain::MileageSummary) rows. Everything here is
//! pure: same inputs and same `now` give the same output.

mod engine;
mod summary;

pub use engine::{credited_minutes, reconcile, AttendanceIndex, GRACE_PERIOD_MINUTES};
pub use summary::{filter_summaries, summarize};
