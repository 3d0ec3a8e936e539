//! Attendance event log and the source it is read from

pub mod model;
pub mod repository;

pub use model::{AttendanceAction, AttendanceEvent};
pub use repository::{AttendanceSource, Snapshot};
