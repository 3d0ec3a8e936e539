//! Application services

mod booking;
mod checkin;
mod refresher;

pub use booking::{default_seat_counts, BookingError, BookingPolicy, BookingRequest};
pub use checkin::{CheckinError, CheckinReceipt, CheckinRequest, CheckinService};
pub use refresher::{RefreshConfig, SnapshotRefresher, SnapshotState};
