//! Attendance source interface
//!
//! The persistence backend is an external collaborator; the engine only
//! ever sees complete snapshots of it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::model::AttendanceEvent;
use crate::domain::reservation::Reservation;
use crate::domain::DomainResult;

/// Consistent pair of reservation and attendance lists from one fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    #[serde(default)]
    pub attendance: Vec<AttendanceEvent>,
}

#[async_trait]
pub trait AttendanceSource: Send + Sync {
    /// Read every reservation and attendance event in one snapshot.
    async fn fetch_all(&self) -> DomainResult<Snapshot>;

    /// Append a check-in/check-out event to the log.
    async fn append_attendance_event(&self, event: AttendanceEvent) -> DomainResult<()>;

    /// Record a new reservation. Fails with `Conflict` if the reservation id
    /// or its (date, location, seat, slot) combination is already taken.
    async fn save_reservation(&self, reservation: Reservation) -> DomainResult<()>;
}
