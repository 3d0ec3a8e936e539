//! Study record: a reservation enriched with its reconciled attendance

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::reservation::Reservation;

/// Attendance status of a single reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudyStatus {
    /// Checked in and out within the booking
    Attended,
    /// Slot is over and nobody checked in
    #[serde(rename = "No-Show")]
    NoShow,
    /// Slot not over yet and no check-in so far (or slot unknown)
    Reserved,
    /// Checked in, not yet checked out
    #[serde(rename = "In-Progress")]
    InProgress,
}

impl StudyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attended => "Attended",
            Self::NoShow => "No-Show",
            Self::Reserved => "Reserved",
            Self::InProgress => "In-Progress",
        }
    }

    /// Counted towards a student's attendance total
    pub fn counts_as_attended(&self) -> bool {
        matches!(self, Self::Attended | Self::InProgress)
    }
}

impl std::fmt::Display for StudyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Derived per-reservation view. Never persisted; recomputed on every
/// reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyRecord {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub status: StudyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkin_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_duration_minutes: Option<i64>,
    pub mileage_points: u32,
}

impl StudyRecord {
    /// Record with no attendance attached and zero points
    pub fn unattended(reservation: Reservation, status: StudyStatus) -> Self {
        Self {
            reservation,
            status,
            checkin_time: None,
            checkout_time: None,
            study_duration_minutes: None,
            mileage_points: 0,
        }
    }

    pub fn student_id(&self) -> &str {
        &self.reservation.student_id
    }

    pub fn name(&self) -> &str {
        &self.reservation.name
    }
}
