//! Reservation domain entity

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Additional student sharing a group-room booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub student_id: String,
    pub name: String,
}

/// Seat booking for one slot on one date.
///
/// Reservations are immutable once booked; the source is responsible for
/// keeping (date, location, seat, time_slot) unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub date: NaiveDate,
    pub student_id: String,
    pub name: String,
    pub location: String,
    pub seat: String,
    /// Slot label as shown to students (e.g. `점심`)
    pub time_slot: String,
    pub reservation_id: String,
    /// When the booking was made
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub team_members: Vec<TeamMember>,
}

impl Reservation {
    pub fn new(
        date: NaiveDate,
        student_id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
        seat: impl Into<String>,
        time_slot: impl Into<String>,
    ) -> Self {
        Self {
            date,
            student_id: student_id.into(),
            name: name.into(),
            location: location.into(),
            seat: seat.into(),
            time_slot: time_slot.into(),
            reservation_id: Uuid::new_v4().to_string(),
            timestamp: Local::now().naive_local(),
            team_members: Vec::new(),
        }
    }

    pub fn with_team(mut self, members: Vec<TeamMember>) -> Self {
        self.team_members = members;
        self
    }

    /// `"name(id), name(id)"`, or `None` for solo bookings
    pub fn team_members_display(&self) -> Option<String> {
        if self.team_members.is_empty() {
            return None;
        }
        Some(
            self.team_members
                .iter()
                .map(|m| format!("{}({})", m.name, m.student_id))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Reservation {
        Reservation::new(
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            "20315",
            "김민준",
            "영글터 자율학습실",
            "A-3",
            "자기주도학습1",
        )
    }

    #[test]
    fn new_reservation_has_unique_id() {
        let a = sample();
        let b = sample();
        assert_ne!(a.reservation_id, b.reservation_id);
        assert!(a.team_members.is_empty());
    }

    #[test]
    fn solo_booking_has_no_team_display() {
        assert_eq!(sample().team_members_display(), None);
    }

    #[test]
    fn team_display_lists_members() {
        let r = sample().with_team(vec![
            TeamMember {
                student_id: "20316".into(),
                name: "이서연".into(),
            },
            TeamMember {
                student_id: "20317".into(),
                name: "박지호".into(),
            },
        ]);
        assert_eq!(
            r.team_members_display().as_deref(),
            Some("이서연(20316), 박지호(20317)")
        );
    }

    #[test]
    fn deserializes_camel_case_without_team() {
        let json = r#"{
            "date": "2026-03-02",
            "studentId": "10101",
            "name": "최하준",
            "location": "채움터",
            "seat": "5",
            "timeSlot": "점심",
            "reservationId": "R-1",
            "timestamp": "2026-03-02T08:15:00"
        }"#;
        let r: Reservation = serde_json::from_str(json).unwrap();
        assert_eq!(r.student_id, "10101");
        assert_eq!(r.time_slot, "점심");
        assert!(r.team_members.is_empty());
    }
}
