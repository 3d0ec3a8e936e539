//! Booking rules: which slots are open, how many seats each room has,
//! and which seats are already taken.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::domain::{AttendanceSource, DomainError, Reservation, Snapshot, TeamMember, TimeSlotCatalog};
use crate::shared::validations::{first_failure, not_blank, student_id_rule, ValidationFailure};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Please enter both your student id and name")]
    MissingIdentity,

    #[error("Invalid student id: {0}")]
    InvalidStudentId(String),

    #[error("Booking is not open for {0}")]
    DateNotAvailable(NaiveDate),

    #[error("Unknown time slot: {0}")]
    UnknownSlot(String),

    #[error("Booking for this time slot is closed")]
    SlotClosed,

    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Seat {seat} does not exist in {location}")]
    InvalidSeat { location: String, seat: String },

    #[error("Seat {seat} in {location} is already booked for this time slot")]
    SeatTaken { location: String, seat: String },

    #[error(transparent)]
    Source(#[from] DomainError),
}

/// Booking form input
#[derive(Debug, Clone, Validate)]
pub struct BookingRequest {
    pub date: NaiveDate,
    #[validate(custom(function = "student_id_rule"))]
    pub student_id: String,
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    pub location: String,
    /// Seat number; ignored for whole-room locations
    pub seat: String,
    pub slot_id: String,
    #[validate(custom(function = "team_rule"))]
    pub team_members: Vec<TeamMember>,
}

/// Every team member needs a well-formed student id
fn team_rule(members: &[TeamMember]) -> Result<(), ValidationError> {
    members
        .iter()
        .try_for_each(|member| student_id_rule(&member.student_id))
}

pub struct BookingPolicy {
    catalog: Arc<TimeSlotCatalog>,
    /// Seat count per location; zero means the room is booked as a whole
    seats: HashMap<String, u32>,
}

impl BookingPolicy {
    pub fn new(catalog: Arc<TimeSlotCatalog>, seats: HashMap<String, u32>) -> Self {
        Self { catalog, seats }
    }

    pub fn catalog(&self) -> &TimeSlotCatalog {
        &self.catalog
    }

    /// Seats in `location`; unknown locations have none.
    pub fn seat_count(&self, location: &str) -> u32 {
        self.seats.get(location).copied().unwrap_or(0)
    }

    pub fn is_known_location(&self, location: &str) -> bool {
        self.seats.contains_key(location)
    }

    /// Whether `slot_id` can still be booked for today at `now`: the slot
    /// must exist, be enabled, and `now` must not be past its cutoff minute.
    pub fn is_booking_allowed(&self, slot_id: &str, now: NaiveDateTime) -> bool {
        let Some(slot) = self.catalog.find_by_id(slot_id) else {
            return false;
        };
        if !slot.enabled {
            return false;
        }
        match slot.booking_cutoff {
            Some(cutoff) => minute_of_day(now) <= cutoff.hour() * 60 + cutoff.minute(),
            None => true,
        }
    }

    /// Dates students may book. Only same-day booking is offered.
    pub fn available_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        vec![today]
    }

    /// Seat numbers already booked for (date, location, slot label)
    pub fn occupied_seats<'a>(
        &self,
        snapshot: &'a Snapshot,
        date: NaiveDate,
        location: &str,
        slot_label: &str,
    ) -> BTreeSet<&'a str> {
        snapshot
            .reservations
            .iter()
            .filter(|r| r.date == date && r.location == location && r.time_slot == slot_label)
            .map(|r| r.seat.as_str())
            .collect()
    }

    /// Validate a booking against the current snapshot and build the
    /// reservation. Nothing is written.
    pub fn prepare(
        &self,
        request: &BookingRequest,
        snapshot: &Snapshot,
        now: NaiveDateTime,
    ) -> Result<Reservation, BookingError> {
        request.validate().map_err(|errors| match first_failure(&errors) {
            ValidationFailure::Missing => BookingError::MissingIdentity,
            ValidationFailure::Invalid(reason) => BookingError::InvalidStudentId(reason),
        })?;
        let student_id = request.student_id.trim();
        let name = request.name.trim();

        if !self.available_dates(now.date()).contains(&request.date) {
            return Err(BookingError::DateNotAvailable(request.date));
        }

        let slot = self
            .catalog
            .find_by_id(&request.slot_id)
            .ok_or_else(|| BookingError::UnknownSlot(request.slot_id.clone()))?;

        if !self.is_booking_allowed(&slot.id, now) {
            return Err(BookingError::SlotClosed);
        }

        if !self.is_known_location(&request.location) {
            return Err(BookingError::UnknownLocation(request.location.clone()));
        }

        let capacity = self.seat_count(&request.location);
        let seat = if capacity == 0 {
            String::new()
        } else {
            let seat = request.seat.trim();
            match seat.parse::<u32>() {
                Ok(n) if (1..=capacity).contains(&n) => n.to_string(),
                _ => {
                    return Err(BookingError::InvalidSeat {
                        location: request.location.clone(),
                        seat: seat.to_string(),
                    })
                }
            }
        };

        let taken = self.occupied_seats(snapshot, request.date, &request.location, &slot.label);
        if taken.contains(seat.as_str()) {
            return Err(BookingError::SeatTaken {
                location: request.location.clone(),
                seat,
            });
        }

        Ok(Reservation::new(
            request.date,
            student_id,
            name,
            request.location.clone(),
            seat,
            slot.label.clone(),
        )
        .with_team(request.team_members.clone()))
    }

    /// Validate and persist a booking through `source`.
    pub async fn book(
        &self,
        source: &dyn AttendanceSource,
        request: &BookingRequest,
        now: NaiveDateTime,
    ) -> Result<Reservation, BookingError> {
        let snapshot = source.fetch_all().await?;
        let reservation = self.prepare(request, &snapshot, now)?;
        source.save_reservation(reservation.clone()).await?;

        info!(
            reservation_id = %reservation.reservation_id,
            student_id = %reservation.student_id,
            location = %reservation.location,
            seat = %reservation.seat,
            time_slot = %reservation.time_slot,
            "Reservation booked"
        );

        Ok(reservation)
    }
}

fn minute_of_day(instant: NaiveDateTime) -> u32 {
    instant.hour() * 60 + instant.minute()
}

/// Seat counts used when no `[locations]` table is configured
pub fn default_seat_counts() -> HashMap<String, u32> {
    [
        ("스터디룸", 0),
        ("영글터 집중학습실", 8),
        ("영글터 자율학습실", 25),
        ("채움터", 9),
    ]
    .into_iter()
    .map(|(name, seats)| (name.to_string(), seats))
    .collect()
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryAttendanceStore;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn policy() -> BookingPolicy {
        BookingPolicy::new(Arc::new(TimeSlotCatalog::default()), default_seat_counts())
    }

    fn request(slot: &str, location: &str, seat: &str) -> BookingRequest {
        BookingRequest {
            date: at(0, 0).date(),
            student_id: "20315".into(),
            name: "김민준".into(),
            location: location.into(),
            seat: seat.into(),
            slot_id: slot.into(),
            team_members: Vec::new(),
        }
    }

    #[test]
    fn seat_counts_per_location() {
        let p = policy();
        assert_eq!(p.seat_count("영글터 자율학습실"), 25);
        assert_eq!(p.seat_count("채움터"), 9);
        assert_eq!(p.seat_count("스터디룸"), 0);
        assert_eq!(p.seat_count("운동장"), 0);
    }

    #[test]
    fn booking_closes_after_cutoff_minute() {
        let p = policy();
        assert!(p.is_booking_allowed("lunch", at(12, 30)));
        assert!(!p.is_booking_allowed("lunch", at(12, 31)));
        assert!(p.is_booking_allowed("study2", at(20, 0)));
    }

    #[test]
    fn disabled_and_unknown_slots_cannot_be_booked() {
        let p = policy();
        assert!(!p.is_booking_allowed("period8", at(8, 0)));
        assert!(!p.is_booking_allowed("midnight", at(8, 0)));
    }

    #[test]
    fn prepare_builds_reservation_with_slot_label() {
        let r = policy()
            .prepare(&request("study1", "채움터", "4"), &Snapshot::default(), at(9, 0))
            .unwrap();
        assert_eq!(r.time_slot, "자기주도학습1");
        assert_eq!(r.seat, "4");
    }

    #[test]
    fn prepare_rejects_out_of_range_seat() {
        let err = policy()
            .prepare(&request("study1", "채움터", "10"), &Snapshot::default(), at(9, 0))
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidSeat { .. }));
    }

    #[test]
    fn whole_room_booking_ignores_seat() {
        let r = policy()
            .prepare(&request("study1", "스터디룸", "7"), &Snapshot::default(), at(9, 0))
            .unwrap();
        assert_eq!(r.seat, "");
    }

    #[test]
    fn prepare_rejects_closed_slot() {
        let err = policy()
            .prepare(&request("lunch", "채움터", "1"), &Snapshot::default(), at(13, 0))
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotClosed));
    }

    #[test]
    fn only_today_is_offered() {
        let today = at(0, 0).date();
        assert_eq!(policy().available_dates(today), vec![today]);
    }

    #[test]
    fn booking_for_other_days_is_rejected() {
        let p = policy();
        let today = at(0, 0).date();

        for date in [
            today.pred_opt().unwrap(),
            NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
        ] {
            let mut req = request("lunch", "채움터", "1");
            req.date = date;
            let err = p.prepare(&req, &Snapshot::default(), at(9, 0)).unwrap_err();
            assert!(matches!(err, BookingError::DateNotAvailable(d) if d == date));
        }
    }

    #[test]
    fn future_date_cannot_skip_cutoff() {
        let mut req = request("lunch", "채움터", "1");
        req.date = at(0, 0).date().succ_opt().unwrap();
        let err = policy()
            .prepare(&req, &Snapshot::default(), at(13, 0))
            .unwrap_err();
        assert!(matches!(err, BookingError::DateNotAvailable(_)));
    }

    #[test]
    fn identity_is_checked_before_anything_else() {
        let p = policy();

        let mut blank = request("lunch", "채움터", "1");
        blank.name = "  ".into();
        let err = p.prepare(&blank, &Snapshot::default(), at(9, 0)).unwrap_err();
        assert!(matches!(err, BookingError::MissingIdentity));

        let mut team = request("study1", "스터디룸", "");
        team.team_members = vec![
            TeamMember {
                student_id: "10101".into(),
                name: "이서연".into(),
            },
            TeamMember {
                student_id: "1010".into(),
                name: "박지호".into(),
            },
        ];
        let err = p.prepare(&team, &Snapshot::default(), at(9, 0)).unwrap_err();
        assert!(matches!(err, BookingError::InvalidStudentId(_)));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let mut req = request("study1", "채움터", " 4 ");
        req.student_id = " 20315 ".into();
        req.name = " 김민준 ".into();
        let r = policy()
            .prepare(&req, &Snapshot::default(), at(9, 0))
            .unwrap();
        assert_eq!(r.student_id, "20315");
        assert_eq!(r.name, "김민준");
        assert_eq!(r.seat, "4");
    }

    #[tokio::test]
    async fn second_booking_of_same_seat_is_rejected() {
        let store = InMemoryAttendanceStore::new();
        let p = policy();

        p.book(&store, &request("study1", "채움터", "4"), at(9, 0))
            .await
            .unwrap();

        let mut other = request("study1", "채움터", "4");
        other.student_id = "10101".into();
        let err = p.book(&store, &other, at(9, 5)).await.unwrap_err();
        assert!(matches!(err, BookingError::SeatTaken { .. }));

        // same seat in another slot is free
        p.book(&store, &request("study2", "채움터", "4"), at(9, 10))
            .await
            .unwrap();
        assert_eq!(store.fetch_all().await.unwrap().reservations.len(), 2);
    }
}
