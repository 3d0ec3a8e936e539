//! Check-in / check-out flow
//!
//! Validates the student's input, checks that a check-in falls inside one
//! of their bookings for today, and appends the event to the source.
//! Check-outs are accepted without a reservation check.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use validator::Validate;

use crate::application::reconciliation::GRACE_PERIOD_MINUTES;
use crate::domain::{
    AttendanceAction, AttendanceEvent, AttendanceSource, DomainError, TimeSlotCatalog,
};
use crate::shared::utils::{retry_with_backoff, RetryConfig};
use crate::shared::validations::{first_failure, not_blank, student_id_rule, ValidationFailure};

#[derive(Debug, Error)]
pub enum CheckinError {
    #[error("Please enter both your student id and name")]
    MissingIdentity,

    #[error("Invalid student id: {0}")]
    InvalidStudentId(String),

    #[error("No reservation found for today. Please book a seat first")]
    NoReservationToday,

    #[error("Not within a reserved time. Check-in opens 30 minutes before your slot")]
    OutsideCheckinWindow,

    #[error(transparent)]
    Source(#[from] DomainError),
}

/// What the student typed at the kiosk
#[derive(Debug, Clone, Default, Validate)]
pub struct CheckinRequest {
    #[validate(custom(function = "student_id_rule"))]
    pub student_id: String,
    #[validate(custom(function = "not_blank"))]
    pub name: String,
}

impl CheckinRequest {
    pub fn new(student_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
        }
    }

    /// Trimmed (student_id, name), rejecting blanks and malformed ids
    fn validated(&self) -> Result<(String, String), CheckinError> {
        self.validate().map_err(|errors| match first_failure(&errors) {
            ValidationFailure::Missing => CheckinError::MissingIdentity,
            ValidationFailure::Invalid(reason) => CheckinError::InvalidStudentId(reason),
        })?;
        Ok((
            self.student_id.trim().to_string(),
            self.name.trim().to_string(),
        ))
    }
}

/// Confirmation shown after a successful check-in/out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinReceipt {
    pub student_id: String,
    pub name: String,
    pub action: AttendanceAction,
    pub timestamp: NaiveDateTime,
}

pub struct CheckinService {
    source: Arc<dyn AttendanceSource>,
    catalog: Arc<TimeSlotCatalog>,
    /// Location written on every event
    location: String,
    retry: RetryConfig,
}

impl CheckinService {
    pub fn new(
        source: Arc<dyn AttendanceSource>,
        catalog: Arc<TimeSlotCatalog>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            source,
            catalog,
            location: location.into(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Check in at `now`. Requires a reservation today whose grace-extended
    /// window contains `now`.
    pub async fn check_in(
        &self,
        request: &CheckinRequest,
        now: NaiveDateTime,
    ) -> Result<CheckinReceipt, CheckinError> {
        let (student_id, name) = request.validated()?;

        let snapshot = retry_with_backoff(
            &self.retry,
            || self.source.fetch_all(),
            DomainError::is_transient,
            "fetch_reservations",
        )
        .await?;

        let today = now.date();
        let mut todays = snapshot
            .reservations
            .iter()
            .filter(|r| r.date == today && r.student_id == student_id && r.name == name)
            .peekable();

        if todays.peek().is_none() {
            return Err(CheckinError::NoReservationToday);
        }

        let grace = Duration::minutes(GRACE_PERIOD_MINUTES);
        let open = todays.any(|r| {
            self.catalog
                .resolve_window(&r.time_slot, r.date)
                .map(|(_, window)| window.with_grace(grace).contains(now))
                .unwrap_or(false)
        });

        if !open {
            return Err(CheckinError::OutsideCheckinWindow);
        }

        self.record(student_id, name, AttendanceAction::CheckIn, now)
            .await
    }

    /// Check out at `now`. Only the input is validated.
    pub async fn check_out(
        &self,
        request: &CheckinRequest,
        now: NaiveDateTime,
    ) -> Result<CheckinReceipt, CheckinError> {
        let (student_id, name) = request.validated()?;
        self.record(student_id, name, AttendanceAction::CheckOut, now)
            .await
    }

    async fn record(
        &self,
        student_id: String,
        name: String,
        action: AttendanceAction,
        now: NaiveDateTime,
    ) -> Result<CheckinReceipt, CheckinError> {
        let event = AttendanceEvent::new(
            student_id.clone(),
            name.clone(),
            action,
            now,
            self.location.clone(),
        );

        // Appends are not retried: a timed-out write may still have landed.
        self.source.append_attendance_event(event).await?;

        info!(student_id = %student_id, %action, timestamp = %now, "Attendance recorded");

        Ok(CheckinReceipt {
            student_id,
            name,
            action,
            timestamp: now,
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Reservation;
    use crate::infrastructure::storage::InMemoryAttendanceStore;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    async fn service_with_lunch_booking() -> (CheckinService, Arc<InMemoryAttendanceStore>) {
        let store = Arc::new(InMemoryAttendanceStore::new());
        let reservation = Reservation::new(
            at(0, 0).date(),
            "20315",
            "김민준",
            "채움터",
            "3",
            "점심",
        );
        store.save_reservation(reservation).await.unwrap();

        let service = CheckinService::new(
            store.clone(),
            Arc::new(TimeSlotCatalog::default()),
            "자기주도학습실",
        );
        (service, store)
    }

    #[tokio::test]
    async fn check_in_within_grace_window_is_recorded() {
        let (service, store) = service_with_lunch_booking().await;
        let receipt = service
            .check_in(&CheckinRequest::new(" 20315 ", "김민준"), at(12, 5))
            .await
            .unwrap();

        assert_eq!(receipt.student_id, "20315");
        assert_eq!(receipt.action, AttendanceAction::CheckIn);

        let snapshot = store.fetch_all().await.unwrap();
        assert_eq!(snapshot.attendance.len(), 1);
        assert_eq!(snapshot.attendance[0].location, "자기주도학습실");
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_before_recording() {
        let (service, store) = service_with_lunch_booking().await;
        let err = service
            .check_out(&CheckinRequest::new("20315", "  "), at(13, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckinError::MissingIdentity));
        assert!(store.fetch_all().await.unwrap().attendance.is_empty());
    }

    #[tokio::test]
    async fn malformed_student_id_is_rejected() {
        let (service, _) = service_with_lunch_booking().await;
        let err = service
            .check_in(&CheckinRequest::new("2031", "김민준"), at(12, 30))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckinError::InvalidStudentId(_)));
    }

    #[test]
    fn blank_name_wins_over_malformed_id() {
        let err = CheckinRequest::new("99", "\t").validated().unwrap_err();
        assert!(matches!(err, CheckinError::MissingIdentity));

        let err = CheckinRequest::new("40101", "김민준").validated().unwrap_err();
        match err {
            CheckinError::InvalidStudentId(reason) => assert!(reason.contains("between")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn check_in_without_booking_is_rejected() {
        let (service, _) = service_with_lunch_booking().await;
        let err = service
            .check_in(&CheckinRequest::new("10101", "이서연"), at(12, 30))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckinError::NoReservationToday));
    }

    #[tokio::test]
    async fn check_in_outside_window_is_rejected() {
        let (service, _) = service_with_lunch_booking().await;
        let err = service
            .check_in(&CheckinRequest::new("20315", "김민준"), at(11, 59))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckinError::OutsideCheckinWindow));
    }

    #[tokio::test]
    async fn check_out_needs_no_reservation() {
        let (service, store) = service_with_lunch_booking().await;
        service
            .check_out(&CheckinRequest::new("10101", "이서연"), at(22, 0))
            .await
            .unwrap();
        let events = store.fetch_all().await.unwrap().attendance;
        assert_eq!(events[0].action, AttendanceAction::CheckOut);
    }
}
