//! Status and duration reconciliation

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::domain::mileage::{in_progress_points, mileage_points};
use crate::domain::{
    AttendanceEvent, Reservation, StudyRecord, StudyStatus, TimeSlotCatalog, TimeWindow,
};

/// Minutes before slot start from which a check-in still counts
pub const GRACE_PERIOD_MINUTES: i64 = 30;

/// Attendance events grouped by student, each group sorted by timestamp.
///
/// Built once per pass so a student's history is sorted once no matter
/// how many reservations they hold. The sort is stable: events sharing a
/// timestamp keep their log order.
pub struct AttendanceIndex<'a> {
    by_student: HashMap<&'a str, Vec<&'a AttendanceEvent>>,
}

impl<'a> AttendanceIndex<'a> {
    pub fn build(events: &'a [AttendanceEvent]) -> Self {
        let mut by_student: HashMap<&'a str, Vec<&'a AttendanceEvent>> = HashMap::new();
        for event in events {
            by_student
                .entry(event.student_id.as_str())
                .or_default()
                .push(event);
        }
        for history in by_student.values_mut() {
            history.sort_by_key(|e| e.timestamp);
        }
        Self { by_student }
    }

    /// Chronological history for `student_id` (empty if none).
    pub fn history(&self, student_id: &str) -> &[&'a AttendanceEvent] {
        self.by_student
            .get(student_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn student_count(&self) -> usize {
        self.by_student.len()
    }
}

/// Derive a [`StudyRecord`] for every reservation, in input order.
///
/// Per reservation the cost is a binary search plus a linear scan over
/// that student's history.
pub fn reconcile(
    reservations: &[Reservation],
    events: &[AttendanceEvent],
    catalog: &TimeSlotCatalog,
    now: NaiveDateTime,
) -> Vec<StudyRecord> {
    let index = AttendanceIndex::build(events);

    let records: Vec<StudyRecord> = reservations
        .iter()
        .map(|reservation| {
            reconcile_reservation(
                reservation,
                index.history(&reservation.student_id),
                catalog,
                now,
            )
        })
        .collect();

    debug!(
        reservations = reservations.len(),
        events = events.len(),
        students = index.student_count(),
        %now,
        "Reconciliation pass complete"
    );

    records
}

fn reconcile_reservation(
    reservation: &Reservation,
    history: &[&AttendanceEvent],
    catalog: &TimeSlotCatalog,
    now: NaiveDateTime,
) -> StudyRecord {
    let (slot, window) = match catalog.resolve_window(&reservation.time_slot, reservation.date) {
        Ok(resolved) => resolved,
        Err(e) => {
            debug!(
                reservation_id = %reservation.reservation_id,
                error = %e,
                "Unresolvable time slot, leaving reservation as Reserved"
            );
            return StudyRecord::unattended(reservation.clone(), StudyStatus::Reserved);
        }
    };

    let Some(check_in) = first_check_in(history, &window) else {
        let status = if window.end < now {
            StudyStatus::NoShow
        } else {
            StudyStatus::Reserved
        };
        return StudyRecord::unattended(reservation.clone(), status);
    };

    // Not bounded by this reservation's window: the first check-out after
    // the check-in closes it, whichever slot it was meant for.
    let Some(check_out) = first_check_out_after(history, check_in.timestamp) else {
        return StudyRecord {
            reservation: reservation.clone(),
            status: StudyStatus::InProgress,
            checkin_time: Some(check_in.timestamp),
            checkout_time: None,
            study_duration_minutes: None,
            mileage_points: in_progress_points(&slot.id),
        };
    };

    let minutes = credited_minutes(&window, check_in.timestamp, check_out.timestamp);

    StudyRecord {
        reservation: reservation.clone(),
        status: StudyStatus::Attended,
        checkin_time: Some(check_in.timestamp),
        checkout_time: Some(check_out.timestamp),
        study_duration_minutes: Some(minutes),
        mileage_points: mileage_points(&slot.id, minutes),
    }
}

/// First check-in inside the grace-extended window
fn first_check_in<'a>(
    history: &[&'a AttendanceEvent],
    window: &TimeWindow,
) -> Option<&'a AttendanceEvent> {
    let grace = window.with_grace(Duration::minutes(GRACE_PERIOD_MINUTES));
    let from = history.partition_point(|e| e.timestamp < grace.start);

    history[from..]
        .iter()
        .take_while(|e| e.timestamp <= grace.end)
        .find(|e| e.is_check_in())
        .copied()
}

/// First check-out strictly after `after`
fn first_check_out_after<'a>(
    history: &[&'a AttendanceEvent],
    after: NaiveDateTime,
) -> Option<&'a AttendanceEvent> {
    let from = history.partition_point(|e| e.timestamp <= after);

    history[from..].iter().find(|e| e.is_check_out()).copied()
}

/// Minutes of `[check_in, check_out]` that fall inside `window`, rounded
/// to the nearest minute. Zero when the overlap is empty.
pub fn credited_minutes(
    window: &TimeWindow,
    check_in: NaiveDateTime,
    check_out: NaiveDateTime,
) -> i64 {
    let start = check_in.max(window.start);
    let end = check_out.min(window.end);
    if end <= start {
        return 0;
    }

    let millis = (end - start).num_milliseconds();
    (millis as f64 / 60_000.0).round() as i64
}

// ── Tests ──────────────────────────────────────────────────────
