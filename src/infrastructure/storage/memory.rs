//! In-memory attendance source

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::{
    AttendanceEvent, AttendanceSource, DomainError, DomainResult, Reservation, Snapshot,
};

/// In-memory storage for development and testing.
///
/// Rows are keyed by insertion sequence so snapshots come back in the
/// order they were written, like rows appended to a sheet.
pub struct InMemoryAttendanceStore {
    reservations: DashMap<u64, Reservation>,
    attendance: DashMap<u64, AttendanceEvent>,
    row_counter: AtomicU64,
    /// Serializes the duplicate check and insert of `save_reservation`
    booking_lock: Mutex<()>,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self {
            reservations: DashMap::new(),
            attendance: DashMap::new(),
            row_counter: AtomicU64::new(1),
            booking_lock: Mutex::new(()),
        }
    }

    /// Store pre-populated with `snapshot`, rows kept in order
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        for reservation in snapshot.reservations {
            store.reservations.insert(store.next_row(), reservation);
        }
        for event in snapshot.attendance {
            store.attendance.insert(store.next_row(), event);
        }
        store
    }

    fn next_row(&self) -> u64 {
        self.row_counter.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for InMemoryAttendanceStore {
    fn default() -> Self {
        Self::new()
    }
}

fn in_row_order<T: Clone>(rows: &DashMap<u64, T>) -> Vec<T> {
    let mut entries: Vec<(u64, T)> = rows
        .iter()
        .map(|e| (*e.key(), e.value().clone()))
        .collect();
    entries.sort_by_key(|(row, _)| *row);
    entries.into_iter().map(|(_, value)| value).collect()
}

/// Reject a reservation whose id or (date, location, seat, slot) is taken
pub(crate) fn ensure_bookable<'a>(
    existing: impl IntoIterator<Item = &'a Reservation>,
    candidate: &Reservation,
) -> DomainResult<()> {
    for r in existing {
        if r.reservation_id == candidate.reservation_id {
            return Err(DomainError::Conflict(format!(
                "reservation {}",
                candidate.reservation_id
            )));
        }
        if r.date == candidate.date
            && r.location == candidate.location
            && r.seat == candidate.seat
            && r.time_slot == candidate.time_slot
        {
            return Err(DomainError::Conflict(format!(
                "{} seat '{}' for {} on {}",
                candidate.location, candidate.seat, candidate.time_slot, candidate.date
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl AttendanceSource for InMemoryAttendanceStore {
    async fn fetch_all(&self) -> DomainResult<Snapshot> {
        Ok(Snapshot {
            reservations: in_row_order(&self.reservations),
            attendance: in_row_order(&self.attendance),
        })
    }

    async fn append_attendance_event(&self, event: AttendanceEvent) -> DomainResult<()> {
        self.attendance.insert(self.next_row(), event);
        Ok(())
    }

    async fn save_reservation(&self, reservation: Reservation) -> DomainResult<()> {
        let _guard = self.booking_lock.lock().await;
        let existing = in_row_order(&self.reservations);
        ensure_bookable(&existing, &reservation)?;
        self.reservations.insert(self.next_row(), reservation);
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::AttendanceAction;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[tokio::test]
    async fn snapshot_preserves_write_order() {
        let store = InMemoryAttendanceStore::new();
        for (i, id) in ["30101", "10101", "20101"].iter().enumerate() {
            let at = date().and_hms_opt(19, i as u32, 0).unwrap();
            store
                .append_attendance_event(AttendanceEvent::new(
                    *id,
                    "학생",
                    AttendanceAction::CheckIn,
                    at,
                    "자기주도학습실",
                ))
                .await
                .unwrap();
        }

        let ids: Vec<String> = store
            .fetch_all()
            .await
            .unwrap()
            .attendance
            .into_iter()
            .map(|e| e.student_id)
            .collect();
        assert_eq!(ids, vec!["30101", "10101", "20101"]);
    }

    #[tokio::test]
    async fn duplicate_seat_is_a_conflict() {
        let store = InMemoryAttendanceStore::new();
        store
            .save_reservation(Reservation::new(date(), "20315", "김민준", "채움터", "1", "점심"))
            .await
            .unwrap();

        let err = store
            .save_reservation(Reservation::new(date(), "10101", "이서연", "채움터", "1", "점심"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        store
            .save_reservation(Reservation::new(date(), "10101", "이서연", "채움터", "2", "점심"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn duplicate_reservation_id_is_a_conflict() {
        let r = Reservation::new(date(), "20315", "김민준", "채움터", "1", "점심");
        let mut again = r.clone();
        again.seat = "5".into();

        let store = InMemoryAttendanceStore::with_snapshot(Snapshot {
            reservations: vec![r],
            attendance: Vec::new(),
        });
        assert!(store.save_reservation(again).await.is_err());
    }
}
