//! Admin dashboard projection
//!
//! Builds everything the admin view shows from one snapshot: today's
//! counters, the reservation listing and the mileage leaderboard.

use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::reconciliation::{filter_summaries, reconcile, summarize};
use crate::domain::{MileageSummary, Snapshot, StudyRecord, StudyStatus, TimeSlotCatalog};

/// Filters chosen in the admin view
#[derive(Debug, Clone, Default)]
pub struct DashboardQuery {
    /// Name or student-id search. When set, the listing spans all dates.
    pub search: Option<String>,
    /// Restrict the listing to one slot id; ids not in the catalog are ignored
    pub slot_id: Option<String>,
}

impl DashboardQuery {
    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }
}

/// Headline counters for today
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub today_reservations: usize,
    pub studying_now: usize,
    pub today_no_shows: usize,
    pub total_attendance_events: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub stats: DashboardStats,
    pub records: Vec<StudyRecord>,
    pub leaderboard: Vec<MileageSummary>,
}

impl DashboardView {
    pub fn build(
        snapshot: &Snapshot,
        catalog: &TimeSlotCatalog,
        now: NaiveDateTime,
        query: &DashboardQuery,
    ) -> Self {
        let all = reconcile(&snapshot.reservations, &snapshot.attendance, catalog, now);
        let stats = compute_stats(&all, snapshot.attendance.len(), now);

        let leaderboard = summarize(&all);
        let leaderboard = match query.search.as_deref() {
            Some(term) => filter_summaries(&leaderboard, term)
                .into_iter()
                .cloned()
                .collect(),
            None => leaderboard,
        };

        let records = listing(all, catalog, now, query);

        Self {
            stats,
            records,
            leaderboard,
        }
    }
}

fn compute_stats(
    records: &[StudyRecord],
    attendance_events: usize,
    now: NaiveDateTime,
) -> DashboardStats {
    let today = now.date();
    let todays = || records.iter().filter(move |r| r.reservation.date == today);

    DashboardStats {
        today_reservations: todays().count(),
        studying_now: todays()
            .filter(|r| r.status == StudyStatus::InProgress)
            .count(),
        today_no_shows: todays().filter(|r| r.status == StudyStatus::NoShow).count(),
        total_attendance_events: attendance_events,
    }
}

/// Records to list: today's by default, every matching record when
/// searching. Newest date first, then by slot start time; unknown slots
/// sort last within their date.
fn listing(
    records: Vec<StudyRecord>,
    catalog: &TimeSlotCatalog,
    now: NaiveDateTime,
    query: &DashboardQuery,
) -> Vec<StudyRecord> {
    let today = now.date();
    let term = query.search_term();
    // A slot id missing from the catalog applies no filter
    let slot_label = query
        .slot_id
        .as_deref()
        .and_then(|id| catalog.find_by_id(id))
        .map(|slot| slot.label.clone());

    let mut listed: Vec<StudyRecord> = records
        .into_iter()
        .filter(|r| match &term {
            Some(term) => {
                r.name().to_lowercase().contains(term.as_str())
                    || r.student_id().contains(term.as_str())
            }
            None => r.reservation.date == today,
        })
        .filter(|r| match &slot_label {
            Some(label) => &r.reservation.time_slot == label,
            None => true,
        })
        .collect();

    let start_of = |r: &StudyRecord| -> (bool, Option<NaiveTime>) {
        let start = catalog
            .find_by_label(&r.reservation.time_slot)
            .map(|slot| slot.start);
        (start.is_none(), start)
    };

    listed.sort_by(|a, b| {
        b.reservation
            .date
            .cmp(&a.reservation.date)
            .then_with(|| start_of(a).cmp(&start_of(b)))
    });

    listed
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttendanceAction, AttendanceEvent, Reservation};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    fn res(id: &str, student: &str, name: &str, slot: &str, d: u32) -> Reservation {
        Reservation {
            date: day(d),
            student_id: student.into(),
            name: name.into(),
            location: "영글터 자율학습실".into(),
            seat: "1".into(),
            time_slot: slot.into(),
            reservation_id: id.into(),
            timestamp: at(d, 7, 0),
            team_members: Vec::new(),
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            reservations: vec![
                res("R1", "20315", "Kim", "자기주도학습1", 2),
                res("R2", "10101", "Lee", "점심", 2),
                res("R3", "20315", "Kim", "석식", 1),
                res("R4", "10102", "Park", "야간", 2),
            ],
            attendance: vec![
                AttendanceEvent::new("20315", "Kim", AttendanceAction::CheckIn, at(2, 19, 0), "자습실"),
                AttendanceEvent::new("20315", "Kim", AttendanceAction::CheckIn, at(1, 18, 0), "자습실"),
                AttendanceEvent::new("20315", "Kim", AttendanceAction::CheckOut, at(1, 18, 30), "자습실"),
            ],
        }
    }

    #[test]
    fn stats_count_today_only() {
        let view = DashboardView::build(
            &snapshot(),
            &TimeSlotCatalog::default(),
            at(2, 20, 0),
            &DashboardQuery::default(),
        );
        assert_eq!(view.stats.today_reservations, 3);
        assert_eq!(view.stats.studying_now, 1);
        assert_eq!(view.stats.today_no_shows, 1);
        assert_eq!(view.stats.total_attendance_events, 3);
    }

    #[test]
    fn default_listing_is_today_sorted_by_slot_start() {
        let view = DashboardView::build(
            &snapshot(),
            &TimeSlotCatalog::default(),
            at(2, 20, 0),
            &DashboardQuery::default(),
        );
        let ids: Vec<_> = view
            .records
            .iter()
            .map(|r| r.reservation.reservation_id.as_str())
            .collect();
        assert_eq!(ids, vec!["R2", "R1", "R4"]);
    }

    #[test]
    fn search_spans_all_dates_newest_first() {
        let query = DashboardQuery {
            search: Some(" KIM ".into()),
            slot_id: None,
        };
        let view = DashboardView::build(&snapshot(), &TimeSlotCatalog::default(), at(2, 20, 0), &query);
        let ids: Vec<_> = view
            .records
            .iter()
            .map(|r| r.reservation.reservation_id.as_str())
            .collect();
        assert_eq!(ids, vec!["R1", "R3"]);
        assert_eq!(view.leaderboard.len(), 1);
        assert_eq!(view.leaderboard[0].student_id, "20315");
        // dinner attended (30 min, 1 point) + study in progress (2 points)
        assert_eq!(view.leaderboard[0].total_mileage, 3);
    }

    #[test]
    fn slot_filter_uses_catalog_label() {
        let query = DashboardQuery {
            search: None,
            slot_id: Some("lunch".into()),
        };
        let view = DashboardView::build(&snapshot(), &TimeSlotCatalog::default(), at(2, 20, 0), &query);
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.records[0].reservation.reservation_id, "R2");
    }

    #[test]
    fn unknown_slot_filter_lists_everything() {
        let query = DashboardQuery {
            search: None,
            slot_id: Some("midnight".into()),
        };
        let view = DashboardView::build(&snapshot(), &TimeSlotCatalog::default(), at(2, 20, 0), &query);
        assert_eq!(view.records.len(), 3);
    }
}
