//! Per-student mileage aggregation

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{MileageSummary, StudyRecord, StudyStatus};

/// Aggregate study records into leaderboard rows, highest mileage first.
///
/// Rows are keyed strictly by student id. The display name comes from the
/// student's most recent reservation (by date, then booking time), so the
/// result does not depend on record order. Ties in mileage keep the order
/// in which students first appear.
pub fn summarize(records: &[StudyRecord]) -> Vec<MileageSummary> {
    let mut rows: Vec<MileageSummary> = Vec::new();
    let mut latest: Vec<(NaiveDate, NaiveDateTime)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let reservation = &record.reservation;
        let booked = (reservation.date, reservation.timestamp);

        let pos = *positions.entry(record.student_id()).or_insert_with(|| {
            rows.push(MileageSummary::new(record.student_id(), record.name()));
            latest.push(booked);
            rows.len() - 1
        });

        let row = &mut rows[pos];
        if booked >= latest[pos] {
            latest[pos] = booked;
            row.name = record.name().to_string();
        }

        row.total_mileage += record.mileage_points;
        row.total_study_minutes += record.study_duration_minutes.unwrap_or(0);
        if record.status.counts_as_attended() {
            row.attended_count += 1;
        } else if record.status == StudyStatus::NoShow {
            row.no_show_count += 1;
        }
    }

    rows.sort_by(|a, b| b.total_mileage.cmp(&a.total_mileage));
    rows
}

/// Rows whose name (case-insensitive) or student id contains `query`.
///
/// Filtering never changes the totals; an empty query returns everything.
pub fn filter_summaries<'a>(
    summaries: &'a [MileageSummary],
    query: &str,
) -> Vec<&'a MileageSummary> {
    summaries.iter().filter(|s| s.matches(query)).collect()
}

// ── Tests ──────────────────────────────────────────────────────
