//! Mileage rule and leaderboard summary

use serde::{Deserialize, Serialize};

use crate::domain::time_slot::SlotKind;

/// Minimum credited minutes for a meal slot to earn its point
pub const MEAL_MIN_MINUTES: i64 = 20;

const MEAL_POINTS: u32 = 1;
const SELF_STUDY_POINTS: u32 = 2;

/// Points earned for `duration_minutes` of credited time in slot `slot_id`.
///
/// Meal slots pay 1 point from 20 minutes on, self-study slots pay a flat
/// 2 points for any positive duration. Other slots never pay.
pub fn mileage_points(slot_id: &str, duration_minutes: i64) -> u32 {
    if duration_minutes < 0 {
        return 0;
    }

    match SlotKind::from_id(slot_id) {
        SlotKind::Meal if duration_minutes >= MEAL_MIN_MINUTES => MEAL_POINTS,
        SlotKind::SelfStudy if duration_minutes > 0 => SELF_STUDY_POINTS,
        _ => 0,
    }
}

/// Points for a session that is still open. Only self-study pays up front.
pub fn in_progress_points(slot_id: &str) -> u32 {
    match SlotKind::from_id(slot_id) {
        SlotKind::SelfStudy => SELF_STUDY_POINTS,
        _ => 0,
    }
}

/// One leaderboard row, aggregated over all of a student's study records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MileageSummary {
    pub student_id: String,
    /// Display only; not authoritative
    pub name: String,
    pub total_mileage: u32,
    pub attended_count: u32,
    pub no_show_count: u32,
    pub total_study_minutes: i64,
}

impl MileageSummary {
    pub fn new(student_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
            total_mileage: 0,
            attended_count: 0,
            no_show_count: 0,
            total_study_minutes: 0,
        }
    }

    /// `"3시간 5분"` style rendering of the study total
    pub fn study_time_display(&self) -> String {
        format!(
            "{}시간 {}분",
            self.total_study_minutes / 60,
            self.total_study_minutes % 60
        )
    }

    /// Case-insensitive name match or student-id substring match
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.student_id.contains(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_slots_need_twenty_minutes() {
        assert_eq!(mileage_points("lunch", 19), 0);
        assert_eq!(mileage_points("lunch", 20), 1);
        assert_eq!(mileage_points("dinner", 30), 1);
        assert_eq!(mileage_points("dinner", 0), 0);
    }

    #[test]
    fn self_study_pays_flat_for_any_time() {
        assert_eq!(mileage_points("study1", 1), 2);
        assert_eq!(mileage_points("study2", 120), 2);
        assert_eq!(mileage_points("study1", 0), 0);
    }

    #[test]
    fn other_slots_and_negative_durations_pay_nothing() {
        assert_eq!(mileage_points("period8", 50), 0);
        assert_eq!(mileage_points("unknown", 50), 0);
        assert_eq!(mileage_points("study1", -5), 0);
        assert_eq!(mileage_points("lunch", -30), 0);
    }

    #[test]
    fn points_stay_within_slot_values() {
        for minutes in -10..200 {
            assert!(matches!(mileage_points("lunch", minutes), 0 | 1));
            assert!(matches!(mileage_points("study2", minutes), 0 | 2));
        }
    }

    #[test]
    fn in_progress_pays_only_self_study() {
        assert_eq!(in_progress_points("study1"), 2);
        assert_eq!(in_progress_points("lunch"), 0);
        assert_eq!(in_progress_points("period8"), 0);
    }

    #[test]
    fn study_time_display_splits_hours() {
        let mut s = MileageSummary::new("20315", "김민준");
        s.total_study_minutes = 185;
        assert_eq!(s.study_time_display(), "3시간 5분");
    }

    #[test]
    fn query_matches_name_or_id() {
        let s = MileageSummary::new("20315", "Kim Minjun");
        assert!(s.matches("minjun"));
        assert!(s.matches("203"));
        assert!(s.matches("  "));
        assert!(!s.matches("lee"));
    }
}
