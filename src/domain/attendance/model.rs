//! Attendance event entity

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Check-in or check-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceAction {
    #[serde(rename = "checkin", alias = "체크인")]
    CheckIn,
    #[serde(rename = "checkout", alias = "체크아웃")]
    CheckOut,
}

impl AttendanceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckIn => "checkin",
            Self::CheckOut => "checkout",
        }
    }
}

impl std::fmt::Display for AttendanceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only attendance log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEvent {
    pub student_id: String,
    pub name: String,
    pub action: AttendanceAction,
    pub timestamp: NaiveDateTime,
    pub location: String,
}

impl AttendanceEvent {
    pub fn new(
        student_id: impl Into<String>,
        name: impl Into<String>,
        action: AttendanceAction,
        timestamp: NaiveDateTime,
        location: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
            action,
            timestamp,
            location: location.into(),
        }
    }

    pub fn is_check_in(&self) -> bool {
        self.action == AttendanceAction::CheckIn
    }

    pub fn is_check_out(&self) -> bool {
        self.action == AttendanceAction::CheckOut
    }
}
