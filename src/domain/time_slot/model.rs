//! Time slot domain entity

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::{DomainError, DomainResult};

/// Scoring category of a slot, derived from its id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// `lunch` / `dinner`
    Meal,
    /// `study1` / `study2`
    SelfStudy,
    /// Anything else (e.g. `period8`); never earns mileage
    Other,
}

impl SlotKind {
    pub fn from_id(id: &str) -> Self {
        match id {
            "lunch" | "dinner" => Self::Meal,
            "study1" | "study2" => Self::SelfStudy,
            _ => Self::Other,
        }
    }
}

/// A bookable slot with its daily wall-clock range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlot {
    /// Stable identifier (`lunch`, `study1`, ...)
    pub id: String,
    /// Label stored on reservations (`점심`, `자기주도학습1`, ...)
    pub label: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Disabled slots stay resolvable but cannot be booked
    pub enabled: bool,
    /// Latest wall-clock time a booking for today is still accepted
    pub booking_cutoff: Option<NaiveTime>,
}

impl TimeSlot {
    /// Build a slot from a `"HH:MM-HH:MM"` range.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        time_range: &str,
    ) -> DomainResult<Self> {
        let (start, end) = parse_time_range(time_range)?;
        Ok(Self {
            id: id.into(),
            label: label.into(),
            start,
            end,
            enabled: true,
            booking_cutoff: None,
        })
    }

    pub fn with_cutoff(mut self, cutoff: NaiveTime) -> Self {
        self.booking_cutoff = Some(cutoff);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn kind(&self) -> SlotKind {
        SlotKind::from_id(&self.id)
    }

    /// Range formatted back as `"HH:MM-HH:MM"`
    pub fn time_range(&self) -> String {
        format!("{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }

    /// Bind this slot's range to `date`.
    pub fn window_on(&self, date: NaiveDate) -> TimeWindow {
        TimeWindow {
            start: date.and_time(self.start),
            end: date.and_time(self.end),
        }
    }
}

/// Parse `"HH:MM-HH:MM"` into a (start, end) pair.
///
/// The end must be strictly after the start; slots never span midnight.
pub fn parse_time_range(range: &str) -> DomainResult<(NaiveTime, NaiveTime)> {
    let invalid = || DomainError::Validation(format!("invalid time range '{}'", range));

    let (start, end) = range.split_once('-').ok_or_else(invalid)?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").map_err(|_| invalid())?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").map_err(|_| invalid())?;

    if end <= start {
        return Err(DomainError::Validation(format!(
            "time range '{}' ends before it starts",
            range
        )));
    }

    Ok((start, end))
}

/// A slot bound to a specific date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Window widened at the front by `grace`, closed on both ends.
    pub fn with_grace(&self, grace: Duration) -> TimeWindow {
        TimeWindow {
            start: self.start - grace,
            end: self.end,
        }
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start && instant <= self.end
    }

    pub fn length_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Read-only slot catalog, passed explicitly to everything that resolves
/// slot labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlotCatalog {
    slots: Vec<TimeSlot>,
}

impl TimeSlotCatalog {
    /// Build a catalog, rejecting duplicate ids or labels.
    pub fn new(slots: Vec<TimeSlot>) -> DomainResult<Self> {
        for (i, slot) in slots.iter().enumerate() {
            if slots[..i].iter().any(|s| s.id == slot.id) {
                return Err(DomainError::Conflict(format!("time slot id '{}'", slot.id)));
            }
            if slots[..i].iter().any(|s| s.label == slot.label) {
                return Err(DomainError::Conflict(format!(
                    "time slot label '{}'",
                    slot.label
                )));
            }
        }
        Ok(Self { slots })
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn find_by_label(&self, label: &str) -> Option<&TimeSlot> {
        self.slots.iter().find(|s| s.label == label)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&TimeSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Resolve a reservation's slot label to its window on `date`.
    pub fn resolve_window(
        &self,
        label: &str,
        date: NaiveDate,
    ) -> DomainResult<(&TimeSlot, TimeWindow)> {
        let slot = self
            .find_by_label(label)
            .ok_or_else(|| DomainError::NotFound {
                entity: "TimeSlot",
                field: "label",
                value: label.to_string(),
            })?;
        Ok((slot, slot.window_on(date)))
    }
}

impl Default for TimeSlotCatalog {
    fn default() -> Self {
        let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        let slot = |id: &str, label: &str, start: (u32, u32), end: (u32, u32)| TimeSlot {
            id: id.to_string(),
            label: label.to_string(),
            start: hm(start.0, start.1),
            end: hm(end.0, end.1),
            enabled: true,
            booking_cutoff: Some(hm(start.0, start.1)),
        };

        Self {
            slots: vec![
                slot("lunch", "점심", (12, 30), (13, 30)),
                slot("period8", "8교시", (16, 40), (17, 30)).disabled(),
                slot("dinner", "석식", (18, 0), (18, 30)),
                slot("study1", "자기주도학습1", (19, 0), (21, 0)),
                slot("study2", "자기주도학습2", (21, 0), (22, 30)),
            ],
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
