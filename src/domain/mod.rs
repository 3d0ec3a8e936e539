//! Domain layer: entities, the slot catalog and the attendance source port

pub mod attendance;
pub mod mileage;
pub mod reservation;
pub mod study_record;
pub mod time_slot;

pub use attendance::{AttendanceAction, AttendanceEvent, AttendanceSource, Snapshot};
pub use mileage::{mileage_points, MileageSummary};
pub use reservation::{Reservation, TeamMember};
pub use study_record::{StudyRecord, StudyStatus};
pub use time_slot::{SlotKind, TimeSlot, TimeSlotCatalog, TimeWindow};

pub use crate::shared::errors::{DomainError, DomainResult};
