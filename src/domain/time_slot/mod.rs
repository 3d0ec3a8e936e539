//! Time slot catalog
//!
//! The fixed set of bookable slots and the resolver that binds a slot's
//! wall-clock range to a calendar date.

pub mod model;

pub use model::{parse_time_range, SlotKind, TimeSlot, TimeSlotCatalog, TimeWindow};
