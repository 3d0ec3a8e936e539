//! Reservation aggregate

pub mod model;

pub use model::{Reservation, TeamMember};
