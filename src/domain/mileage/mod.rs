//! Mileage points and per-student leaderboard rows

pub mod model;

pub use model::{in_progress_points, mileage_points, MileageSummary, MEAL_MIN_MINUTES};
