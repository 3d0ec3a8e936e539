pub mod model;

pub use model::{StudyRecord, StudyStatus};
