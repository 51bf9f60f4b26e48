mod calculator;

pub use calculator::{FeeAssessment, FeeSchedule};
