pub mod mapping_sample;
pub mod pressure_reading;

pub use mapping_sample::{MappingSample, MappingSessionSummary};
pub use pressure_reading::{DailySummary, PressureReading};
