//! Periodic barometer readings and their per-day rollup.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One periodic reading, stored together with the largest rise and fall it
/// completes within the trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressureReading {
    /// Assigned by the store on insert.
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub pressure_millibars: i32,
    pub delta_increase: i32,
    pub delta_decrease: i32,
}

impl PressureReading {
    pub fn new(
        timestamp: DateTime<Utc>,
        pressure_millibars: i32,
        delta_increase: i32,
        delta_decrease: i32,
    ) -> Self {
        Self {
            id: None,
            timestamp,
            pressure_millibars,
            delta_increase,
            delta_decrease,
        }
    }
}

/// Aggregate of all readings on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub min_reading: i32,
    pub max_reading: i32,
    pub max_delta_increase: i32,
    pub max_delta_decrease: i32,
}
