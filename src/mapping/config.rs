use serde::{Deserialize, Serialize};

/// Thresholds deciding which mapping samples are worth keeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    /// Keep a sample once this long has passed since the last kept one
    pub min_interval_secs: i64,

    /// Keep a sample whose pressure moved at least this far from the last kept one
    pub min_pressure_change: i32,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 60,
            min_pressure_change: 2,
        }
    }
}
