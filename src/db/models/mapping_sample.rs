//! Mapping session data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pressure value paired with a location fix while a mapping session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSample {
    pub id: Option<i64>,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub pressure_millibars: i32,
    pub latitude: f64,
    pub longitude: f64,
}

impl MappingSample {
    pub fn new(
        session_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        pressure_millibars: i32,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id: None,
            session_id: session_id.into(),
            timestamp,
            pressure_millibars,
            latitude,
            longitude,
        }
    }
}

/// Sessions have no row of their own; their extent comes from their samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSessionSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub reading_count: usize,
}
