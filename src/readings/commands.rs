use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::{DailySummary, PressureReading},
    utils::time::{from_unix, relative_time},
    AppState,
};

use super::cycle::run_reading_cycle;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestReading {
    pub reading: PressureReading,
    pub relative_time: String,
}

pub async fn take_reading(state: &AppState) -> Result<PressureReading> {
    let settings = state.settings.get();
    run_reading_cycle(&state.db, state.sensors.as_ref(), &settings).await
}

pub async fn latest_reading(state: &AppState, now: DateTime<Utc>) -> Result<Option<LatestReading>> {
    let latest = state.db.get_latest_reading().await?;
    Ok(latest.map(|reading| LatestReading {
        relative_time: relative_time(reading.timestamp, now),
        reading,
    }))
}

pub async fn daily_summaries(state: &AppState) -> Result<Vec<DailySummary>> {
    state.db.query_readings_grouped_by_day().await
}

/// Readings in `[from, to]`; an open start means "since the first reading",
/// an open end means "until now".
pub async fn readings_between(
    state: &AppState,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<PressureReading>> {
    let from = match from {
        Some(from) => from,
        None => from_unix(0, "from")?,
    };
    let to = to.unwrap_or_else(Utc::now);

    if from > to {
        bail!(
            "export range starts after it ends ({} > {})",
            from.to_rfc3339(),
            to.to_rfc3339()
        );
    }

    state.db.query_readings_in_window(from, to).await
}
