//! One fetch-decide-persist pass: read the barometer once, load the trailing
//! window, compute deltas, store the new reading. Nothing is written unless
//! every step succeeds.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, error, info};
use tokio::{sync::mpsc, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::{
    db::{Database, PressureReading},
    deltas::compute_deltas,
    sensing::{spawn_pressure_feed, PressureEvent, SensorFactory},
    settings::Settings,
};

const SENSOR_POLL_INTERVAL_MS: u64 = 200;

/// Subscribes to the barometer, takes the first value it delivers and
/// unsubscribes again.
pub async fn acquire_pressure(
    sensors: &dyn SensorFactory,
    timeout: Duration,
) -> Result<PressureEvent> {
    let barometer = sensors.barometer()?;

    let (tx, mut rx) = mpsc::channel(1);
    let cancel_token = CancellationToken::new();
    let feed = spawn_pressure_feed(
        barometer,
        Duration::from_millis(SENSOR_POLL_INTERVAL_MS),
        tx,
        cancel_token.clone(),
    );

    debug!("Waiting for a pressure reading");
    let received = tokio::time::timeout(timeout, rx.recv()).await;

    cancel_token.cancel();
    if let Err(join_err) = feed.await {
        error!("Pressure feed task failed to join: {join_err}");
    }

    match received {
        Ok(Some(event)) => Ok(event),
        Ok(None) => bail!("pressure feed closed before delivering a reading"),
        Err(_) => Err(anyhow!(
            "no pressure reading within {}s",
            timeout.as_secs_f64()
        )),
    }
}

/// Rounds `millibars`, derives its deltas from the readings in
/// `[timestamp - window, timestamp]` and stores it. Readings are kept at
/// whole-second resolution.
pub async fn record_reading(
    db: &Database,
    millibars: f64,
    timestamp: DateTime<Utc>,
    window: chrono::Duration,
) -> Result<PressureReading> {
    let pressure = millibars.round() as i32;
    let timestamp = timestamp.trunc_subsecs(0);

    let window_start = timestamp
        .checked_sub_signed(window)
        .with_context(|| format!("delta window of {window} reaches before representable time"))?;

    let past_readings = db
        .query_readings_in_window(window_start, timestamp)
        .await
        .context("failed to load readings in the delta window")?;

    let deltas = compute_deltas(&past_readings, pressure);

    let reading = PressureReading::new(timestamp, pressure, deltas.increase, deltas.decrease);
    db.insert_reading(&reading)
        .await
        .context("failed to store pressure reading")
}

pub async fn run_reading_cycle(
    db: &Database,
    sensors: &dyn SensorFactory,
    settings: &Settings,
) -> Result<PressureReading> {
    let event = acquire_pressure(sensors, settings.sensor_timeout()).await?;
    let reading = record_reading(db, event.millibars, event.timestamp, settings.delta_window()).await?;

    info!(
        "Recorded {} mb (rise {}, fall {}) at {}",
        reading.pressure_millibars,
        reading.delta_increase,
        reading.delta_decrease,
        reading.timestamp.to_rfc3339()
    );

    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::scripted::{ScriptedBarometer, ScriptedSensors};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn first_reading_has_no_deltas() {
        let db = Database::in_memory().unwrap();

        let reading = record_reading(&db, 1012.6, at(10), chrono::Duration::hours(24))
            .await
            .unwrap();

        assert_eq!(reading.pressure_millibars, 1013);
        assert_eq!((reading.delta_increase, reading.delta_decrease), (0, 0));
        assert!(reading.id.is_some());
    }

    #[tokio::test]
    async fn deltas_use_only_the_window() {
        let db = Database::in_memory().unwrap();
        let window = chrono::Duration::hours(6);

        // Outside the window: would otherwise be the lowest value
        record_reading(&db, 990.0, at(1), window).await.unwrap();
        record_reading(&db, 1000.0, at(8), window).await.unwrap();
        record_reading(&db, 1010.0, at(9), window).await.unwrap();

        let reading = record_reading(&db, 1004.0, at(10), window).await.unwrap();

        assert_eq!(reading.delta_increase, 4);
        assert_eq!(reading.delta_decrease, 6);
    }

    #[tokio::test]
    async fn acquire_takes_first_value() {
        let sensors = ScriptedSensors::new(Some(ScriptedBarometer::new([1009.4, 1020.0])), None);

        let event = acquire_pressure(&sensors, Duration::from_secs(5)).await.unwrap();

        assert_eq!(event.millibars, 1009.4);
    }

    #[tokio::test]
    async fn missing_sensor_aborts_cycle_without_writing() {
        let db = Database::in_memory().unwrap();
        let sensors = ScriptedSensors::new(None, None);

        let result = run_reading_cycle(&db, &sensors, &Settings::default()).await;

        assert!(result.is_err());
        assert!(db.get_latest_reading().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn silent_sensor_times_out() {
        // A barometer with an empty script errors on every read and never delivers.
        let sensors = ScriptedSensors::new(Some(ScriptedBarometer::new([])), None);

        let result = acquire_pressure(&sensors, Duration::from_millis(300)).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn full_cycle_stores_reading() {
        let db = Database::in_memory().unwrap();
        let sensors = ScriptedSensors::new(Some(ScriptedBarometer::new([1001.0])), None);

        let reading = run_reading_cycle(&db, &sensors, &Settings::default())
            .await
            .unwrap();

        let latest = db.get_latest_reading().await.unwrap().unwrap();
        assert_eq!(latest, reading);
    }

    #[tokio::test]
    async fn unrepresentable_window_is_an_error() {
        let db = Database::in_memory().unwrap();

        let result = record_reading(&db, 1000.0, at(10), chrono::Duration::days(1_000_000_000)).await;

        assert!(result.is_err());
        assert!(db.get_latest_reading().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_window_setting_still_records() {
        let db = Database::in_memory().unwrap();
        let sensors = ScriptedSensors::new(Some(ScriptedBarometer::new([1001.0])), None);
        let settings = Settings {
            delta_window_hours: 10_000_000_000,
            ..Settings::default()
        };

        let reading = run_reading_cycle(&db, &sensors, &settings).await.unwrap();

        assert_eq!(reading.pressure_millibars, 1001);
    }
}
