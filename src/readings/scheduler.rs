use std::sync::Arc;

use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{db::Database, sensing::SensorFactory, settings::Settings};

use super::cycle::run_reading_cycle;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTiming {
    pub first_delay: Duration,
    pub interval: Duration,
}

impl From<&Settings> for ScheduleTiming {
    fn from(settings: &Settings) -> Self {
        Self {
            first_delay: settings.first_reading_delay(),
            interval: settings.reading_interval(),
        }
    }
}

/// Takes a reading shortly after start-up and then once per interval.
///
/// Cycles never overlap: the next tick is only awaited after the previous
/// cycle finished, and late ticks are delayed rather than bunched up. A
/// failed cycle leaves the store untouched and is not retried until the
/// next tick.
pub struct ReadingScheduler {
    db: Database,
    sensors: Arc<dyn SensorFactory>,
    settings: Settings,
    timing: ScheduleTiming,
}

impl ReadingScheduler {
    pub fn new(db: Database, sensors: Arc<dyn SensorFactory>, settings: Settings) -> Self {
        let timing = ScheduleTiming::from(&settings);
        Self {
            db,
            sensors,
            settings,
            timing,
        }
    }

    #[cfg(test)]
    pub fn with_timing(mut self, timing: ScheduleTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Runs until `cancel_token` fires; returns the number of stored readings.
    pub async fn run(self, cancel_token: CancellationToken) -> u64 {
        log_info!(
            "Reading scheduler started: first reading in {}s, then every {}s",
            self.timing.first_delay.as_secs(),
            self.timing.interval.as_secs()
        );

        tokio::select! {
            _ = tokio::time::sleep(self.timing.first_delay) => {}
            _ = cancel_token.cancelled() => {
                log_info!("Reading scheduler cancelled before first reading");
                return 0;
            }
        }

        let mut ticker = tokio::time::interval(self.timing.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut recorded: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match run_reading_cycle(&self.db, self.sensors.as_ref(), &self.settings).await {
                        Ok(_) => recorded += 1,
                        Err(err) => log_error!("Reading cycle failed, retrying next tick: {err:#}"),
                    }
                }
                _ = cancel_token.cancelled() => {
                    log_info!("Reading scheduler shutting down after {recorded} readings");
                    break;
                }
            }
        }

        recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::scripted::{ScriptedBarometer, ScriptedSensors};

    fn fast() -> ScheduleTiming {
        ScheduleTiming {
            first_delay: Duration::from_millis(5),
            interval: Duration::from_millis(20),
        }
    }

    #[test]
    fn timing_comes_from_settings() {
        let timing = ScheduleTiming::from(&Settings::default());
        assert_eq!(timing.first_delay, Duration::from_secs(120));
        assert_eq!(timing.interval, Duration::from_secs(900));
    }

    #[tokio::test]
    async fn records_readings_until_cancelled() {
        let db = Database::in_memory().unwrap();
        let sensors = Arc::new(ScriptedSensors::new(
            Some(ScriptedBarometer::new([1000.0, 1003.0, 1001.0])),
            None,
        ));
        let cancel = CancellationToken::new();

        let scheduler = ReadingScheduler::new(db.clone(), sensors, Settings::default())
            .with_timing(fast());
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
        let recorded = handle.await.unwrap();

        assert!(recorded >= 2, "only {recorded} readings recorded");
        assert!(db.get_latest_reading().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failing_cycles_do_not_stop_the_loop() {
        let db = Database::in_memory().unwrap();
        let sensors = Arc::new(ScriptedSensors::new(None, None));
        let cancel = CancellationToken::new();

        let scheduler = ReadingScheduler::new(db.clone(), sensors, Settings::default())
            .with_timing(fast());
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!handle.is_finished());
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), 0);
        assert!(db.get_latest_reading().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_during_first_delay_records_nothing() {
        let db = Database::in_memory().unwrap();
        let sensors = Arc::new(ScriptedSensors::new(Some(ScriptedBarometer::new([1000.0])), None));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let recorded = ReadingScheduler::new(db, sensors, Settings::default())
            .run(cancel)
            .await;

        assert_eq!(recorded, 0);
    }
}
