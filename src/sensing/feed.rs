use anyhow::Result;
use chrono::Utc;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::sources::{Barometer, LocationFix, LocationProvider, PressureEvent};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Polls `barometer` every `interval` and pushes each value onto `tx` until
/// cancelled or the receiver goes away.
pub fn spawn_pressure_feed(
    mut barometer: Box<dyn Barometer>,
    interval: Duration,
    tx: mpsc::Sender<PressureEvent>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    let first_tick = Instant::now();
    tokio::spawn(run_feed("pressure", first_tick, interval, tx, cancel_token, move || {
        let millibars = barometer.read_millibars()?;
        Ok(PressureEvent {
            timestamp: Utc::now(),
            millibars,
        })
    }))
}

/// Location counterpart of [`spawn_pressure_feed`]. The first fix is taken
/// one interval after start; a fix is only useful once a pressure value
/// exists to pair it with.
pub fn spawn_location_feed(
    mut provider: Box<dyn LocationProvider>,
    interval: Duration,
    tx: mpsc::Sender<LocationFix>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    let first_tick = Instant::now() + interval;
    tokio::spawn(run_feed("location", first_tick, interval, tx, cancel_token, move || {
        provider.current_fix()
    }))
}

/// Sensor reads are synchronous (sysfs, device files), so each one runs on
/// the blocking pool and the reader is handed back afterwards.
async fn run_feed<T, F>(
    name: &'static str,
    first_tick: Instant,
    interval: Duration,
    tx: mpsc::Sender<T>,
    cancel_token: CancellationToken,
    read: F,
) where
    T: Send + 'static,
    F: FnMut() -> Result<T> + Send + 'static,
{
    let mut ticker = tokio::time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reader = Some(read);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(mut read) = reader.take() else { break };
                let joined = tokio::task::spawn_blocking(move || {
                    let value = read();
                    (read, value)
                })
                .await;

                let value = match joined {
                    Ok((read, value)) => {
                        reader = Some(read);
                        value
                    }
                    Err(join_err) => {
                        log_error!("{name} sensor read task failed: {join_err}");
                        break;
                    }
                };

                let value = match value {
                    Ok(value) => value,
                    Err(err) => {
                        log_warn!("{name} sensor read failed: {err:#}");
                        continue;
                    }
                };

                // A full channel must not keep the feed alive past cancellation
                tokio::select! {
                    sent = tx.send(value) => {
                        if sent.is_err() {
                            log_debug!("{name} feed receiver dropped");
                            break;
                        }
                    }
                    _ = cancel_token.cancelled() => break,
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }

    log_info!("{name} feed shutting down");
}
