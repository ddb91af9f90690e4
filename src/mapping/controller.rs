use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use log::{error, info};
use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    db::{Database, MappingSample},
    sensing::{spawn_location_feed, spawn_pressure_feed, SensorFactory},
    settings::Settings,
};

use super::{collector::collect_samples, config::ReducerConfig, reducer::reduce_samples};

const SENSOR_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingTiming {
    pub pressure_interval: Duration,
    pub location_interval: Duration,
}

impl From<&Settings> for MappingTiming {
    fn from(settings: &Settings) -> Self {
        Self {
            pressure_interval: settings.mapping_pressure_interval(),
            location_interval: settings.mapping_location_interval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingOutcome {
    pub session_id: String,
    pub raw_count: usize,
    pub kept_count: usize,
}

struct ActiveSession {
    session_id: String,
    cancel_token: CancellationToken,
    feeds: Vec<JoinHandle<()>>,
    collector: JoinHandle<Vec<MappingSample>>,
}

/// Owns at most one running mapping session.
#[derive(Clone)]
pub struct MappingController {
    db: Database,
    sensors: Arc<dyn SensorFactory>,
    timing: MappingTiming,
    reducer: ReducerConfig,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl MappingController {
    pub fn new(
        db: Database,
        sensors: Arc<dyn SensorFactory>,
        timing: MappingTiming,
        reducer: ReducerConfig,
    ) -> Self {
        Self {
            db,
            sensors,
            timing,
            reducer,
            active: Arc::new(Mutex::new(None)),
        }
    }

    #[cfg(test)]
    pub async fn active_session_id(&self) -> Option<String> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|session| session.session_id.clone())
    }

    /// Opens both sensors and starts collecting under a fresh session id.
    pub async fn start_session(&self) -> Result<String> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            bail!("mapping session already active");
        }

        let barometer = self
            .sensors
            .barometer()
            .context("cannot map without a pressure sensor")?;
        let location = self
            .sensors
            .location_provider()
            .context("cannot map without a location provider")?;

        let session_id = Uuid::new_v4().to_string();
        let cancel_token = CancellationToken::new();

        let (pressure_tx, pressure_rx) = mpsc::channel(SENSOR_CHANNEL_CAPACITY);
        let (location_tx, location_rx) = mpsc::channel(SENSOR_CHANNEL_CAPACITY);

        let collector = tokio::spawn(collect_samples(
            session_id.clone(),
            pressure_rx,
            location_rx,
        ));
        let feeds = vec![
            spawn_pressure_feed(
                barometer,
                self.timing.pressure_interval,
                pressure_tx,
                cancel_token.clone(),
            ),
            spawn_location_feed(
                location,
                self.timing.location_interval,
                location_tx,
                cancel_token.clone(),
            ),
        ];

        info!("Mapping session {session_id} started");

        *active = Some(ActiveSession {
            session_id: session_id.clone(),
            cancel_token,
            feeds,
            collector,
        });

        Ok(session_id)
    }

    /// Stops the feeds, lets the collector drain, reduces the buffer and
    /// stores what is left in one batch.
    pub async fn stop_session(&self) -> Result<MappingOutcome> {
        let session = self
            .active
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("no active mapping session"))?;

        session.cancel_token.cancel();
        for feed in session.feeds {
            if let Err(join_err) = feed.await {
                error!("Sensor feed for session {} failed to join: {join_err}", session.session_id);
            }
        }

        let mut samples = session
            .collector
            .await
            .context("mapping collector task failed")?;
        samples.sort_by_key(|sample| sample.timestamp);

        let kept = reduce_samples(&samples, &self.reducer);
        if !kept.is_empty() {
            self.db
                .insert_mapping_samples(&kept)
                .await
                .with_context(|| format!("failed to store session {}", session.session_id))?;
        }

        info!(
            "Mapping session {} ended: kept {} of {} samples",
            session.session_id,
            kept.len(),
            samples.len()
        );

        Ok(MappingOutcome {
            session_id: session.session_id,
            raw_count: samples.len(),
            kept_count: kept.len(),
        })
    }
}
