use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::mapping::ReducerConfig;

/// One leap year.
const MAX_DELTA_WINDOW_HOURS: i64 = 366 * 24;
use crate::sensing::{BarometerSettings, ConfiguredSensors, LocationSettings};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub barometer: BarometerSettings,
    pub location: LocationSettings,
    pub reading_interval_secs: u64,
    pub first_reading_delay_secs: u64,
    pub delta_window_hours: i64,
    pub sensor_timeout_secs: u64,
    pub mapping_pressure_interval_ms: u64,
    pub mapping_location_interval_ms: u64,
    pub reducer: ReducerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            barometer: BarometerSettings::default(),
            location: LocationSettings::default(),
            reading_interval_secs: 15 * 60,
            first_reading_delay_secs: 2 * 60,
            delta_window_hours: 24,
            sensor_timeout_secs: 30,
            mapping_pressure_interval_ms: 1_000,
            mapping_location_interval_ms: 1_000,
            reducer: ReducerConfig::default(),
        }
    }
}

impl Settings {
    pub fn reading_interval(&self) -> Duration {
        Duration::from_secs(self.reading_interval_secs.max(1))
    }

    pub fn first_reading_delay(&self) -> Duration {
        Duration::from_secs(self.first_reading_delay_secs)
    }

    pub fn delta_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.delta_window_hours.clamp(0, MAX_DELTA_WINDOW_HOURS))
    }

    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_secs(self.sensor_timeout_secs.max(1))
    }

    pub fn mapping_pressure_interval(&self) -> Duration {
        Duration::from_millis(self.mapping_pressure_interval_ms.max(1))
    }

    pub fn mapping_location_interval(&self) -> Duration {
        Duration::from_millis(self.mapping_location_interval_ms.max(1))
    }

    pub fn sensors(&self) -> ConfiguredSensors {
        ConfiguredSensors::new(self.barometer.clone(), self.location.clone())
    }
}

/// `settings.json` in the data directory, cached behind a lock.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!(
                        "Ignoring unreadable settings in {}: {err}; using defaults",
                        path.display()
                    );
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    #[allow(dead_code)]
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
