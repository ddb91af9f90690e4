use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    iio::IioBarometer,
    simulated::{SimulatedBarometer, SimulatedGps},
};

/// Raw barometer value as delivered by a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressureEvent {
    pub timestamp: DateTime<Utc>,
    pub millibars: f64,
}

impl PressureEvent {
    /// Readings are recorded at whole-millibar resolution.
    pub fn rounded_millibars(&self) -> i32 {
        self.millibars.round() as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

pub trait Barometer: Send {
    fn read_millibars(&mut self) -> Result<f64>;
}

pub trait LocationProvider: Send {
    fn current_fix(&mut self) -> Result<LocationFix>;
}

/// Hands out fresh sensor handles; each reading cycle and each mapping
/// session opens its own and drops it when done.
pub trait SensorFactory: Send + Sync {
    fn barometer(&self) -> Result<Box<dyn Barometer>>;
    fn location_provider(&self) -> Result<Box<dyn LocationProvider>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BarometerSettings {
    Simulated { baseline_millibars: f64 },
    /// Linux industrial-I/O pressure channel, e.g.
    /// `/sys/bus/iio/devices/iio:device0/in_pressure_input`.
    Iio { path: PathBuf },
}

impl Default for BarometerSettings {
    fn default() -> Self {
        BarometerSettings::Simulated {
            baseline_millibars: 1013.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LocationSettings {
    Simulated {
        start_latitude: f64,
        start_longitude: f64,
    },
}

impl Default for LocationSettings {
    fn default() -> Self {
        LocationSettings::Simulated {
            start_latitude: 51.4769,
            start_longitude: -0.0005,
        }
    }
}

/// Sensor factory backed by the user's settings.
#[derive(Debug, Clone)]
pub struct ConfiguredSensors {
    barometer: BarometerSettings,
    location: LocationSettings,
}

impl ConfiguredSensors {
    pub fn new(barometer: BarometerSettings, location: LocationSettings) -> Self {
        Self {
            barometer,
            location,
        }
    }
}

impl SensorFactory for ConfiguredSensors {
    fn barometer(&self) -> Result<Box<dyn Barometer>> {
        match &self.barometer {
            BarometerSettings::Simulated { baseline_millibars } => {
                Ok(Box::new(SimulatedBarometer::new(*baseline_millibars)))
            }
            BarometerSettings::Iio { path } => Ok(Box::new(IioBarometer::open(path.clone())?)),
        }
    }

    fn location_provider(&self) -> Result<Box<dyn LocationProvider>> {
        match &self.location {
            LocationSettings::Simulated {
                start_latitude,
                start_longitude,
            } => Ok(Box::new(SimulatedGps::new(*start_latitude, *start_longitude))),
        }
    }
}
