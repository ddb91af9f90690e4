use anyhow::Result;
use chrono::Utc;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::sources::{Barometer, LocationFix, LocationProvider};

const MIN_MILLIBARS: f64 = 950.0;
const MAX_MILLIBARS: f64 = 1060.0;
const MAX_PRESSURE_STEP: f64 = 0.4;

// Roughly walking pace per fix, in degrees
const MAX_COORDINATE_STEP: f64 = 0.000_02;

/// Random-walk barometer for machines without a pressure sensor.
#[derive(Debug)]
pub struct SimulatedBarometer {
    current: f64,
    rng: StdRng,
}

impl SimulatedBarometer {
    pub fn new(baseline_millibars: f64) -> Self {
        Self::with_rng(baseline_millibars, StdRng::from_entropy())
    }

    pub fn with_rng(baseline_millibars: f64, rng: StdRng) -> Self {
        Self {
            current: baseline_millibars.clamp(MIN_MILLIBARS, MAX_MILLIBARS),
            rng,
        }
    }
}

impl Barometer for SimulatedBarometer {
    fn read_millibars(&mut self) -> Result<f64> {
        let step = self.rng.gen_range(-MAX_PRESSURE_STEP..=MAX_PRESSURE_STEP);
        self.current = (self.current + step).clamp(MIN_MILLIBARS, MAX_MILLIBARS);
        Ok(self.current)
    }
}

/// Wanders away from a starting point, one small step per fix.
#[derive(Debug)]
pub struct SimulatedGps {
    latitude: f64,
    longitude: f64,
    rng: StdRng,
}

impl SimulatedGps {
    pub fn new(start_latitude: f64, start_longitude: f64) -> Self {
        Self::with_rng(start_latitude, start_longitude, StdRng::from_entropy())
    }

    pub fn with_rng(start_latitude: f64, start_longitude: f64, rng: StdRng) -> Self {
        Self {
            latitude: start_latitude,
            longitude: start_longitude,
            rng,
        }
    }
}

impl LocationProvider for SimulatedGps {
    fn current_fix(&mut self) -> Result<LocationFix> {
        self.latitude = (self.latitude
            + self.rng.gen_range(-MAX_COORDINATE_STEP..=MAX_COORDINATE_STEP))
        .clamp(-90.0, 90.0);
        self.longitude = (self.longitude
            + self.rng.gen_range(-MAX_COORDINATE_STEP..=MAX_COORDINATE_STEP))
        .clamp(-180.0, 180.0);

        Ok(LocationFix {
            timestamp: Utc::now(),
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}
