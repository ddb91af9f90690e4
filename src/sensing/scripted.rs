//! Deterministic sensors for tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};

use super::sources::{Barometer, LocationFix, LocationProvider, SensorFactory};

/// Replays fixed values, then keeps repeating the last one.
#[derive(Debug, Clone)]
pub struct ScriptedBarometer {
    values: VecDeque<f64>,
    last: Option<f64>,
}

impl ScriptedBarometer {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            last: None,
        }
    }
}

impl Barometer for ScriptedBarometer {
    fn read_millibars(&mut self) -> Result<f64> {
        if let Some(value) = self.values.pop_front() {
            self.last = Some(value);
        }
        self.last.ok_or_else(|| anyhow!("scripted barometer has no values"))
    }
}

/// Replays fixes once, then reports an error on every call.
#[derive(Debug, Clone)]
pub struct ScriptedLocations {
    fixes: VecDeque<LocationFix>,
}

impl ScriptedLocations {
    pub fn new(fixes: impl IntoIterator<Item = LocationFix>) -> Self {
        Self {
            fixes: fixes.into_iter().collect(),
        }
    }
}

impl LocationProvider for ScriptedLocations {
    fn current_fix(&mut self) -> Result<LocationFix> {
        self.fixes
            .pop_front()
            .ok_or_else(|| anyhow!("scripted location provider exhausted"))
    }
}

/// Factory handing out clones of the scripts; `None` means "sensor missing".
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensors {
    barometer: Option<ScriptedBarometer>,
    locations: Arc<Mutex<Option<ScriptedLocations>>>,
}

impl ScriptedSensors {
    pub fn new(barometer: Option<ScriptedBarometer>, locations: Option<ScriptedLocations>) -> Self {
        Self {
            barometer,
            locations: Arc::new(Mutex::new(locations)),
        }
    }
}

impl SensorFactory for ScriptedSensors {
    fn barometer(&self) -> Result<Box<dyn Barometer>> {
        self.barometer
            .clone()
            .map(|b| Box::new(b) as Box<dyn Barometer>)
            .ok_or_else(|| anyhow!("no pressure sensor available"))
    }

    fn location_provider(&self) -> Result<Box<dyn LocationProvider>> {
        let mut guard = self.locations.lock().map_err(|_| anyhow!("poisoned"))?;
        guard
            .take()
            .map(|l| Box::new(l) as Box<dyn LocationProvider>)
            .ok_or_else(|| anyhow!("no location provider available"))
    }
}
