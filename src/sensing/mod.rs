//! Sensor sources and the feed tasks that push their values onto channels.

pub mod feed;
pub mod iio;
#[cfg(test)]
pub mod scripted;
pub mod simulated;
pub mod sources;

pub use feed::{spawn_location_feed, spawn_pressure_feed};
pub use sources::{
    BarometerSettings, ConfiguredSensors, LocationFix, LocationSettings, PressureEvent,
    SensorFactory,
};
