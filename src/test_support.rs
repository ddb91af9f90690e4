use std::sync::Arc;

use crate::{
    db::Database,
    sensing::scripted::ScriptedSensors,
    settings::{Settings, SettingsStore},
    AppState,
};

/// In-memory store, throwaway settings file and fast mapping feeds.
pub(crate) fn test_state(sensors: ScriptedSensors) -> AppState {
    let db = Database::in_memory().expect("in-memory database");
    let settings_path = std::env::temp_dir()
        .join(format!("barologger-test-{}", uuid::Uuid::new_v4()))
        .join("settings.json");
    let settings = SettingsStore::new(settings_path).expect("settings store");
    settings
        .update(Settings {
            sensor_timeout_secs: 2,
            mapping_pressure_interval_ms: 2,
            mapping_location_interval_ms: 10,
            ..Settings::default()
        })
        .expect("test settings");

    AppState::new(db, settings, Arc::new(sensors))
}
