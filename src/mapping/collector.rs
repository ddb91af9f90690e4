use chrono::SubsecRound;
use tokio::sync::mpsc;

use crate::{
    db::MappingSample,
    sensing::{LocationFix, PressureEvent},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Sole consumer of a session's two sensor channels.
///
/// Keeps the latest pressure and appends one sample per location fix. Fixes
/// that arrive before the first pressure value are skipped. Returns the
/// buffer once both producers have hung up.
pub async fn collect_samples(
    session_id: String,
    mut pressure_rx: mpsc::Receiver<PressureEvent>,
    mut location_rx: mpsc::Receiver<LocationFix>,
) -> Vec<MappingSample> {
    let mut samples: Vec<MappingSample> = Vec::new();
    let mut last_pressure: Option<i32> = None;
    let mut skipped_fixes: usize = 0;

    loop {
        // Pending pressure goes first so a fix pairs with the newest value.
        tokio::select! {
            biased;
            Some(event) = pressure_rx.recv() => {
                last_pressure = Some(event.rounded_millibars());
            }
            Some(fix) = location_rx.recv() => {
                let Some(pressure) = last_pressure else {
                    skipped_fixes += 1;
                    log_debug!("session {session_id}: location fix before any pressure value, skipping");
                    continue;
                };

                samples.push(MappingSample::new(
                    session_id.as_str(),
                    fix.timestamp.trunc_subsecs(0),
                    pressure,
                    fix.latitude,
                    fix.longitude,
                ));
            }
            else => break,
        }
    }

    log_info!(
        "session {session_id}: collected {} samples ({} fixes skipped)",
        samples.len(),
        skipped_fixes
    );

    samples
}
