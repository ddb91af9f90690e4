//! Rolling pressure deltas.
//!
//! Each stored reading carries the largest pressure rise that ends at it and
//! the largest fall that ends at it, measured against the extremes of the
//! trailing window (24 hours by default).

use serde::{Deserialize, Serialize};

use crate::db::PressureReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressureDeltas {
    pub increase: i32,
    pub decrease: i32,
}

/// Computes the rise and fall implied by `current` against `past_readings`.
///
/// With no history both bounds collapse onto `current` and both deltas are 0.
/// A new high only reports a rise, a new low only a fall; anything within
/// the window's range reports both. A reading sitting exactly on a bound
/// yields 0 for the delta measured against that bound.
pub fn compute_deltas(past_readings: &[PressureReading], current: i32) -> PressureDeltas {
    let highest = past_readings
        .iter()
        .map(|reading| reading.pressure_millibars)
        .max()
        .unwrap_or(current);
    let lowest = past_readings
        .iter()
        .map(|reading| reading.pressure_millibars)
        .min()
        .unwrap_or(current);

    let new_high = current > highest;
    let new_low = current < lowest;
    let in_between = !new_high && !new_low;

    let mut deltas = PressureDeltas::default();

    if new_high || in_between {
        deltas.increase = current - lowest;
    }

    if new_low || in_between {
        deltas.decrease = highest - current;
    }

    log::debug!(
        "highest {highest}, lowest {lowest}, delta increase {}, delta decrease {}",
        deltas.increase,
        deltas.decrease
    );

    deltas
}
