use crate::db::MappingSample;
use crate::mapping::config::ReducerConfig;

/// Number of leading samples kept unconditionally; together they give the
/// first heading of the route.
const SEED_SAMPLES: usize = 2;

/// Filters a time-ordered session down to the samples worth persisting.
///
/// Every sample is judged against the last one *kept*, so a run of dropped
/// samples cannot creep the reference forward. Output preserves input order.
pub fn reduce_samples(samples: &[MappingSample], config: &ReducerConfig) -> Vec<MappingSample> {
    let mut kept: Vec<MappingSample> = Vec::with_capacity(samples.len());

    for sample in samples {
        let keep = match kept.last() {
            Some(last) if kept.len() >= SEED_SAMPLES => should_keep(last, sample, config),
            _ => true,
        };

        if keep {
            kept.push(sample.clone());
        }
    }

    kept
}

// TODO: add a course-change rule comparing the bearing of the last two kept
// samples with the bearing from the last kept sample to the candidate.
fn should_keep(last: &MappingSample, candidate: &MappingSample, config: &ReducerConfig) -> bool {
    let elapsed_secs = (candidate.timestamp - last.timestamp).num_seconds();
    if elapsed_secs >= config.min_interval_secs {
        return true;
    }

    let pressure_change = (candidate.pressure_millibars - last.pressure_millibars).abs();
    pressure_change >= config.min_pressure_change
}
