use std::{fs::File, io::Write, path::Path};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tokio::time::Duration;

use crate::{
    db::{MappingSample, MappingSessionSummary},
    export::{read_raw_samples_csv, write_raw_samples_csv},
    AppState,
};

use super::{config::ReducerConfig, controller::MappingOutcome, reducer::reduce_samples};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReductionReport {
    pub input_count: usize,
    pub kept_count: usize,
}

/// Runs a mapping session until `duration` elapses or the user hits ctrl-c.
/// The session is stopped and persisted either way.
pub async fn run_mapping_session(
    state: &AppState,
    duration: Option<Duration>,
) -> Result<MappingOutcome> {
    let session_id = state.mapping.start_session().await?;
    log::info!("Collecting samples for session {session_id}, press ctrl-c to finish");

    let waited = wait_for_end(duration).await;
    let outcome = state.mapping.stop_session().await?;
    waited?;

    Ok(outcome)
}

async fn wait_for_end(duration: Option<Duration>) -> Result<()> {
    match duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => Ok(()),
                signal = tokio::signal::ctrl_c() => signal.context("failed to listen for ctrl-c"),
            }
        }
        None => tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c"),
    }
}

pub async fn list_sessions(state: &AppState) -> Result<Vec<MappingSessionSummary>> {
    state.db.list_mapping_sessions().await
}

pub async fn session_samples(state: &AppState, session_id: &str) -> Result<Vec<MappingSample>> {
    let samples = state.db.query_mapping_samples_by_session(session_id).await?;
    if samples.is_empty() {
        bail!("no mapping session with id {session_id}");
    }
    Ok(samples)
}

pub async fn delete_session(state: &AppState, session_id: &str) -> Result<usize> {
    let deleted = state.db.delete_mapping_samples_by_session(session_id).await?;
    if deleted == 0 {
        bail!("no mapping session with id {session_id}");
    }
    Ok(deleted)
}

/// Applies the point reducer to a raw sample CSV, writing the retained
/// samples in the same format.
pub fn reduce_file<W: Write>(
    input: &Path,
    output: W,
    config: &ReducerConfig,
) -> Result<ReductionReport> {
    let file = File::open(input)
        .with_context(|| format!("failed to open samples file {}", input.display()))?;
    let mut samples = read_raw_samples_csv(file)
        .with_context(|| format!("failed to read samples from {}", input.display()))?;
    samples.sort_by_key(|sample| sample.timestamp);

    let kept = reduce_samples(&samples, config);
    write_raw_samples_csv(output, &kept)?;

    Ok(ReductionReport {
        input_count: samples.len(),
        kept_count: kept.len(),
    })
}
