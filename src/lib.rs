mod cli;
mod db;
mod deltas;
mod export;
mod mapping;
mod readings;
mod sensing;
mod settings;
#[cfg(test)]
mod test_support;
mod utils;

use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use log::info;
use serde::Serialize;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Command, SessionFormat};
use db::Database;
use mapping::{MappingController, MappingTiming};
use readings::ReadingScheduler;
use sensing::SensorFactory;
use settings::{Settings, SettingsStore};
use utils::time::{format_local_date_time, local_day_end, local_day_start};

const DATA_DIR_ENV: &str = "BAROLOGGER_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".barologger";
const DB_FILE_NAME: &str = "barologger.sqlite3";
const SETTINGS_FILE_NAME: &str = "settings.json";

pub(crate) struct AppState {
    pub(crate) db: Database,
    pub(crate) settings: SettingsStore,
    pub(crate) sensors: Arc<dyn SensorFactory>,
    pub(crate) mapping: MappingController,
}

impl AppState {
    fn new(db: Database, settings: SettingsStore, sensors: Arc<dyn SensorFactory>) -> Self {
        let current = settings.get();
        let mapping = MappingController::new(
            db.clone(),
            Arc::clone(&sensors),
            MappingTiming::from(&current),
            current.reducer.clone(),
        );
        Self {
            db,
            settings,
            sensors,
            mapping,
        }
    }

    fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join(DB_FILE_NAME))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE_NAME))?;
        let sensors: Arc<dyn SensorFactory> = Arc::new(settings.get().sensors());

        Ok(Self::new(db, settings, sensors))
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn run() -> Result<()> {
    // RUST_LOG still wins over the default level
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir);
    let state = AppState::open(&data_dir)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(dispatch(&state, cli.command, cli.json))
}

async fn dispatch(state: &AppState, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Daemon => run_daemon(state).await,
        Command::Read => {
            let reading = readings::commands::take_reading(state).await?;
            if json {
                return print_json(&reading);
            }
            println!(
                "{} mb at {} (rise {}, fall {})",
                reading.pressure_millibars,
                format_local_date_time(reading.timestamp),
                reading.delta_increase,
                reading.delta_decrease
            );
            Ok(())
        }
        Command::Latest => {
            let latest = readings::commands::latest_reading(state, Utc::now()).await?;
            if json {
                return print_json(&latest);
            }
            match latest {
                Some(latest) => println!(
                    "{} mb, {} (rise {}, fall {})",
                    latest.reading.pressure_millibars,
                    latest.relative_time,
                    latest.reading.delta_increase,
                    latest.reading.delta_decrease
                ),
                None => println!("No readings yet"),
            }
            Ok(())
        }
        Command::Summaries { output } => {
            let summaries = readings::commands::daily_summaries(state).await?;
            if json {
                return print_json(&summaries);
            }
            export::write_daily_summaries_csv(open_output(output.as_deref())?, &summaries)
        }
        Command::Export {
            from,
            to,
            headers,
            output,
        } => {
            let from = from.as_deref().map(local_day_start).transpose()?;
            let to = to.as_deref().map(local_day_end).transpose()?;
            let readings = readings::commands::readings_between(state, from, to).await?;
            if json {
                return print_json(&readings);
            }
            export::write_readings_csv(open_output(output.as_deref())?, &readings, headers, &Local)
        }
        Command::Map { duration_secs } => {
            let outcome =
                mapping::commands::run_mapping_session(state, duration_secs.map(Duration::from_secs))
                    .await?;
            if json {
                return print_json(&outcome);
            }
            println!(
                "Session {}: kept {} of {} samples",
                outcome.session_id, outcome.kept_count, outcome.raw_count
            );
            Ok(())
        }
        Command::Sessions => {
            let sessions = mapping::commands::list_sessions(state).await?;
            if json {
                return print_json(&sessions);
            }
            if sessions.is_empty() {
                println!("No mapping sessions");
            }
            for session in sessions {
                println!(
                    "{}  {}  {}  {}",
                    session.session_id,
                    format_local_date_time(session.started_at),
                    format_local_date_time(session.ended_at),
                    session.reading_count
                );
            }
            Ok(())
        }
        Command::Session { id, format } => {
            let samples = mapping::commands::session_samples(state, &id).await?;
            if json {
                return print_json(&samples);
            }
            match format {
                SessionFormat::Csv => export::write_session_csv(io::stdout().lock(), &samples, &Local),
                SessionFormat::Map => export::write_session_map_lines(io::stdout().lock(), &samples),
                SessionFormat::Table => {
                    for sample in samples {
                        println!(
                            "{}  {:>5}  {:>11}  {:>12}",
                            format_local_date_time(sample.timestamp),
                            sample.pressure_millibars,
                            sample.latitude,
                            sample.longitude
                        );
                    }
                    Ok(())
                }
            }
        }
        Command::DeleteSession { id } => {
            let deleted = mapping::commands::delete_session(state, &id).await?;
            info!("Deleted {deleted} samples of session {id}");
            if json {
                return print_json(&serde_json::json!({ "sessionId": id, "deleted": deleted }));
            }
            println!("Deleted session {id} ({deleted} samples)");
            Ok(())
        }
        Command::Reduce { input, output } => {
            let config = state.settings.get().reducer;
            let report =
                mapping::commands::reduce_file(&input, open_output(output.as_deref())?, &config)?;
            // Reduced rows may already be on stdout; keep the report off it.
            eprintln!(
                "Kept {} of {} samples",
                report.kept_count, report.input_count
            );
            Ok(())
        }
        Command::Settings { reset } => {
            if reset {
                state.settings.update(Settings::default())?;
                info!("Settings reset at {}", state.settings.path().display());
            }
            print_json(&state.settings.get())
        }
    }
}

async fn run_daemon(state: &AppState) -> Result<()> {
    info!("Daemon storing readings in {}", state.db.path().display());
    let cancel_token = CancellationToken::new();
    let scheduler = ReadingScheduler::new(
        state.db.clone(),
        Arc::clone(&state.sensors),
        state.settings.get(),
    );
    let handle = tokio::spawn(scheduler.run(cancel_token.clone()));

    let signal = tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c");
    cancel_token.cancel();
    let recorded = handle.await.context("reading scheduler task failed")?;
    signal?;

    info!("Daemon stopped after {recorded} readings");
    Ok(())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_flag_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/var/lib/barologger")));
        assert_eq!(dir, PathBuf::from("/var/lib/barologger"));
    }

    #[test]
    fn open_creates_store_and_settings_location() {
        let dir = std::env::temp_dir().join(format!("barologger-open-{}", uuid::Uuid::new_v4()));

        let state = AppState::open(&dir).unwrap();

        assert!(dir.join(DB_FILE_NAME).exists());
        assert_eq!(state.settings.path(), dir.join(SETTINGS_FILE_NAME).as_path());
        assert_eq!(state.db.path(), dir.join(DB_FILE_NAME).as_path());

        drop(state);
        let _ = std::fs::remove_dir_all(dir);
    }
}
