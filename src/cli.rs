use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "barologger", version, about = "Barometric pressure logger")]
pub struct Cli {
    /// Directory holding the database and settings.json
    /// (default: $BAROLOGGER_DATA_DIR, then ./.barologger)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Print results as JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Take a reading shortly after start and then every interval until ctrl-c
    Daemon,
    /// Take and store a single reading now
    Read,
    /// Show the most recent reading
    Latest,
    /// Per-day min/max readings and largest deltas as CSV
    Summaries {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Readings between two local dates (YYYY-MM-DD, both inclusive) as CSV
    Export {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// Start with a header line
        #[arg(long, default_value_t = false)]
        headers: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Record a mapping session until ctrl-c or the given duration
    Map {
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// List stored mapping sessions
    Sessions,
    /// Show the samples of one mapping session
    Session {
        id: String,
        #[arg(long, value_enum, default_value_t = SessionFormat::Table)]
        format: SessionFormat,
    },
    /// Delete all samples of one mapping session
    DeleteSession { id: String },
    /// Run the point reducer over a raw sample CSV
    Reduce {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show the effective settings
    Settings {
        /// Overwrite settings.json with the defaults
        #[arg(long, default_value_t = false)]
        reset: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionFormat {
    Table,
    Csv,
    Map,
}
