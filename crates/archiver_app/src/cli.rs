use std::path::PathBuf;

use archiver_core::SyncMode;
use archiver_logging::{LogDestination, DEFAULT_LOG_FILE};
use clap::{Parser, ValueEnum};

/// Incrementally archive articles of the configured publisher accounts as
/// Markdown documents.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Which boundary decides what is new
    #[arg(short, long, value_enum, default_value_t = ModeArg::Archive)]
    pub mode: ModeArg,

    /// Run a single cycle and exit instead of monitoring
    #[arg(long)]
    pub once: bool,

    /// Also write the log to this file (`archiver.log` when no path is given)
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_LOG_FILE)]
    pub log_file: Option<PathBuf>,

    /// With --log-file, log to the file only
    #[arg(short, long, requires = "log_file")]
    pub quiet: bool,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        match (&self.log_file, self.quiet) {
            (Some(path), true) => LogDestination::File(path.clone()),
            (Some(path), false) => LogDestination::Both(path.clone()),
            (None, _) => LogDestination::Terminal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Full catch-up bounded by the newest archived link
    Archive,
    /// Incremental check bounded by the last recorded title
    Update,
}

impl From<ModeArg> for SyncMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Archive => SyncMode::Archive,
            ModeArg::Update => SyncMode::Update,
        }
    }
}
