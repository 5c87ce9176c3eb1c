//! Command-line flags for the `snaprestore` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use snaprestore_telemetry::{DEFAULT_LOG_LEVEL, LogFormat};

/// Default configuration document path when neither flag nor env var is set.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Mount a volume snapshot and copy its contents into a target directory.
#[derive(Debug, Clone, Parser)]
#[command(name = "snaprestore", version)]
pub struct Cli {
    /// Path to the JSON restore configuration.
    #[arg(long, env = "SNAPRESTORE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "SNAPRESTORE_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
    /// Log output format; inferred from the build profile when omitted.
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormatArg>,
    /// Print the run summary as JSON instead of text.
    #[arg(long)]
    pub summary_json: bool,
}

/// Log formats accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable output.
    Pretty,
    /// Structured JSON output.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Selected log format, falling back to the build-profile default.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.map_or_else(LogFormat::infer, LogFormat::from)
    }
}
