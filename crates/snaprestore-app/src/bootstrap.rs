//! Process boot sequence: logging, configuration, restore run, summary output.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use snaprestore_config::ConfigLoader;
use snaprestore_fsops::{HostFs, RestoreOrchestrator, RestoreSummary, VolumeFs};
use snaprestore_telemetry::{LoggingConfig, RunContextGuard, build_sha, init_logging};
use tracing::info;

use crate::cli::Cli;
use crate::error::{AppError, AppResult};

/// Entry point for the `snaprestore` binary.
///
/// # Errors
///
/// Returns an error if logging cannot be installed, the configuration is
/// invalid, the restore fails, or the summary cannot be written.
pub fn run(cli: &Cli) -> AppResult<()> {
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format(),
        build_sha: option_env!("SNAPRESTORE_BUILD_SHA").unwrap_or("dev"),
    };
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = RunContextGuard::new(cli.config.display().to_string());
    info!(build_sha = build_sha(), "snaprestore starting");

    let summary = run_restore(&cli.config, Arc::new(HostFs::new()))?;

    let rendered = if cli.summary_json {
        render_summary_json(&summary)?
    } else {
        render_summary_text(&summary)
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")
        .map_err(|err| AppError::output("summary.write", err))?;
    Ok(())
}

/// Load the configuration at `config_path` and run a restore over `fs`.
///
/// # Errors
///
/// Returns [`AppError::Config`] when the configuration cannot be loaded and
/// [`AppError::Restore`] when the restore fails.
pub fn run_restore(
    config_path: &Path,
    fs: Arc<dyn VolumeFs + Send + Sync>,
) -> AppResult<RestoreSummary> {
    let config = ConfigLoader::new()
        .load(config_path)
        .map_err(|err| AppError::config("config.load", err))?;
    RestoreOrchestrator::new(config, fs)
        .restore()
        .map_err(|err| AppError::restore("restore.run", err))
}

/// Human-readable summary printed after a successful restore.
#[must_use]
pub fn render_summary_text(summary: &RestoreSummary) -> String {
    let elapsed = summary.finished_at - summary.started_at;
    let mut lines = vec![
        format!(
            "restored {} into {}",
            summary.source.display(),
            summary.target.display()
        ),
        format!(
            "files: {}  directories: {}  bytes: {}  skipped: {}",
            summary.stats.files,
            summary.stats.directories,
            summary.stats.bytes,
            summary.stats.skipped
        ),
        format!("elapsed: {} ms", elapsed.num_milliseconds()),
    ];
    if summary.unmounted {
        lines.push(format!("mount {} removed", summary.mount.display()));
    } else {
        lines.push(format!("mount {} left in place", summary.mount.display()));
    }
    lines.join("\n")
}

/// JSON summary printed when `--summary-json` is set.
///
/// # Errors
///
/// Returns [`AppError::Summary`] when serialization fails.
pub fn render_summary_json(summary: &RestoreSummary) -> AppResult<String> {
    serde_json::to_string_pretty(summary).map_err(|err| AppError::summary("summary.render", err))
}
