//! Restore pipeline: mount the snapshot, check preconditions, copy the tree.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use snaprestore_config::RestoreConfig;
use snaprestore_telemetry::record_phase;
use tracing::{error, info, warn};

use crate::copy::{CopyStats, TreeCopier};
use crate::error::{FsOpsError, FsOpsResult};
use crate::mount::{PauseFn, VolumeMounter, thread_sleep};
use crate::volume::{EntryKind, HostFs, VolumeFs};

/// Lifecycle states of a restore run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreState {
    /// No run in progress.
    Idle,
    /// Creating the directory link.
    Mounting,
    /// Waiting for the mount to become enumerable.
    Verifying,
    /// Copying the snapshot tree into the target.
    Copying,
    /// The last run completed successfully.
    Done,
    /// The last run failed.
    Failed,
}

impl RestoreState {
    /// Stable identifier used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Mounting => "mounting",
            Self::Verifying => "verifying",
            Self::Copying => "copying",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Record of a successful restore run.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreSummary {
    /// Snapshot device path that was mounted.
    pub source: PathBuf,
    /// Mount point used for the copy.
    pub mount: PathBuf,
    /// Directory the snapshot was restored into.
    pub target: PathBuf,
    /// Copy counters.
    pub stats: CopyStats,
    /// Whether the mount link was removed after the copy.
    pub unmounted: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// Sequences mounting, precondition checks, and the tree copy.
pub struct RestoreOrchestrator {
    config: RestoreConfig,
    fs: Arc<dyn VolumeFs + Send + Sync>,
    pause: PauseFn,
    state: RestoreState,
    history: Vec<RestoreState>,
}

impl RestoreOrchestrator {
    /// Build an orchestrator over an arbitrary filesystem backend.
    #[must_use]
    pub fn new(config: RestoreConfig, fs: Arc<dyn VolumeFs + Send + Sync>) -> Self {
        Self {
            config,
            fs,
            pause: thread_sleep(),
            state: RestoreState::Idle,
            history: vec![RestoreState::Idle],
        }
    }

    /// Build an orchestrator over the host filesystem.
    #[must_use]
    pub fn with_host_fs(config: RestoreConfig) -> Self {
        Self::new(config, Arc::new(HostFs::new()))
    }

    /// Replace the pause hook used between mount verification attempts.
    #[must_use]
    pub fn with_pause(mut self, pause: PauseFn) -> Self {
        self.pause = pause;
        self
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RestoreState {
        self.state
    }

    /// States entered since construction, oldest first.
    #[must_use]
    pub fn history(&self) -> &[RestoreState] {
        &self.history
    }

    /// Run the full restore.
    ///
    /// A live mount is left in place when a later phase fails so the operator
    /// can inspect it.
    ///
    /// # Errors
    ///
    /// Returns the first [`FsOpsError`] raised by any phase; the state becomes
    /// [`RestoreState::Failed`].
    pub fn restore(&mut self) -> FsOpsResult<RestoreSummary> {
        if self.state != RestoreState::Idle {
            self.transition(RestoreState::Idle);
        }
        let started_at = Utc::now();
        match self.run() {
            Ok((stats, unmounted)) => {
                self.transition(RestoreState::Done);
                let summary = RestoreSummary {
                    source: self.config.snapshot_source_path().to_path_buf(),
                    mount: self.config.mount_path().to_path_buf(),
                    target: self.config.target_path().to_path_buf(),
                    stats,
                    unmounted,
                    started_at,
                    finished_at: Utc::now(),
                };
                info!(
                    target_path = %summary.target.display(),
                    files = stats.files,
                    bytes = stats.bytes,
                    "restore completed"
                );
                Ok(summary)
            }
            Err(err) => {
                let failed_in = self.state;
                self.transition(RestoreState::Failed);
                error!(phase = failed_in.as_str(), error = %err.detail(), "restore failed");
                Err(err)
            }
        }
    }

    fn run(&mut self) -> FsOpsResult<(CopyStats, bool)> {
        let fs = Arc::clone(&self.fs);
        let mounter = VolumeMounter::from_config(fs.as_ref(), &self.config)
            .with_pause(Arc::clone(&self.pause));
        let copier = TreeCopier::new(fs.as_ref());

        self.transition(RestoreState::Mounting);
        mounter.attach()?;
        self.transition(RestoreState::Verifying);
        mounter.verify()?;

        self.check_preconditions(fs.as_ref(), &copier)?;

        self.transition(RestoreState::Copying);
        let stats = copier.copy(self.config.mount_path(), self.config.target_path())?;

        let unmounted = if self.config.options().unmount_on_success {
            match mounter.unmount() {
                Ok(removed) => removed,
                Err(err) => {
                    warn!(error = %err.detail(), "failed to remove mount after restore");
                    false
                }
            }
        } else {
            false
        };
        Ok((stats, unmounted))
    }

    fn check_preconditions(&self, fs: &dyn VolumeFs, copier: &TreeCopier<'_>) -> FsOpsResult<()> {
        let target = self.config.target_path();
        match fs.probe(target) {
            Ok(Some(EntryKind::Directory | EntryKind::Link)) => {}
            Ok(Some(EntryKind::File) | None) => {
                return Err(FsOpsError::PreconditionFailed {
                    path: target.to_path_buf(),
                    source: None,
                });
            }
            Err(source) => {
                return Err(FsOpsError::PreconditionFailed {
                    path: target.to_path_buf(),
                    source: Some(source),
                });
            }
        }

        if self.config.options().check_capacity {
            let required = copier.measure(self.config.mount_path())?;
            let available = fs
                .available_space(target)
                .map_err(|source| FsOpsError::SpaceQuery {
                    path: target.to_path_buf(),
                    source,
                })?;
            if required > available {
                return Err(FsOpsError::InsufficientSpace {
                    path: target.to_path_buf(),
                    required,
                    available,
                });
            }
            info!(required, available, "capacity check passed");
        }
        Ok(())
    }

    fn transition(&mut self, next: RestoreState) {
        info!(from = self.state.as_str(), to = next.as_str(), "restore state changed");
        record_phase(next.as_str());
        self.state = next;
        self.history.push(next);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use anyhow::Result;
    use snaprestore_config::{PathConvention, RestoreOptions};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    fn host_config(root: &Path, options: RestoreOptions) -> Result<RestoreConfig> {
        Ok(RestoreConfig::new(
            "/dev/snaprestore-missing-device",
            &root.join("restore").to_string_lossy(),
            &root.join("mnt").to_string_lossy(),
            PathConvention::Posix,
        )?
        .with_options(options))
    }

    fn quick_options() -> RestoreOptions {
        RestoreOptions {
            verify_attempts: 2,
            verify_delay: Duration::ZERO,
            ..RestoreOptions::default()
        }
    }

    #[test]
    fn state_names_are_stable() {
        assert_eq!(RestoreState::Idle.as_str(), "idle");
        assert_eq!(RestoreState::Verifying.as_str(), "verifying");
        assert_eq!(RestoreState::Failed.as_str(), "failed");
    }

    #[test]
    fn unreachable_device_fails_in_verification() -> Result<()> {
        let temp = tempfile::tempdir()?;
        fs::create_dir(temp.path().join("restore"))?;
        let config = host_config(temp.path(), quick_options())?;
        let mut orchestrator = RestoreOrchestrator::with_host_fs(config)
            .with_pause(Arc::new(|_: Duration| {}));

        let err = orchestrator.restore().expect_err("device is not mountable");

        assert!(matches!(err, FsOpsError::MountVerificationFailed { attempts: 2, .. }));
        assert_eq!(orchestrator.state(), RestoreState::Failed);
        assert_eq!(
            orchestrator.history(),
            &[
                RestoreState::Idle,
                RestoreState::Mounting,
                RestoreState::Verifying,
                RestoreState::Failed,
            ]
        );
        assert!(fs::symlink_metadata(temp.path().join("mnt")).is_err());
        Ok(())
    }
}
