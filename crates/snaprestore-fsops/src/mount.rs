//! Exposing a snapshot device as a directory link and proving it is usable.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use snaprestore_config::RestoreConfig;
use tracing::{debug, info, warn};

use crate::error::{FsOpsError, FsOpsResult};
use crate::volume::{EntryKind, VolumeFs};

/// Hook used to wait between verification attempts.
pub type PauseFn = Arc<dyn Fn(Duration) + Send + Sync>;

/// Pause implementation that blocks the calling thread.
#[must_use]
pub fn thread_sleep() -> PauseFn {
    Arc::new(std::thread::sleep)
}

/// Creates, verifies, and removes the directory link at the mount point.
pub struct VolumeMounter<'a> {
    fs: &'a dyn VolumeFs,
    source: PathBuf,
    mount_path: PathBuf,
    attempts: u32,
    delay: Duration,
    pause: PauseFn,
}

impl<'a> VolumeMounter<'a> {
    /// Build a mounter for `source` exposed at `mount_path`.
    ///
    /// `source` is rewritten to end with `separator`, the canonical form for
    /// device paths handed to link creation.
    #[must_use]
    pub fn new(fs: &'a dyn VolumeFs, source: &Path, mount_path: &Path, separator: char) -> Self {
        let defaults = snaprestore_config::RestoreOptions::default();
        Self {
            fs,
            source: with_trailing_separator(source, separator),
            mount_path: mount_path.to_path_buf(),
            attempts: defaults.verify_attempts,
            delay: defaults.verify_delay,
            pause: thread_sleep(),
        }
    }

    /// Build a mounter from a validated restore configuration.
    #[must_use]
    pub fn from_config(fs: &'a dyn VolumeFs, config: &RestoreConfig) -> Self {
        let options = config.options();
        Self::new(
            fs,
            config.snapshot_source_path(),
            config.mount_path(),
            config.convention().separator(),
        )
        .with_verification(options.verify_attempts, options.verify_delay)
    }

    /// Override the verification attempt count and the pause between attempts.
    #[must_use]
    pub fn with_verification(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.delay = delay;
        self
    }

    /// Replace the pause hook used between verification attempts.
    #[must_use]
    pub fn with_pause(mut self, pause: PauseFn) -> Self {
        self.pause = pause;
        self
    }

    /// Replace whatever occupies the mount point with a link to the source, then verify it.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`VolumeMounter::attach`] and [`VolumeMounter::verify`].
    pub fn mount(&self) -> FsOpsResult<()> {
        self.attach()?;
        self.verify()
    }

    /// Clear a stale mount and create the directory link.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::MountPathNotEmpty`] when the mount point is a
    /// directory with content, and [`FsOpsError::MountCreationFailed`] when the
    /// mount point cannot be inspected, cleared, or linked.
    pub fn attach(&self) -> FsOpsResult<()> {
        self.clear_mount_path()?;
        self.fs
            .create_dir_link(&self.mount_path, &self.source)
            .map_err(|source| FsOpsError::mount("mount.create_link", &self.mount_path, source))?;
        debug!(
            source = %self.source.display(),
            mount = %self.mount_path.display(),
            "directory link created"
        );
        Ok(())
    }

    /// Enumerate the mount until it answers, removing the link if it never does.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::MountVerificationFailed`] when every attempt fails.
    pub fn verify(&self) -> FsOpsResult<()> {
        let mut last_error = None;
        for attempt in 1..=self.attempts {
            if attempt > 1 {
                (self.pause)(self.delay);
            }
            match self.fs.read_dir(&self.mount_path) {
                Ok(entries) => {
                    info!(
                        source = %self.source.display(),
                        mount = %self.mount_path.display(),
                        attempt,
                        entries = entries.len(),
                        "snapshot mounted"
                    );
                    return Ok(());
                }
                Err(err) => {
                    debug!(
                        mount = %self.mount_path.display(),
                        attempt,
                        error = %err,
                        "mount not enumerable yet"
                    );
                    last_error = Some(err);
                }
            }
        }

        if let Err(err) = self.fs.remove_file(&self.mount_path) {
            warn!(
                mount = %self.mount_path.display(),
                error = %err,
                "failed to remove unverified mount link"
            );
        }

        Err(FsOpsError::MountVerificationFailed {
            path: self.mount_path.clone(),
            attempts: self.attempts,
            source: last_error.unwrap_or_else(|| io::Error::other("mount was never enumerated")),
        })
    }

    /// Remove the directory link; returns `false` when nothing was mounted.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Unmount`] when the mount point holds something
    /// other than a link, or when removal fails.
    pub fn unmount(&self) -> FsOpsResult<bool> {
        let kind = self
            .fs
            .probe(&self.mount_path)
            .map_err(|source| FsOpsError::Unmount {
                path: self.mount_path.clone(),
                reason: "probe failed",
                source: Some(source),
            })?;
        match kind {
            None => Ok(false),
            Some(EntryKind::Link) => {
                self.fs
                    .remove_file(&self.mount_path)
                    .map_err(|source| FsOpsError::Unmount {
                        path: self.mount_path.clone(),
                        reason: "link removal failed",
                        source: Some(source),
                    })?;
                info!(mount = %self.mount_path.display(), "snapshot unmounted");
                Ok(true)
            }
            Some(EntryKind::Directory | EntryKind::File) => Err(FsOpsError::Unmount {
                path: self.mount_path.clone(),
                reason: "mount path is not a link",
                source: None,
            }),
        }
    }

    fn clear_mount_path(&self) -> FsOpsResult<()> {
        let path = &self.mount_path;
        let kind = self
            .fs
            .probe(path)
            .map_err(|source| FsOpsError::mount("mount.probe", path, source))?;
        match kind {
            None => return Ok(()),
            Some(EntryKind::Directory) => self.fs.remove_dir(path).map_err(|source| {
                if source.kind() == io::ErrorKind::DirectoryNotEmpty {
                    FsOpsError::MountPathNotEmpty {
                        path: path.clone(),
                        source,
                    }
                } else {
                    FsOpsError::mount("mount.remove_dir", path, source)
                }
            })?,
            Some(EntryKind::File | EntryKind::Link) => self
                .fs
                .remove_file(path)
                .map_err(|source| FsOpsError::mount("mount.remove_file", path, source))?,
        }
        debug!(mount = %path.display(), "stale mount point removed");
        Ok(())
    }
}

fn with_trailing_separator(path: &Path, separator: char) -> PathBuf {
    let raw = path.as_os_str();
    if raw.to_string_lossy().ends_with(separator) {
        return path.to_path_buf();
    }
    let mut owned = raw.to_os_string();
    owned.push(separator.to_string());
    PathBuf::from(owned)
}
