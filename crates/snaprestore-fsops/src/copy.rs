//! Recursive tree copy from the mounted snapshot into the restore target.

use std::ffi::OsStr;
use std::io;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{FsOpsError, FsOpsResult};
use crate::volume::{DirEntry, EntryKind, VolumeFs};

/// Entry names that are never copied or descended into.
pub const RESERVED_ENTRY_NAMES: [&str; 3] = [".", "..", "System Volume Information"];

/// Returns `true` when `name` matches a reserved entry exactly (case-sensitive).
#[must_use]
pub fn is_reserved(name: &OsStr) -> bool {
    RESERVED_ENTRY_NAMES
        .iter()
        .any(|reserved| name == OsStr::new(reserved))
}

/// Counters accumulated while copying a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    /// Files written to the destination.
    pub files: u64,
    /// Directories created or reused below the destination root.
    pub directories: u64,
    /// Bytes written across all files.
    pub bytes: u64,
    /// Reserved entries that were skipped.
    pub skipped: u64,
}

/// Fail-fast recursive copier over a [`VolumeFs`].
pub struct TreeCopier<'a> {
    fs: &'a dyn VolumeFs,
}

impl<'a> TreeCopier<'a> {
    /// Build a copier over the given filesystem.
    #[must_use]
    pub fn new(fs: &'a dyn VolumeFs) -> Self {
        Self { fs }
    }

    /// Copy every non-reserved entry of `source` into `destination`.
    ///
    /// `destination` is created when missing. Existing files are overwritten.
    /// The first failure at any depth aborts the traversal; siblings after the
    /// failing entry are not attempted.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::CopyFailed`] naming the operation and path that failed.
    pub fn copy(&self, source: &Path, destination: &Path) -> FsOpsResult<CopyStats> {
        let mut stats = CopyStats::default();
        self.ensure_dir(destination)?;
        self.copy_dir(source, destination, &mut stats)?;
        debug!(
            source = %source.display(),
            destination = %destination.display(),
            files = stats.files,
            directories = stats.directories,
            bytes = stats.bytes,
            skipped = stats.skipped,
            "tree copied"
        );
        Ok(stats)
    }

    /// Total file bytes [`TreeCopier::copy`] would write for `source`.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::CopyFailed`] when a directory cannot be enumerated.
    pub fn measure(&self, source: &Path) -> FsOpsResult<u64> {
        let mut total = 0_u64;
        for entry in self.entries(source)? {
            if is_reserved(&entry.name) {
                continue;
            }
            total = total.saturating_add(match entry.kind {
                EntryKind::Directory => self.measure(&source.join(&entry.name))?,
                EntryKind::File | EntryKind::Link => entry.len,
            });
        }
        Ok(total)
    }

    fn copy_dir(&self, source: &Path, destination: &Path, stats: &mut CopyStats) -> FsOpsResult<()> {
        for entry in self.entries(source)? {
            if is_reserved(&entry.name) {
                trace!(parent = %source.display(), name = ?entry.name, "reserved entry skipped");
                stats.skipped += 1;
                continue;
            }
            let from = source.join(&entry.name);
            let to = destination.join(&entry.name);
            match entry.kind {
                EntryKind::Directory => {
                    self.ensure_dir(&to)?;
                    stats.directories += 1;
                    self.copy_dir(&from, &to, stats)?;
                }
                EntryKind::File | EntryKind::Link => {
                    let bytes = self
                        .fs
                        .copy_file(&from, &to)
                        .map_err(|source_err| FsOpsError::copy("copy.copy_file", &to, source_err))?;
                    stats.files += 1;
                    stats.bytes = stats.bytes.saturating_add(bytes);
                }
            }
        }
        Ok(())
    }

    fn entries(&self, dir: &Path) -> FsOpsResult<Vec<DirEntry>> {
        self.fs
            .read_dir(dir)
            .map_err(|source_err| FsOpsError::copy("copy.read_dir", dir, source_err))
    }

    fn ensure_dir(&self, path: &Path) -> FsOpsResult<()> {
        match self.fs.create_dir(path) {
            Err(err) if err.kind() != io::ErrorKind::AlreadyExists => {
                Err(FsOpsError::copy("copy.create_dir", path, err))
            }
            _ => Ok(()),
        }
    }
}
