//! Filesystem capability set used by the mounter, copier, and orchestrator.
//!
//! # Design
//! - The core only talks to [`VolumeFs`]; the host implementation is [`HostFs`].
//! - Every method returns the raw `io::Error`; callers map it into an `FsOpsError`
//!   with the operation and path attached.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

#[cfg(unix)]
use filetime::FileTime;
use sysinfo::Disks;

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory.
    Directory,
    /// A regular file.
    File,
    /// A symbolic link or reparse point, not followed.
    Link,
}

/// Entry reported by [`VolumeFs::read_dir`].
///
/// Links are classified by what they point to, so `kind` is never
/// [`EntryKind::Link`] here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name without any parent component.
    pub name: OsString,
    /// Directory or file.
    pub kind: EntryKind,
    /// Size in bytes for files; zero for directories.
    pub len: u64,
}

/// Filesystem operations required to mount a snapshot and copy it out.
pub trait VolumeFs {
    /// Inspect `path` without following a trailing link; `None` when nothing exists there.
    ///
    /// # Errors
    ///
    /// Returns the platform error for failures other than "not found".
    fn probe(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Create a directory-type symbolic link at `link` pointing at `target`.
    ///
    /// # Errors
    ///
    /// Returns the platform error when the link cannot be created.
    fn create_dir_link(&self, link: &Path, target: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::DirectoryNotEmpty`] when the directory has content.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// Remove a file or a link (including directory links).
    ///
    /// # Errors
    ///
    /// Returns the platform error when removal fails.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Enumerate the entries of a directory, following links.
    ///
    /// # Errors
    ///
    /// Returns the platform error when the directory cannot be enumerated.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Create a single directory.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::AlreadyExists`] when the path is taken.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Copy file content and basic attributes, overwriting `destination`.
    ///
    /// # Errors
    ///
    /// Returns the platform error when the copy fails.
    fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<u64>;

    /// Bytes available on the volume holding `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the volume cannot be determined.
    fn available_space(&self, path: &Path) -> io::Result<u64>;
}

/// [`VolumeFs`] backed by the host operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl HostFs {
    /// Construct the host filesystem backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl VolumeFs for HostFs {
    fn probe(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match fs::symlink_metadata(path) {
            Ok(metadata) => {
                let file_type = metadata.file_type();
                Ok(Some(if file_type.is_symlink() {
                    EntryKind::Link
                } else if file_type.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                }))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn create_dir_link(&self, link: &Path, target: &Path) -> io::Result<()> {
        symlink_dir(target, link)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileTypeExt;

            if fs::symlink_metadata(path)?.file_type().is_symlink_dir() {
                return fs::remove_dir(path);
            }
        }
        fs::remove_file(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let metadata = if file_type.is_symlink() {
                fs::metadata(entry.path()).ok()
            } else {
                Some(entry.metadata()?)
            };
            let (kind, len) = match metadata {
                Some(meta) if meta.is_dir() => (EntryKind::Directory, 0),
                Some(meta) => (EntryKind::File, meta.len()),
                None => (EntryKind::File, 0),
            };
            entries.push(DirEntry {
                name: entry.file_name(),
                kind,
                len,
            });
        }
        Ok(entries)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<u64> {
        clear_readonly(destination)?;
        let bytes = fs::copy(source, destination)?;
        copy_times(source, destination)?;
        Ok(bytes)
    }

    fn available_space(&self, path: &Path) -> io::Result<u64> {
        let resolved = std::path::absolute(path)?;
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|disk| resolved.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(sysinfo::Disk::available_space)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no mounted volume contains {}", resolved.display()),
                )
            })
    }
}

/// Make an existing read-only destination writable so it can be overwritten.
fn clear_readonly(destination: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(destination) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if !metadata.is_file() || !metadata.permissions().readonly() {
        return Ok(());
    }
    fs::set_permissions(destination, writable(&metadata.permissions()))
}

#[cfg(unix)]
fn writable(permissions: &fs::Permissions) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;

    fs::Permissions::from_mode(permissions.mode() | 0o200)
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn writable(permissions: &fs::Permissions) -> fs::Permissions {
    let mut permissions = permissions.clone();
    permissions.set_readonly(false);
    permissions
}

/// `fs::copy` only carries permissions on unix; restore the timestamps by path,
/// which needs no write access to a read-only copy.
#[cfg(unix)]
fn copy_times(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    filetime::set_file_times(
        destination,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
}

/// `CopyFileExW` already carries the attributes and last-write time.
#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn copy_times(_source: &Path, _destination: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(any(windows, unix)))]
fn symlink_dir(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "directory links are not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use filetime::FileTime;
    use std::time::{Duration, SystemTime};

    #[test]
    fn probe_reports_missing_file_and_directory() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let host = HostFs::new();
        assert_eq!(host.probe(&temp.path().join("missing"))?, None);
        assert_eq!(host.probe(temp.path())?, Some(EntryKind::Directory));
        let file = temp.path().join("file.txt");
        fs::write(&file, b"data")?;
        assert_eq!(host.probe(&file)?, Some(EntryKind::File));
        Ok(())
    }

    #[test]
    fn create_dir_reports_already_exists() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let host = HostFs::new();
        let dir = temp.path().join("sub");
        host.create_dir(&dir)?;
        let err = host.create_dir(&dir).expect_err("second create must fail");
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        Ok(())
    }

    #[test]
    fn remove_dir_refuses_non_empty_directory() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let host = HostFs::new();
        fs::write(temp.path().join("keep.txt"), b"keep")?;
        let err = host
            .remove_dir(temp.path())
            .expect_err("directory has content");
        assert_eq!(err.kind(), io::ErrorKind::DirectoryNotEmpty);
        Ok(())
    }

    #[test]
    fn copy_file_preserves_content_and_mtime() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let host = HostFs::new();
        let source = temp.path().join("source.bin");
        let destination = temp.path().join("dest.bin");
        fs::write(&source, b"snapshot bytes")?;
        let stamp =
            FileTime::from_system_time(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000));
        filetime::set_file_mtime(&source, stamp)?;
        fs::write(&destination, b"stale")?;

        let copied = host.copy_file(&source, &destination)?;

        assert_eq!(copied, 14);
        assert_eq!(fs::read(&destination)?, b"snapshot bytes");
        let metadata = fs::metadata(&destination)?;
        assert_eq!(FileTime::from_last_modification_time(&metadata), stamp);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn copy_file_restores_read_only_files_and_overwrites_them() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir()?;
        let host = HostFs::new();
        let source = temp.path().join("readonly.cfg");
        let destination = temp.path().join("restored.cfg");
        fs::write(&source, b"locked")?;
        let stamp =
            FileTime::from_system_time(SystemTime::UNIX_EPOCH + Duration::from_secs(2_000_000));
        filetime::set_file_mtime(&source, stamp)?;
        fs::set_permissions(&source, fs::Permissions::from_mode(0o444))?;

        assert_eq!(host.copy_file(&source, &destination)?, 6);
        let metadata = fs::metadata(&destination)?;
        assert_eq!(metadata.permissions().mode() & 0o777, 0o444);
        assert_eq!(FileTime::from_last_modification_time(&metadata), stamp);

        fs::set_permissions(&source, fs::Permissions::from_mode(0o644))?;
        fs::write(&source, b"unlocked")?;
        fs::set_permissions(&source, fs::Permissions::from_mode(0o444))?;

        assert_eq!(host.copy_file(&source, &destination)?, 8);
        assert_eq!(fs::read(&destination)?, b"unlocked");
        assert_eq!(
            fs::metadata(&destination)?.permissions().mode() & 0o777,
            0o444
        );
        Ok(())
    }

    #[cfg(windows)]
    #[test]
    fn copy_file_restores_read_only_files_and_overwrites_them() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let host = HostFs::new();
        let source = temp.path().join("readonly.cfg");
        let destination = temp.path().join("restored.cfg");
        fs::write(&source, b"locked")?;
        let mut permissions = fs::metadata(&source)?.permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&source, permissions)?;

        assert_eq!(host.copy_file(&source, &destination)?, 6);
        assert!(fs::metadata(&destination)?.permissions().readonly());
        assert_eq!(host.copy_file(&source, &destination)?, 6);
        assert_eq!(fs::read(&destination)?, b"locked");

        for path in [&source, &destination] {
            let mut permissions = fs::metadata(path)?.permissions();
            #[allow(clippy::permissions_set_readonly_false)]
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions)?;
        }
        Ok(())
    }

    #[test]
    fn available_space_reports_volume_of_temp_dir() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let host = HostFs::new();
        let available = host.available_space(temp.path())?;
        assert!(available > 0, "temp dir reports {available} bytes free");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn dir_links_are_probed_as_links_and_followed_by_read_dir() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let host = HostFs::new();
        let volume = temp.path().join("volume");
        fs::create_dir(&volume)?;
        fs::create_dir(volume.join("nested"))?;
        fs::write(volume.join("a.txt"), b"abc")?;
        let link = temp.path().join("mnt");

        host.create_dir_link(&link, &volume)?;

        assert_eq!(host.probe(&link)?, Some(EntryKind::Link));
        let mut entries = host.read_dir(&link)?;
        entries.sort_by(|left, right| left.name.cmp(&right.name));
        assert_eq!(
            entries,
            vec![
                DirEntry {
                    name: "a.txt".into(),
                    kind: EntryKind::File,
                    len: 3,
                },
                DirEntry {
                    name: "nested".into(),
                    kind: EntryKind::Directory,
                    len: 0,
                },
            ]
        );

        host.remove_file(&link)?;
        assert_eq!(host.probe(&link)?, None);
        assert!(volume.join("a.txt").exists());
        Ok(())
    }
}
