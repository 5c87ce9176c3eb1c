#![cfg(unix)]

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use filetime::FileTime;
use snaprestore_config::{PathConvention, RestoreConfig, RestoreOptions};
use snaprestore_fsops::{DirEntry, EntryKind, HostFs, RestoreOrchestrator, VolumeFs};
use snaprestore_test_support::fixtures::{scratch_dir, write_tree};
use walkdir::WalkDir;

const DEVICE: &str = "/dev/snaprestore-fixture";

/// Host filesystem that resolves links to [`DEVICE`] into a scratch directory.
struct DeviceMapFs {
    host: HostFs,
    backing: PathBuf,
}

impl DeviceMapFs {
    fn map(&self, path: &Path) -> PathBuf {
        path.strip_prefix(DEVICE)
            .map_or_else(|_| path.to_path_buf(), |rest| self.backing.join(rest))
    }
}

impl VolumeFs for DeviceMapFs {
    fn probe(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        self.host.probe(path)
    }

    fn create_dir_link(&self, link: &Path, target: &Path) -> io::Result<()> {
        self.host.create_dir_link(link, &self.map(target))
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.host.remove_dir(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.host.remove_file(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.host.read_dir(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.host.create_dir(path)
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<u64> {
        self.host.copy_file(source, destination)
    }

    fn available_space(&self, path: &Path) -> io::Result<u64> {
        self.host.available_space(path)
    }
}

fn relative_entries(root: &Path) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(root)?.to_string_lossy().into_owned();
        entries.push(if entry.file_type().is_dir() {
            format!("{relative}/")
        } else {
            relative
        });
    }
    Ok(entries)
}

#[test]
fn host_restore_copies_tree_through_real_link() -> Result<()> {
    let scratch = scratch_dir()?;
    let volume = scratch.path().join("volume");
    let target = scratch.path().join("restore");
    let mount = scratch.path().join("mnt");
    write_tree(
        &volume,
        &[
            ("etc/hosts", b"127.0.0.1 localhost"),
            ("home/alice/.profile", b"export EDITOR=vi"),
            ("home/alice/bin/run.sh", b"#!/bin/sh\necho ok\n"),
            ("System Volume Information/IndexerVolumeGuid", b"guid"),
        ],
    )?;
    fs::create_dir(&target)?;
    fs::create_dir(&mount)?;

    let script = volume.join("home/alice/bin/run.sh");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o750))?;
    let stamp = FileTime::from_system_time(SystemTime::UNIX_EPOCH + Duration::from_secs(86_400));
    filetime::set_file_mtime(&script, stamp)?;

    let config = RestoreConfig::new(
        DEVICE,
        &target.to_string_lossy(),
        &mount.to_string_lossy(),
        PathConvention::Posix,
    )?
    .with_options(RestoreOptions {
        unmount_on_success: true,
        verify_delay: Duration::ZERO,
        ..RestoreOptions::default()
    });
    let backend = Arc::new(DeviceMapFs {
        host: HostFs::new(),
        backing: volume.clone(),
    });

    let summary = RestoreOrchestrator::new(config, backend).restore()?;

    assert_eq!(
        relative_entries(&target)?,
        vec![
            "etc/",
            "etc/hosts",
            "home/",
            "home/alice/",
            "home/alice/.profile",
            "home/alice/bin/",
            "home/alice/bin/run.sh",
        ]
    );
    assert_eq!(fs::read(target.join("etc/hosts"))?, b"127.0.0.1 localhost");
    let restored = fs::metadata(target.join("home/alice/bin/run.sh"))?;
    assert_eq!(restored.permissions().mode() & 0o777, 0o750);
    assert_eq!(FileTime::from_last_modification_time(&restored), stamp);
    assert_eq!(summary.stats.files, 3);
    assert!(summary.unmounted);
    assert!(fs::symlink_metadata(&mount).is_err());
    assert!(volume.join("etc/hosts").exists());
    Ok(())
}

#[test]
fn host_restore_leaves_link_by_default() -> Result<()> {
    let scratch = scratch_dir()?;
    let volume = scratch.path().join("volume");
    let target = scratch.path().join("restore");
    let mount = scratch.path().join("mnt");
    write_tree(&volume, &[("data.txt", b"payload")])?;
    fs::create_dir(&target)?;

    let config = RestoreConfig::new(
        DEVICE,
        &target.to_string_lossy(),
        &mount.to_string_lossy(),
        PathConvention::Posix,
    )?
    .with_options(RestoreOptions {
        verify_delay: Duration::ZERO,
        ..RestoreOptions::default()
    });
    let backend = Arc::new(DeviceMapFs {
        host: HostFs::new(),
        backing: volume,
    });

    let summary = RestoreOrchestrator::new(config, backend).restore()?;

    assert!(!summary.unmounted);
    assert!(fs::symlink_metadata(&mount)?.file_type().is_symlink());
    assert_eq!(fs::read(mount.join("data.txt"))?, b"payload");
    assert_eq!(fs::read(target.join("data.txt"))?, b"payload");
    Ok(())
}
