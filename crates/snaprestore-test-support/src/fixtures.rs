//! Sample volumes and scratch directory helpers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::memory::MemoryFs;

/// Device path of the sample Windows snapshot.
pub const WINDOWS_DEVICE: &str = r"\\?\Volume{3f1e2d4c-9a7b-4c1d-8e2f-5a6b7c8d9e0f}\";
/// Mount point used by the sample Windows scenario.
pub const WINDOWS_MOUNT: &str = r"C:\Mnt";
/// Restore target used by the sample Windows scenario.
pub const WINDOWS_TARGET: &str = r"D:\Restore";
/// Reserved metadata folder found at the root of Windows volumes.
pub const SYSTEM_VOLUME_INFORMATION: &str = "System Volume Information";

/// Files on the sample snapshot, relative to its root, excluding reserved folders.
pub const SAMPLE_FILES: &[(&str, &[u8])] = &[
    ("boot.ini", b"[boot loader]"),
    (r"Users\alice\notes.txt", b"remember the milk"),
    (r"Users\alice\docs\report.docx", b"quarterly numbers"),
    (r"Program Files\tool\tool.exe", b"MZ\x90\x00"),
];

/// Build the Windows scenario: a snapshot device with [`SAMPLE_FILES`] and a
/// populated `System Volume Information`, an existing `C:` drive, and an
/// existing empty `D:\Restore`.
#[must_use]
pub fn windows_scenario() -> MemoryFs {
    let fs = MemoryFs::new();
    for (relative, content) in SAMPLE_FILES {
        fs.add_file(format!("{WINDOWS_DEVICE}{relative}"), *content);
    }
    fs.add_file(
        format!(r"{WINDOWS_DEVICE}{SYSTEM_VOLUME_INFORMATION}\tracking.log"),
        b"do not copy".as_slice(),
    );
    fs.add_file(
        format!(r"{WINDOWS_DEVICE}Users\{SYSTEM_VOLUME_INFORMATION}\nested.log"),
        b"do not copy either".as_slice(),
    );
    fs.add_dir(r"C:\");
    fs.add_dir(WINDOWS_TARGET);
    fs
}

/// Keys [`MemoryFs::tree`] reports for a successful restore of [`windows_scenario`].
#[must_use]
pub fn expected_windows_tree() -> Vec<String> {
    let mut expected: Vec<String> = [
        "Program Files/",
        "Program Files/tool/",
        "Users/",
        "Users/alice/",
        "Users/alice/docs/",
    ]
    .into_iter()
    .map(str::to_owned)
    .chain(
        SAMPLE_FILES
            .iter()
            .map(|(relative, _)| relative.replace('\\', "/")),
    )
    .collect();
    expected.sort();
    expected
}

/// Write `files` (relative path, content) below `root`, creating parents.
///
/// # Errors
///
/// Returns an error when a directory or file cannot be written.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) -> Result<()> {
    for (relative, content) in files {
        let path = root.join(relative.replace('\\', "/"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Scratch directory removed when dropped.
///
/// # Errors
///
/// Returns an error when the temporary directory cannot be created.
pub fn scratch_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("snaprestore-")
        .tempdir()
        .context("failed to create scratch directory")
}
