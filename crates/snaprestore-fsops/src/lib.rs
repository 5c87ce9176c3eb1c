#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Snapshot mount and restore pipeline.
//!
//! Layout: `volume.rs` (filesystem capability set and host backend),
//! `mount.rs` (directory-link mount and verification), `copy.rs` (recursive
//! tree copy), `service.rs` (restore state machine), `error.rs` (typed errors).

pub mod copy;
pub mod error;
pub mod mount;
pub mod service;
pub mod volume;

pub use copy::{CopyStats, RESERVED_ENTRY_NAMES, TreeCopier, is_reserved};
pub use error::{FsOpsError, FsOpsResult};
pub use mount::{PauseFn, VolumeMounter, thread_sleep};
pub use service::{RestoreOrchestrator, RestoreState, RestoreSummary};
pub use volume::{DirEntry, EntryKind, HostFs, VolumeFs};
