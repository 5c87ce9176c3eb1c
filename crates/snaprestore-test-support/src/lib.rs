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

//! Shared test helpers used across integration suites.
//! Layout: memory.rs (in-memory filesystem fake), fixtures.rs (sample volumes and scratch trees).

pub mod fixtures;
pub mod memory;

pub use memory::{FsCall, FsOp, MemoryFs, key_of};
