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

//! Snaprestore process wiring.
//!
//! Layout: `cli.rs` (flags), `bootstrap.rs` (boot sequence and summary
//! output), `error.rs` (process errors and exit codes).

pub mod bootstrap;
pub mod cli;
pub mod error;

pub use bootstrap::{render_summary_json, render_summary_text, run, run_restore};
pub use cli::{Cli, LogFormatArg};
pub use error::{AppError, AppResult};
