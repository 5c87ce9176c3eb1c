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

//! Restore configuration: typed model, path validation, and document loading.
//!
//! Layout: `model.rs` (typed config), `validate.rs` (path normalization and
//! field parsing), `loader.rs` (JSON documents), `defaults.rs` (keys and defaults).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use model::{PathConvention, RestoreConfig, RestoreOptions};
pub use validate::{normalize_device_path, normalize_path};
