//! Run-scoped span helpers.
//!
//! # Design
//! - Provides a process-level span guard so every event of a run carries the
//!   configuration source and build info.

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the run-level span entered for the lifetime of the process.
pub struct RunContextGuard {
    _guard: Entered<'static>,
}

impl RunContextGuard {
    /// Enter the run-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(config_source: impl Into<String>) -> Self {
        let config_source = config_source.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "restore_run",
            config = %config_source,
            build_sha = %build_sha(),
            phase = tracing::field::Empty,
        )));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Record the current restore phase on the active span.
pub fn record_phase(phase: &str) {
    Span::current().record("phase", tracing::field::display(phase));
}
