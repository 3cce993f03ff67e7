//! Reporting of unexpected engine failures
//!
//! Internal failures are handed to a [`DiagnosticsSink`] before they are
//! returned to the caller. Reporting is fire-and-forget: a sink cannot
//! change the outcome of a diff.

use crate::error::DiffError;
use std::fmt;

/// Receiver for internal failures
pub trait DiagnosticsSink: Send + Sync + fmt::Debug {
    /// Record a failure. Must not block.
    fn report(&self, error: &DiffError);
}

/// Forwards failures to the `tracing` subscriber at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&self, error: &DiffError) {
        tracing::error!(error = %error, "diff computation failed");
    }
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl DiagnosticsSink for NoopDiagnostics {
    fn report(&self, _error: &DiffError) {}
}
