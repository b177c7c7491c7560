//! Run-level errors for the scan engine.
//!
//! Per-port failures never show up here; they are reported as a
//! [`ProbeStatus`](crate::types::ProbeStatus) on the port's result.

use thiserror::Error;

/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Faults that stop a scan before or while it runs.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The target host name did not resolve to any address.
    #[error("failed to resolve target {target}: {reason}")]
    Resolve { target: String, reason: String },

    /// The requested port selection is unusable.
    #[error("invalid port selection: {0}")]
    InvalidPorts(String),

    /// The worker pool semaphore was closed while ports were still queued.
    #[error("worker pool closed unexpectedly")]
    PoolClosed,
}
