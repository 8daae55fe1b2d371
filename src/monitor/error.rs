//! Error types for the file monitor.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from registry and dispatch operations.
///
/// A path that does not exist yet is not an error: `monitor` reports it
/// as [`MonitorStatus::PendingCreation`](super::MonitorStatus), and
/// `unmonitor` of an unknown path reports
/// [`UnmonitorStatus::NotFound`](super::UnmonitorStatus).
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Registry is not initialized (watch source closed)")]
    NotInitialized,

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("No free monitor slot (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("Cannot watch path {path}: {source}")]
    WatchCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to initialize watch source: {source}")]
    InitFailed {
        #[source]
        source: io::Error,
    },

    #[error("Failed to read watch events: {source}")]
    EventRead {
        #[source]
        source: io::Error,
    },
}

impl MonitorError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        MonitorError::InvalidArgument {
            reason: reason.into(),
        }
    }
}
