//! Bounded file monitor with update/delete callbacks.
//!
//! This module keeps a fixed-capacity table of monitored paths, maps
//! OS watch handles back to entries and turns low-level events into
//! callback invocations.
//!
//! # Architecture
//!
//! ```text
//! caller readiness loop (select/epoll/AsyncFd)
//!         |
//!         v
//! WatchRegistry ---- WatchSource (InotifySource)
//!   - slots: path, handle, Callbacks
//!   - monitor / unmonitor / lookups
//!   - dispatch: events -> on_update / on_delete
//!   - rearm_non_existent_paths: Pending -> Watched, on_watch_setup
//! ```
//!
//! Each entry is either `Pending` (no live watch) or `Watched`. A delete
//! callback answering [`Disposition::KeepMonitoring`] moves it back to
//! `Pending`, and the re-arm scan picks it up once the file exists again.

mod dispatch;
mod error;
mod handler;
mod inotify_source;
mod registry;
mod source;
#[cfg(test)]
pub(crate) mod testing;

pub use error::MonitorError;
pub use handler::{Callback, Callbacks, Disposition};
pub use inotify_source::{InotifySource, MIN_EVENT_BUFFER_SIZE};
pub use registry::{EntryId, MonitorEntry, MonitorStatus, UnmonitorStatus, WatchRegistry};
pub use source::{EventKinds, SourceEvent, WatchSource};
