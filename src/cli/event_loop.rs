//! Readiness loop driving one registry on the tokio runtime.
//!
//! The registry is not `Send` (callbacks are `Rc`), so groups run as
//! local tasks on a current-thread runtime.

use std::os::fd::AsRawFd;
use std::time::Duration;

use anyhow::Context;
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use crate::monitor::{MonitorError, WatchRegistry};

/// When [`run`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopWhen {
    /// Keep going until the task is dropped.
    Never,
    /// Return once the registry has no entries left.
    Empty,
}

/// Wait for events on `registry`, dispatching them as they arrive.
///
/// Every wake, whether events arrived or `rearm_interval` passed
/// without any, is followed by a retry of the non-existent paths.
/// The entry table is printed under `label` after each dispatch.
pub async fn run(
    mut registry: WatchRegistry,
    label: &str,
    rearm_interval: Duration,
    stop: StopWhen,
) -> anyhow::Result<()> {
    let fd = registry
        .source()
        .map(AsRawFd::as_raw_fd)
        .ok_or(MonitorError::NotInitialized)?;
    let ready = AsyncFd::with_interest(fd, Interest::READABLE)
        .context("Failed to register watch source with the runtime")?;

    print!("{label}\n{registry}");

    loop {
        if stop == StopWhen::Empty && registry.is_empty() {
            crate::log_event!("loop", "finished", "{label}");
            return Ok(());
        }

        tokio::select! {
            guard = ready.readable() => {
                let mut guard = guard?;
                let mut events = 0;
                loop {
                    let read = registry.dispatch()?;
                    if read == 0 {
                        break;
                    }
                    events += read;
                }
                // Only after a read came back empty
                guard.clear_ready();
                crate::debug_event!("loop", "dispatched", "{label}: {events} events");
                print!("{label}\n{registry}");
            }
            _ = tokio::time::sleep(rearm_interval) => {}
        }

        let rearmed = registry.rearm_non_existent_paths()?;
        if rearmed > 0 {
            print!("{label}\n{registry}");
        }
    }
}
