//! `fmon watch`: one group of files given on the command line.

use std::path::PathBuf;

use anyhow::Context;
use owo_colors::OwoColorize;

use crate::cli::event_loop::{self, StopWhen};
use crate::config::Settings;
use crate::monitor::{Callbacks, Disposition, MonitorStatus, WatchRegistry, WatchSource};

/// Callbacks announcing each event on stdout.
///
/// Deleted files stay monitored so they are picked up again when they
/// come back. With `until_changed` the first update removes the file.
pub fn announcing_callbacks<S: WatchSource + 'static>(until_changed: bool) -> Callbacks<S> {
    Callbacks::new()
        .on_watch_setup(|_, path| {
            println!("{} watched", path.display().green());
            Disposition::Ok
        })
        .on_update(move |_, path| {
            if until_changed {
                println!("{} updated, removing", path.display().yellow());
                Disposition::Unmonitor
            } else {
                println!("{} updated", path.display().yellow());
                Disposition::Ok
            }
        })
        .on_delete(|_, path| {
            println!("{} deleted", path.display().red());
            Disposition::KeepMonitoring
        })
}

pub async fn run(settings: &Settings, paths: &[PathBuf], until_changed: bool) -> anyhow::Result<()> {
    let mut registry = WatchRegistry::new(settings.monitor.clone())
        .context("Failed to initialize file monitor")?;

    for path in paths {
        println!("Adding {} to monitors", path.display());
        let status = registry
            .monitor(path, announcing_callbacks(until_changed))
            .with_context(|| format!("Failed to monitor {}", path.display()))?;
        if status == MonitorStatus::PendingCreation {
            println!("{} does not exist yet", path.display().dimmed());
        }
    }

    let stop = if until_changed {
        StopWhen::Empty
    } else {
        StopWhen::Never
    };
    event_loop::run(registry, "watch", settings.daemon.rearm_interval(), stop).await
}
