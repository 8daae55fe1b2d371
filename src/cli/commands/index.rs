//! `fmon index`: groups of files that follow the content of an index file.
//!
//! Each index file gets its own registry, shared with the paths it lists.
//! Every setup or update of the index file reconciles the group with the
//! current list.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use tokio::task::LocalSet;

use super::watch::announcing_callbacks;
use crate::cli::event_loop::{self, StopWhen};
use crate::config::Settings;
use crate::monitor::{Callbacks, Disposition, WatchRegistry, WatchSource};

/// Read an index file: one path per line, blank lines skipped, at most
/// `limit` paths.
pub fn read_index(path: &Path, limit: usize) -> io::Result<Vec<PathBuf>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|line| !line.is_empty())
        .take(limit)
        .map(PathBuf::from)
        .collect())
}

/// Make the group in `registry` match `listed`.
///
/// Entries other than `index` that are not listed are unmonitored;
/// listed paths without an entry are added.
pub fn reconcile<S: WatchSource + 'static>(
    registry: &mut WatchRegistry<S>,
    index: &Path,
    listed: &[PathBuf],
) {
    let mut cursor = None;
    while let Some(id) = registry.next_entry(cursor) {
        cursor = Some(id);
        let Some(entry) = registry.entry(id) else {
            continue;
        };
        let path = entry.path().to_path_buf();
        if path != index && !listed.contains(&path) {
            println!("UnMonitor {}", path.display());
            if let Err(e) = registry.unmonitor(&path) {
                tracing::warn!("[index] cannot unmonitor {}: {e}", path.display());
            }
        }
    }

    for path in listed {
        if registry.is_monitored(path) {
            continue;
        }
        if let Err(e) = registry.monitor(path, announcing_callbacks(false)) {
            tracing::warn!("[index] cannot monitor {}: {e}", path.display());
        }
    }
}

fn index_updated<S: WatchSource + 'static>(
    registry: &mut WatchRegistry<S>,
    index: &Path,
) -> Disposition {
    println!("Index {} updated", index.display());

    // The index file occupies one slot itself
    let limit = registry.capacity().saturating_sub(1);
    let listed = match read_index(index, limit) {
        Ok(listed) => listed,
        Err(e) => {
            tracing::warn!("[index] cannot read {}: {e}", index.display());
            return Disposition::Unmonitor;
        }
    };

    reconcile(registry, index, &listed);
    print!("{}\n{registry}", index.display());
    Disposition::KeepMonitoring
}

fn index_deleted<S: WatchSource + 'static>(
    registry: &mut WatchRegistry<S>,
    index: &Path,
) -> Disposition {
    println!("Index {} deleted, cleaning up monitors", index.display());
    reconcile(registry, index, &[]);
    Disposition::KeepMonitoring
}

/// Callbacks for the index file of a group.
pub fn index_callbacks<S: WatchSource + 'static>() -> Callbacks<S> {
    Callbacks::new()
        .on_setup_and_update(index_updated::<S>)
        .on_delete(index_deleted::<S>)
}

pub async fn run(settings: &Settings, index_files: &[PathBuf]) -> anyhow::Result<()> {
    let max_groups = settings.daemon.max_groups;
    if index_files.len() > max_groups {
        bail!(
            "Too many file groups: {} given, at most {max_groups} allowed",
            index_files.len()
        );
    }

    println!(
        "Limits:\n Max Path Length {}\n Max Monitors per group {}\n Max Groups {max_groups}",
        settings.monitor.max_path_length, settings.monitor.max_monitors
    );

    let mut groups = Vec::with_capacity(index_files.len());
    for (group, index) in index_files.iter().enumerate() {
        println!("Adding {} to monitors group {group}", index.display());
        let mut registry = WatchRegistry::new(settings.monitor.clone())
            .context("Failed to initialize file monitor")?;
        registry
            .monitor(index, index_callbacks())
            .with_context(|| format!("Failed to monitor {}", index.display()))?;
        groups.push((format!("group {group}: {}", index.display()), registry));
    }

    let interval = settings.daemon.rearm_interval();
    let local = LocalSet::new();
    local
        .run_until(async move {
            let tasks: Vec<_> = groups
                .into_iter()
                .map(|(label, registry)| {
                    tokio::task::spawn_local(async move {
                        event_loop::run(registry, &label, interval, StopWhen::Never).await
                    })
                })
                .collect();

            for task in tasks {
                task.await??;
            }
            Ok(())
        })
        .await
}
