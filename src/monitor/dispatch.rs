//! Event dispatch and re-arm of paths that did not exist.
//!
//! Both operations walk the table by slot index and re-check each entry
//! after every callback, so callbacks may add or remove entries
//! (including their own) without disturbing the scan in progress.

use std::io;

use super::error::MonitorError;
use super::handler::Disposition;
use super::registry::{EntryId, WatchRegistry};
use super::source::{EventKinds, SourceEvent, WatchSource};

impl<S: WatchSource> WatchRegistry<S> {
    /// Read one batch of pending events and run the matching callbacks.
    ///
    /// Never blocks: when nothing is pending this returns `Ok(0)`.
    /// Returns the number of low-level events read. Does nothing on a
    /// closed or empty registry.
    pub fn dispatch(&mut self) -> Result<usize, MonitorError> {
        if self.count == 0 {
            return Ok(0);
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };

        let events = source
            .read_pending_events()
            .map_err(|source| MonitorError::EventRead { source })?;
        let read = events.len();

        for event in events {
            self.handle_event(event);
        }

        Ok(read)
    }

    /// Retry watch creation for every entry without a live watch.
    ///
    /// A newly watched entry gets its setup callback. Entries whose path
    /// still does not exist stay pending for the next call. Returns the
    /// number of entries that became watched.
    pub fn rearm_non_existent_paths(&mut self) -> Result<usize, MonitorError> {
        if self.count == 0 || self.source.is_none() {
            return Ok(0);
        }

        let kinds = self.watch_kinds();
        let mut rearmed = 0;

        for slot in 0..self.slots.len() {
            let id = self.id_of(slot);
            let path = match &self.slots[slot].entry {
                Some(entry) if entry.handle.is_none() => entry.path.clone(),
                _ => continue,
            };

            // A callback may have closed the registry mid-scan
            let Some(source) = self.source.as_mut() else {
                break;
            };

            match source.create_watch(&path, kinds) {
                Ok(handle) => {
                    if let Some(entry) = self.slots[slot].entry.as_mut() {
                        entry.handle = Some(handle);
                    }
                    rearmed += 1;
                    crate::log_event!("monitor", "re-armed", "{}", path.display());
                    self.invoke_setup(id);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("[monitor] cannot re-arm {}: {e}", path.display());
                }
            }
        }

        Ok(rearmed)
    }

    fn handle_event(&mut self, event: SourceEvent<S::Handle>) {
        let kinds = event.kinds;

        if kinds.contains(EventKinds::OVERFLOW) {
            tracing::warn!("[dispatch] event queue overflow, events were lost");
            return;
        }
        let Some(handle) = event.handle else {
            return;
        };
        let ids: Vec<EntryId> = self
            .slots_with_handle(&handle)
            .into_iter()
            .map(|slot| self.id_of(slot))
            .collect();
        if ids.is_empty() {
            crate::debug_event!("dispatch", "unknown handle", "{handle:?} {kinds:?}");
            return;
        }

        for id in ids {
            self.route_event(id, &handle, kinds);
        }
    }

    /// Run the callback matching `kinds` for one entry holding `handle`.
    fn route_event(&mut self, id: EntryId, handle: &S::Handle, kinds: EventKinds) {
        // An earlier callback in this batch may have removed the entry or re-armed it
        let Some(entry) = self
            .entry(id)
            .filter(|entry| entry.handle.as_ref() == Some(handle))
        else {
            return;
        };
        let path = entry.path.clone();
        let on_delete = entry.callbacks.on_delete.clone();
        let on_update = entry.callbacks.on_update.clone();

        if self.config.all_events {
            crate::debug_event!("dispatch", "event", "{} {kinds:?}", path.display());
        }

        // Only one branch fires per event, delete first
        let on_delete = on_delete.filter(|_| kinds.contains(EventKinds::DELETE_SELF));
        let on_update = on_update.filter(|_| kinds.contains(EventKinds::CLOSE_WRITE));

        if let Some(callback) = on_delete {
            crate::log_event!("dispatch", "deleted", "{}", path.display());
            let disposition = callback(self, &path);
            self.apply_delete(id, handle, disposition);
        } else if let Some(callback) = on_update {
            crate::log_event!("dispatch", "updated", "{}", path.display());
            let disposition = callback(self, &path);
            if disposition == Disposition::Unmonitor && self.is_current(id) {
                self.remove_slot(id.slot());
            }
        }
    }

    /// Apply a delete callback's disposition to the entry it ran for.
    fn apply_delete(&mut self, id: EntryId, handle: &S::Handle, disposition: Disposition) {
        if !self.is_current(id) {
            return;
        }

        if disposition != Disposition::KeepMonitoring {
            self.remove_slot(id.slot());
            return;
        }

        // The callback may already have re-armed the path on a new watch
        let dropped = self.slots[id.slot()]
            .entry
            .as_mut()
            .filter(|entry| entry.handle.as_ref() == Some(handle))
            .and_then(|entry| entry.handle.take());

        if let Some(dropped) = dropped {
            self.release_watch(dropped);
            crate::debug_event!("dispatch", "awaiting re-creation", "{id:?}");
        }
    }
}
