//! Bounded table of monitored paths.
//!
//! Each slot binds one application path to an optional OS watch handle
//! and its callbacks. Slots carry a generation counter so an entry can
//! be identified across callbacks that mutate the table: an [`EntryId`]
//! stays valid only while the slot still holds the same entry instance.

use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use super::error::MonitorError;
use super::handler::{Callbacks, Disposition};
use super::inotify_source::{InotifySource, MIN_EVENT_BUFFER_SIZE};
use super::source::{EventKinds, WatchSource};
use crate::config::MonitorConfig;

/// Result of a successful [`WatchRegistry::monitor`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    /// The path is stored and its OS watch is live.
    Registered,
    /// The path does not exist yet; it is stored without a watch and
    /// picked up by [`WatchRegistry::rearm_non_existent_paths`].
    PendingCreation,
}

/// Result of a successful [`WatchRegistry::unmonitor`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmonitorStatus {
    Removed,
    NotFound,
}

/// Opaque position of one entry in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    slot: usize,
    generation: u64,
}

impl EntryId {
    pub(crate) fn slot(&self) -> usize {
        self.slot
    }
}

/// One monitored path.
pub struct MonitorEntry<S: WatchSource = InotifySource> {
    pub(crate) path: PathBuf,
    pub(crate) handle: Option<S::Handle>,
    pub(crate) callbacks: Callbacks<S>,
}

impl<S: WatchSource> MonitorEntry<S> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// OS watch handle, absent while the path has no live watch.
    pub fn handle(&self) -> Option<&S::Handle> {
        self.handle.as_ref()
    }

    pub fn is_watched(&self) -> bool {
        self.handle.is_some()
    }

    pub fn has_on_watch_setup(&self) -> bool {
        self.callbacks.on_watch_setup.is_some()
    }

    pub fn has_on_update(&self) -> bool {
        self.callbacks.on_update.is_some()
    }

    pub fn has_on_delete(&self) -> bool {
        self.callbacks.on_delete.is_some()
    }
}

impl<S: WatchSource> fmt::Debug for MonitorEntry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorEntry")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

pub(crate) struct Slot<S: WatchSource> {
    pub(crate) generation: u64,
    pub(crate) entry: Option<MonitorEntry<S>>,
}

/// Fixed-capacity registry of monitored paths.
///
/// Owns its watch source exclusively. All operations are synchronous
/// and meant to be driven from a single thread; callbacks are invoked
/// re-entrantly from [`monitor`](Self::monitor),
/// [`dispatch`](Self::dispatch) and
/// [`rearm_non_existent_paths`](Self::rearm_non_existent_paths).
pub struct WatchRegistry<S: WatchSource = InotifySource> {
    pub(crate) source: Option<S>,
    pub(crate) slots: Vec<Slot<S>>,
    pub(crate) count: usize,
    next_free: usize,
    pub(crate) config: MonitorConfig,
}

impl WatchRegistry<InotifySource> {
    /// Create a registry on a fresh inotify instance.
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        if config.event_buffer_size < MIN_EVENT_BUFFER_SIZE {
            return Err(MonitorError::invalid(format!(
                "event_buffer_size must be at least {MIN_EVENT_BUFFER_SIZE} bytes"
            )));
        }
        let source = InotifySource::open(config.event_buffer_size)
            .map_err(|source| MonitorError::InitFailed { source })?;
        Self::with_source(source, config)
    }

    /// Reset the table and reacquire an inotify instance, also after [`close`](Self::close).
    pub fn reopen(&mut self) -> Result<(), MonitorError> {
        self.close();
        let source = InotifySource::open(self.config.event_buffer_size)
            .map_err(|source| MonitorError::InitFailed { source })?;
        self.source = Some(source);
        crate::debug_event!("monitor", "reopened");
        Ok(())
    }
}

impl<S: WatchSource> WatchRegistry<S> {
    /// Create a registry on the given watch source.
    pub fn with_source(source: S, config: MonitorConfig) -> Result<Self, MonitorError> {
        if config.max_monitors == 0 {
            return Err(MonitorError::invalid("max_monitors must be at least 1"));
        }
        if config.max_path_length < 2 {
            return Err(MonitorError::invalid("max_path_length must be at least 2"));
        }

        let slots = (0..config.max_monitors)
            .map(|_| Slot {
                generation: 0,
                entry: None,
            })
            .collect();

        Ok(Self {
            source: Some(source),
            slots,
            count: 0,
            next_free: 0,
            config,
        })
    }

    /// Release every watch and empty every slot, keeping the watch source.
    pub fn reset(&mut self) -> Result<(), MonitorError> {
        if self.source.is_none() {
            return Err(MonitorError::NotInitialized);
        }
        self.clear_slots();
        Ok(())
    }

    /// Release every watch and drop the watch source.
    ///
    /// Afterwards mutating operations fail with
    /// [`MonitorError::NotInitialized`] and queries report nothing.
    pub fn close(&mut self) {
        self.clear_slots();
        self.source = None;
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// The watch source, for waiting on its descriptor.
    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Maximum number of concurrently monitored paths.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of monitored paths.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Start monitoring `path`, or replace the callbacks of an existing entry.
    ///
    /// When the path does not exist the entry is still stored and the
    /// result is [`MonitorStatus::PendingCreation`]. When a watch was
    /// created and the setup callback is present it runs before this
    /// returns; if it answers [`Disposition::Unmonitor`] the entry is
    /// removed again.
    pub fn monitor(
        &mut self,
        path: impl AsRef<Path>,
        callbacks: Callbacks<S>,
    ) -> Result<MonitorStatus, MonitorError> {
        if self.source.is_none() {
            return Err(MonitorError::NotInitialized);
        }
        let path = self.bounded_path(path.as_ref())?;

        let existing = self.find_path(&path);
        let slot = match existing {
            Some(slot) => slot,
            None => self
                .find_free_slot()
                .ok_or(MonitorError::CapacityExceeded {
                    capacity: self.capacity(),
                })?,
        };

        let handle = self.create_watch(&path)?;
        let status = if handle.is_some() {
            MonitorStatus::Registered
        } else {
            MonitorStatus::PendingCreation
        };

        if existing.is_some() {
            let stale = self.slots[slot]
                .entry
                .as_mut()
                .and_then(|entry| {
                    entry.callbacks = callbacks;
                    std::mem::replace(&mut entry.handle, handle.clone())
                })
                .filter(|old| Some(old) != handle.as_ref());
            if let Some(old) = stale {
                self.release_watch(old);
            }
            crate::debug_event!("monitor", "replaced", "{}", path.display());
        } else {
            let target = &mut self.slots[slot];
            target.generation += 1;
            target.entry = Some(MonitorEntry {
                path: path.clone(),
                handle: handle.clone(),
                callbacks,
            });
            self.count += 1;
            self.next_free = self.next_free_after(slot);
        }

        match status {
            MonitorStatus::Registered => {
                crate::log_event!("monitor", "registered", "{}", path.display())
            }
            MonitorStatus::PendingCreation => {
                crate::log_event!("monitor", "pending", "{}", path.display())
            }
        }

        if handle.is_some() {
            let id = self.id_of(slot);
            self.invoke_setup(id);
        }

        Ok(status)
    }

    /// Stop monitoring `path` and free its slot.
    pub fn unmonitor(&mut self, path: impl AsRef<Path>) -> Result<UnmonitorStatus, MonitorError> {
        if self.source.is_none() {
            return Err(MonitorError::NotInitialized);
        }
        let path = self.bounded_path(path.as_ref())?;

        match self.find_path(&path) {
            Some(slot) => {
                self.remove_slot(slot);
                Ok(UnmonitorStatus::Removed)
            }
            None => Ok(UnmonitorStatus::NotFound),
        }
    }

    /// Whether `path` has an entry, watched or not.
    pub fn is_monitored(&self, path: impl AsRef<Path>) -> bool {
        if self.source.is_none() {
            return false;
        }
        self.bounded_path(path.as_ref())
            .map(|path| self.find_path(&path).is_some())
            .unwrap_or(false)
    }

    /// Whether any entry is waiting for its path to come into existence.
    pub fn has_non_existent_paths(&self) -> bool {
        self.iter().any(|entry| !entry.is_watched())
    }

    /// Number of entries without a live watch.
    pub fn non_existent_count(&self) -> Result<usize, MonitorError> {
        if self.source.is_none() {
            return Err(MonitorError::NotInitialized);
        }
        Ok(self.iter().filter(|entry| !entry.is_watched()).count())
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &MonitorEntry<S>> {
        self.slots.iter().filter_map(|slot| slot.entry.as_ref())
    }

    /// Snapshot of the monitored paths in slot order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.iter().map(|entry| entry.path.clone()).collect()
    }

    /// The next live entry after `after`, or the first one for `None`.
    ///
    /// Unlike [`iter`](Self::iter) this holds no borrow between steps,
    /// so the table may be changed while walking it.
    pub fn next_entry(&self, after: Option<EntryId>) -> Option<EntryId> {
        let start = after.map_or(0, |id| id.slot + 1);
        (start..self.slots.len())
            .find(|&slot| self.slots[slot].entry.is_some())
            .map(|slot| self.id_of(slot))
    }

    /// The entry behind `id`, if the slot still holds that entry.
    pub fn entry(&self, id: EntryId) -> Option<&MonitorEntry<S>> {
        let slot = self.slots.get(id.slot)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    pub(crate) fn id_of(&self, slot: usize) -> EntryId {
        EntryId {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    pub(crate) fn is_current(&self, id: EntryId) -> bool {
        self.entry(id).is_some()
    }

    pub(crate) fn watch_kinds(&self) -> EventKinds {
        if self.config.all_events {
            EventKinds::ARMABLE
        } else {
            EventKinds::MONITORED
        }
    }

    /// Arm a watch; `None` when the path does not exist.
    fn create_watch(&mut self, path: &Path) -> Result<Option<S::Handle>, MonitorError> {
        let kinds = self.watch_kinds();
        let source = self.source.as_mut().ok_or(MonitorError::NotInitialized)?;

        match source.create_watch(path, kinds) {
            Ok(handle) => Ok(Some(handle)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(MonitorError::WatchCreationFailed {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Run the setup callback of `id`, removing the entry on `Unmonitor`.
    pub(crate) fn invoke_setup(&mut self, id: EntryId) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let Some(callback) = entry.callbacks.on_watch_setup.clone() else {
            return;
        };
        let path = entry.path.clone();

        crate::debug_event!("monitor", "watch setup", "{}", path.display());
        let disposition = callback(self, &path);

        if disposition == Disposition::Unmonitor && self.is_current(id) {
            self.remove_slot(id.slot);
        }
    }

    /// Free a slot, releasing its watch.
    pub(crate) fn remove_slot(&mut self, slot: usize) {
        let Some(entry) = self.slots[slot].entry.take() else {
            return;
        };
        self.count -= 1;
        if let Some(handle) = entry.handle {
            self.release_watch(handle);
        }
        crate::log_event!("monitor", "removed", "{}", entry.path.display());
    }

    /// Release an OS watch unless another entry still relies on it.
    ///
    /// Aliased paths of one file (`a` and `./a`) share a kernel watch.
    pub(crate) fn release_watch(&mut self, handle: S::Handle) {
        let shared = self.iter().any(|entry| entry.handle.as_ref() == Some(&handle));
        if shared {
            return;
        }
        if let Some(source) = self.source.as_mut() {
            if let Err(e) = source.remove_watch(&handle) {
                // The kernel drops watches of deleted files on its own
                crate::debug_event!("monitor", "release failed", "{handle:?}: {e}");
            }
        }
    }

    /// Every slot holding `handle`.
    ///
    /// Aliased paths of one file share a kernel watch, so more than one
    /// entry can hold the same handle.
    pub(crate) fn slots_with_handle(&self, handle: &S::Handle) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.entry
                    .as_ref()
                    .is_some_and(|entry| entry.handle.as_ref() == Some(handle))
            })
            .map(|(slot, _)| slot)
            .collect()
    }

    fn find_path(&self, path: &Path) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.entry
                .as_ref()
                .is_some_and(|entry| entry.path.as_os_str() == path.as_os_str())
        })
    }

    /// First free slot scanning from the allocation cursor, wrapping.
    fn find_free_slot(&self) -> Option<usize> {
        let len = self.slots.len();
        (0..len)
            .map(|offset| (self.next_free + offset) % len)
            .find(|&slot| self.slots[slot].entry.is_none())
    }

    /// Cursor position after claiming `claimed`.
    fn next_free_after(&self, claimed: usize) -> usize {
        let len = self.slots.len();
        (1..len)
            .map(|offset| (claimed + offset) % len)
            .find(|&slot| self.slots[slot].entry.is_none())
            .unwrap_or((claimed + 1) % len)
    }

    /// Validate `path` and cut it to `max_path_length - 1` bytes.
    fn bounded_path(&self, path: &Path) -> Result<PathBuf, MonitorError> {
        let bytes = path.as_os_str().as_bytes();
        if bytes.is_empty() {
            return Err(MonitorError::invalid("path is empty"));
        }
        let limit = self.config.max_path_length - 1;
        if bytes.len() > limit {
            crate::debug_event!("monitor", "path truncated", "{} bytes", bytes.len());
            return Ok(PathBuf::from(OsStr::from_bytes(&bytes[..limit])));
        }
        Ok(path.to_path_buf())
    }

    fn clear_slots(&mut self) {
        let handles: Vec<S::Handle> = self
            .slots
            .iter_mut()
            .filter_map(|slot| slot.entry.take().and_then(|entry| entry.handle))
            .collect();

        if let Some(source) = self.source.as_mut() {
            for handle in handles {
                let _ = source.remove_watch(&handle);
            }
        }
        self.count = 0;
        self.next_free = 0;
    }
}

impl<S: WatchSource> fmt::Display for WatchRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " | count:{} capacity:{}", self.count, self.capacity())?;
        for (i, entry) in self.iter().enumerate() {
            match &entry.handle {
                Some(handle) => writeln!(f, " | {i}:{handle:?} {}", entry.path.display())?,
                None => writeln!(f, " | {i}:- {}", entry.path.display())?,
            }
        }
        Ok(())
    }
}

impl<S: WatchSource> fmt::Debug for WatchRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("open", &self.source.is_some())
            .field("count", &self.count)
            .field("capacity", &self.slots.len())
            .field("next_free", &self.next_free)
            .finish()
    }
}
