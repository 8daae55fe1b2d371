//! Scripted watch source for unit tests.
//!
//! Models the parts of inotify the registry depends on: watches exist
//! only for existing paths, re-adding a watch for the same file (also
//! through an alias) returns the same handle, and deleting a file queues `DELETE_SELF | IGNORED`
//! and drops its watch.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::handler::{Callbacks, Disposition};
use super::registry::WatchRegistry;
use super::source::{EventKinds, SourceEvent, WatchSource};
use crate::config::MonitorConfig;

#[derive(Debug, Default)]
struct FakeFs {
    existing: HashSet<PathBuf>,
    denied: HashSet<PathBuf>,
    aliases: HashMap<PathBuf, PathBuf>,
    watches: BTreeMap<u32, PathBuf>,
    armed: HashMap<u32, EventKinds>,
    next_wd: u32,
    pending: Vec<SourceEvent<u32>>,
    read_error: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeSource(Rc<RefCell<FakeFs>>);

impl FakeFs {
    fn resolve(&self, path: &Path) -> PathBuf {
        self.aliases
            .get(path)
            .cloned()
            .unwrap_or_else(|| path.to_path_buf())
    }
}

impl FakeSource {
    pub fn create(&self, path: impl AsRef<Path>) {
        let mut fs = self.0.borrow_mut();
        let path = fs.resolve(path.as_ref());
        fs.existing.insert(path);
    }

    /// Make `alias` name the same file as `target` (like `dir/./a` and `dir/a`).
    pub fn alias(&self, alias: impl AsRef<Path>, target: impl AsRef<Path>) {
        self.0
            .borrow_mut()
            .aliases
            .insert(alias.as_ref().to_path_buf(), target.as_ref().to_path_buf());
    }

    /// Make watch creation fail with a permission error.
    pub fn deny(&self, path: impl AsRef<Path>) {
        self.0.borrow_mut().denied.insert(path.as_ref().to_path_buf());
    }

    /// Write and close `path`.
    pub fn write(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.create(path);
        if let Some(wd) = self.watch_of(path) {
            self.push(Some(wd), EventKinds::MODIFY | EventKinds::CLOSE_WRITE);
        }
    }

    pub fn delete(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let wd = self.watch_of(path);
        let mut fs = self.0.borrow_mut();
        let path = fs.resolve(path);
        fs.existing.remove(&path);
        if let Some(wd) = wd {
            fs.watches.remove(&wd);
            fs.pending.push(SourceEvent {
                handle: Some(wd),
                kinds: EventKinds::DELETE_SELF,
            });
            fs.pending.push(SourceEvent {
                handle: Some(wd),
                kinds: EventKinds::IGNORED,
            });
        }
    }

    pub fn push(&self, handle: Option<u32>, kinds: EventKinds) {
        self.0.borrow_mut().pending.push(SourceEvent { handle, kinds });
    }

    pub fn fail_reads(&self) {
        self.0.borrow_mut().read_error = true;
    }

    pub fn watch_of(&self, path: &Path) -> Option<u32> {
        let fs = self.0.borrow();
        let path = fs.resolve(path);
        fs.watches
            .iter()
            .find(|(_, watched)| **watched == path)
            .map(|(wd, _)| *wd)
    }

    /// Kinds requested when the watch `wd` was last armed.
    pub fn armed_kinds(&self, wd: u32) -> Option<EventKinds> {
        self.0.borrow().armed.get(&wd).copied()
    }

    pub fn live_watches(&self) -> usize {
        self.0.borrow().watches.len()
    }

    pub fn pending_events(&self) -> usize {
        self.0.borrow().pending.len()
    }
}

impl WatchSource for FakeSource {
    type Handle = u32;

    fn create_watch(&mut self, path: &Path, kinds: EventKinds) -> io::Result<u32> {
        if let Some(wd) = self.watch_of(path) {
            self.0.borrow_mut().armed.insert(wd, kinds);
            return Ok(wd);
        }
        let mut fs = self.0.borrow_mut();
        if fs.denied.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        let path = fs.resolve(path);
        if !fs.existing.contains(&path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        fs.next_wd += 1;
        let wd = fs.next_wd;
        fs.watches.insert(wd, path);
        fs.armed.insert(wd, kinds);
        Ok(wd)
    }

    fn remove_watch(&mut self, handle: &u32) -> io::Result<()> {
        match self.0.borrow_mut().watches.remove(handle) {
            Some(_) => Ok(()),
            None => Err(io::Error::from(io::ErrorKind::InvalidInput)),
        }
    }

    fn read_pending_events(&mut self) -> io::Result<Vec<SourceEvent<u32>>> {
        let mut fs = self.0.borrow_mut();
        if fs.read_error {
            return Err(io::Error::other("read failed"));
        }
        Ok(std::mem::take(&mut fs.pending))
    }
}

pub(crate) fn fake_registry(capacity: usize) -> (WatchRegistry<FakeSource>, FakeSource) {
    let fs = FakeSource::default();
    let config = MonitorConfig {
        max_monitors: capacity,
        ..MonitorConfig::default()
    };
    let registry = WatchRegistry::with_source(fs.clone(), config).unwrap();
    (registry, fs)
}

/// Records callback invocations as `(callback, path)` pairs.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    calls: Rc<RefCell<Vec<(&'static str, PathBuf)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(
        &self,
        name: &'static str,
        disposition: Disposition,
    ) -> impl Fn(&mut WatchRegistry<FakeSource>, &Path) -> Disposition + use<> {
        let calls = Rc::clone(&self.calls);
        move |_, path| {
            calls.borrow_mut().push((name, path.to_path_buf()));
            disposition
        }
    }

    pub fn setup(&self, disposition: Disposition) -> Callbacks<FakeSource> {
        Callbacks::new().on_watch_setup(self.hook("setup", disposition))
    }

    pub fn update(&self, disposition: Disposition) -> Callbacks<FakeSource> {
        Callbacks::new().on_update(self.hook("update", disposition))
    }

    pub fn delete(&self, disposition: Disposition) -> Callbacks<FakeSource> {
        Callbacks::new().on_delete(self.hook("delete", disposition))
    }

    pub fn all(
        &self,
        setup: Disposition,
        update: Disposition,
        delete: Disposition,
    ) -> Callbacks<FakeSource> {
        Callbacks::new()
            .on_watch_setup(self.hook("setup", setup))
            .on_update(self.hook("update", update))
            .on_delete(self.hook("delete", delete))
    }

    pub fn calls(&self, name: &str) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .filter(|(called, _)| *called == name)
            .map(|(_, path)| path.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.calls.borrow().len()
    }
}
