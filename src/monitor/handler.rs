//! Callback and disposition types for monitored paths.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use super::registry::WatchRegistry;
use super::source::WatchSource;
use super::InotifySource;

/// Outcome a callback returns to control the entry's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Remove the entry entirely (frees its slot).
    Unmonitor,

    /// Keep the entry. From a delete callback: keep the path registered
    /// but drop its OS watch so it becomes eligible for re-arm.
    KeepMonitoring,

    /// No special action.
    Ok,
}

/// A callback invoked with the owning registry and the monitored path.
///
/// Callbacks run synchronously on the thread driving the registry and
/// may call back into it (`monitor`, `unmonitor`, queries).
pub type Callback<S = InotifySource> = Rc<dyn Fn(&mut WatchRegistry<S>, &Path) -> Disposition>;

/// The three independently optional callbacks of one monitored path.
///
/// An absent callback means the corresponding event is ignored for
/// that path.
pub struct Callbacks<S: WatchSource = InotifySource> {
    pub(crate) on_watch_setup: Option<Callback<S>>,
    pub(crate) on_update: Option<Callback<S>>,
    pub(crate) on_delete: Option<Callback<S>>,
}

impl<S: WatchSource> Callbacks<S> {
    /// No callbacks at all.
    pub fn new() -> Self {
        Self {
            on_watch_setup: None,
            on_update: None,
            on_delete: None,
        }
    }

    /// Called once each time a watch is (re)created for the path.
    ///
    /// Read the initial file content here.
    pub fn on_watch_setup(
        mut self,
        f: impl Fn(&mut WatchRegistry<S>, &Path) -> Disposition + 'static,
    ) -> Self {
        self.on_watch_setup = Some(Rc::new(f));
        self
    }

    /// Called when the file was written to and closed.
    pub fn on_update(
        mut self,
        f: impl Fn(&mut WatchRegistry<S>, &Path) -> Disposition + 'static,
    ) -> Self {
        self.on_update = Some(Rc::new(f));
        self
    }

    /// Called when the file itself was deleted.
    ///
    /// Return [`Disposition::KeepMonitoring`] to detect the file being
    /// created again; anything else removes the entry.
    pub fn on_delete(
        mut self,
        f: impl Fn(&mut WatchRegistry<S>, &Path) -> Disposition + 'static,
    ) -> Self {
        self.on_delete = Some(Rc::new(f));
        self
    }

    /// Share one callback between setup and update.
    pub fn on_setup_and_update(
        self,
        f: impl Fn(&mut WatchRegistry<S>, &Path) -> Disposition + 'static,
    ) -> Self {
        let f: Callback<S> = Rc::new(f);
        Self {
            on_watch_setup: Some(f.clone()),
            on_update: Some(f),
            ..self
        }
    }
}

impl<S: WatchSource> Default for Callbacks<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WatchSource> Clone for Callbacks<S> {
    fn clone(&self) -> Self {
        Self {
            on_watch_setup: self.on_watch_setup.clone(),
            on_update: self.on_update.clone(),
            on_delete: self.on_delete.clone(),
        }
    }
}

impl<S: WatchSource> fmt::Debug for Callbacks<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_watch_setup", &self.on_watch_setup.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .finish()
    }
}
