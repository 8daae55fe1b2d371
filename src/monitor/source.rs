//! The watch source capability consumed by the registry.
//!
//! A watch source arms per-path OS watches and hands back batches of
//! pending low-level events. The registry never talks to the kernel
//! directly; [`InotifySource`](super::InotifySource) is the Linux
//! implementation and tests plug in a scripted one.

use std::fmt;
use std::io;
use std::path::Path;

use bitflags::bitflags;

bitflags! {
    /// Low-level event kinds, one bit per inotify kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventKinds: u32 {
        const ACCESS = 1 << 0;
        const MODIFY = 1 << 1;
        const ATTRIB = 1 << 2;
        const CLOSE_WRITE = 1 << 3;
        const CLOSE_NOWRITE = 1 << 4;
        const OPEN = 1 << 5;
        const MOVED_FROM = 1 << 6;
        const MOVED_TO = 1 << 7;
        const CREATE = 1 << 8;
        const DELETE = 1 << 9;
        const DELETE_SELF = 1 << 10;
        const MOVE_SELF = 1 << 11;

        /// Watch was removed (explicitly or because the file went away).
        const IGNORED = 1 << 12;
        /// Event queue overflowed; events were lost.
        const OVERFLOW = 1 << 13;
    }
}

impl EventKinds {
    /// Kinds armed for every monitored path in normal operation.
    pub const MONITORED: EventKinds = EventKinds::CLOSE_WRITE.union(EventKinds::DELETE_SELF);

    /// Every kind that can be requested when arming a watch.
    pub const ARMABLE: EventKinds = EventKinds::ACCESS
        .union(EventKinds::MODIFY)
        .union(EventKinds::ATTRIB)
        .union(EventKinds::CLOSE_WRITE)
        .union(EventKinds::CLOSE_NOWRITE)
        .union(EventKinds::OPEN)
        .union(EventKinds::MOVED_FROM)
        .union(EventKinds::MOVED_TO)
        .union(EventKinds::CREATE)
        .union(EventKinds::DELETE)
        .union(EventKinds::DELETE_SELF)
        .union(EventKinds::MOVE_SELF);
}

/// One low-level event: the watch it belongs to and its kind bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEvent<H> {
    pub handle: Option<H>,
    pub kinds: EventKinds,
}

/// OS-level watch source.
///
/// Implementations must be non-blocking: `read_pending_events` returns
/// an empty batch when nothing is queued instead of waiting.
pub trait WatchSource {
    /// Opaque token for one live watch on one path.
    type Handle: Clone + Eq + fmt::Debug;

    /// Arm a watch for `path`.
    ///
    /// A missing path must be reported as `io::ErrorKind::NotFound` so
    /// the registry can keep the entry pending instead of failing.
    fn create_watch(&mut self, path: &Path, kinds: EventKinds) -> io::Result<Self::Handle>;

    /// Release a watch. Best effort; callers ignore the result beyond logging.
    fn remove_watch(&mut self, handle: &Self::Handle) -> io::Result<()>;

    /// Read one batch of pending events without blocking.
    fn read_pending_events(&mut self) -> io::Result<Vec<SourceEvent<Self::Handle>>>;
}
