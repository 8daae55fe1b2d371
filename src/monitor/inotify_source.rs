//! Linux watch source backed by inotify(7).

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::path::Path;

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};

use super::source::{EventKinds, SourceEvent, WatchSource};

/// Size of `struct inotify_event` without its trailing name.
const EVENT_HEADER_SIZE: usize = 16;

/// Smallest buffer guaranteed to hold one event with a maximal name.
pub const MIN_EVENT_BUFFER_SIZE: usize = EVENT_HEADER_SIZE + 255 + 1;

const KIND_MAP: &[(EventKinds, WatchMask, EventMask)] = &[
    (EventKinds::ACCESS, WatchMask::ACCESS, EventMask::ACCESS),
    (EventKinds::MODIFY, WatchMask::MODIFY, EventMask::MODIFY),
    (EventKinds::ATTRIB, WatchMask::ATTRIB, EventMask::ATTRIB),
    (EventKinds::CLOSE_WRITE, WatchMask::CLOSE_WRITE, EventMask::CLOSE_WRITE),
    (EventKinds::CLOSE_NOWRITE, WatchMask::CLOSE_NOWRITE, EventMask::CLOSE_NOWRITE),
    (EventKinds::OPEN, WatchMask::OPEN, EventMask::OPEN),
    (EventKinds::MOVED_FROM, WatchMask::MOVED_FROM, EventMask::MOVED_FROM),
    (EventKinds::MOVED_TO, WatchMask::MOVED_TO, EventMask::MOVED_TO),
    (EventKinds::CREATE, WatchMask::CREATE, EventMask::CREATE),
    (EventKinds::DELETE, WatchMask::DELETE, EventMask::DELETE),
    (EventKinds::DELETE_SELF, WatchMask::DELETE_SELF, EventMask::DELETE_SELF),
    (EventKinds::MOVE_SELF, WatchMask::MOVE_SELF, EventMask::MOVE_SELF),
];

/// Watch source on a non-blocking inotify instance.
///
/// The instance is owned exclusively and closed when the source is
/// dropped. Its descriptor is exposed through [`AsRawFd`] / [`AsFd`] so
/// the caller's readiness loop can wait on it.
pub struct InotifySource {
    inotify: Inotify,
    buffer: Vec<u8>,
}

impl InotifySource {
    /// Open a new inotify instance reading at most `buffer_size` bytes per batch.
    pub fn open(buffer_size: usize) -> io::Result<Self> {
        // Inotify::init sets IN_NONBLOCK | IN_CLOEXEC
        let inotify = Inotify::init()?;
        Ok(Self {
            inotify,
            buffer: vec![0; buffer_size.max(MIN_EVENT_BUFFER_SIZE)],
        })
    }

    fn watch_mask(kinds: EventKinds) -> WatchMask {
        KIND_MAP
            .iter()
            .filter(|(kind, _, _)| kinds.contains(*kind))
            .fold(WatchMask::empty(), |mask, (_, bit, _)| mask | *bit)
    }

    fn event_kinds(mask: EventMask) -> EventKinds {
        let mut kinds = KIND_MAP
            .iter()
            .filter(|(_, _, bit)| mask.contains(*bit))
            .fold(EventKinds::empty(), |kinds, (kind, _, _)| kinds | *kind);

        if mask.contains(EventMask::IGNORED) {
            kinds |= EventKinds::IGNORED;
        }
        if mask.contains(EventMask::Q_OVERFLOW) {
            kinds |= EventKinds::OVERFLOW;
        }
        kinds
    }
}

impl WatchSource for InotifySource {
    type Handle = WatchDescriptor;

    fn create_watch(&mut self, path: &Path, kinds: EventKinds) -> io::Result<WatchDescriptor> {
        self.inotify.watches().add(path, Self::watch_mask(kinds))
    }

    fn remove_watch(&mut self, handle: &WatchDescriptor) -> io::Result<()> {
        self.inotify.watches().remove(handle.clone())
    }

    fn read_pending_events(&mut self) -> io::Result<Vec<SourceEvent<WatchDescriptor>>> {
        let events = match self.inotify.read_events(&mut self.buffer) {
            Ok(events) => events,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(events
            .map(|event| {
                let kinds = Self::event_kinds(event.mask);
                SourceEvent {
                    // Queue overflow carries wd -1, which belongs to no watch
                    handle: (!kinds.contains(EventKinds::OVERFLOW)).then_some(event.wd),
                    kinds,
                }
            })
            .collect())
    }
}

impl AsRawFd for InotifySource {
    fn as_raw_fd(&self) -> RawFd {
        self.inotify.as_raw_fd()
    }
}

impl AsFd for InotifySource {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inotify.as_fd()
    }
}
