pub mod cli;
pub mod config;
pub mod logging;
pub mod monitor;

pub use config::{MonitorConfig, Settings};
pub use monitor::{
    Callbacks, Disposition, EventKinds, InotifySource, MonitorEntry, MonitorError, MonitorStatus,
    UnmonitorStatus, WatchRegistry, WatchSource,
};
