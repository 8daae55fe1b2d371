//! Command-line interface of the `fmon` binary.
//!
//! Argument parsing lives in [`args`], the readiness loop shared by the
//! monitoring commands in [`event_loop`], and each command in its own
//! module under [`commands`].

pub mod args;
pub mod commands;
pub mod event_loop;

pub use args::{Cli, Commands};
