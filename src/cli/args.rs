//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch files for writes and deletion
#[derive(Parser, Debug)]
#[command(
    name = "fmon",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch files for writes and deletion",
    long_about = "Report when files are written and closed, deleted, or created again.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monitor files until interrupted
    #[command(
        after_help = "Examples:\n  fmon watch notes.txt todo.txt\n  fmon watch --until-changed build.log"
    )]
    Watch {
        /// Stop monitoring a file after its first update; exit when none are left
        #[arg(long)]
        until_changed: bool,

        /// Files to monitor (need not exist yet)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Monitor groups of files listed in index files
    #[command(
        long_about = "Each index file lists one path per line. The listed files are monitored \
                      as one group and the group follows edits of the index file."
    )]
    Index {
        /// Index files, one group each
        #[arg(required = true)]
        index_files: Vec<PathBuf>,
    },

    /// Display active settings
    Config,

    /// Create .fmon/settings.toml in the current directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },
}
