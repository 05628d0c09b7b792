//! Command-line argument definitions for the Nimbus CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Each [`Command`] reads one or two template files; the
//! configuration file and logging verbosity apply to all of them.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Nimbus template tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,
}

/// The operation to run.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare two templates
    Diff {
        /// Path to the original template
        from: String,

        /// Path to the updated template
        to: String,

        /// Also list unchanged paths
        #[arg(short, long)]
        long: bool,
    },

    /// Print the elements of a template in deployment order
    Graph {
        /// Path to the template
        template: String,
    },

    /// Print the value at a path, e.g. `Resources/Bucket/Properties`
    Get {
        /// Path to the template
        template: String,

        /// Slash-separated path; numeric segments index sequences
        #[arg(default_value = "")]
        path: String,
    },

    /// Set the value at a path and print the updated template
    Set {
        /// Path to the template
        template: String,

        /// Slash-separated path; numeric segments index sequences
        path: String,

        /// New value as YAML, e.g. `Enabled`, `[a, b]` or `{Ref: Name}`
        value: String,
    },
}
