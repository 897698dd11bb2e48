//! Defines the command-line arguments and subcommands for the retext CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "retext",
    version,
    about = "Parse prose into a typed text tree and run plugins over it."
)]
pub struct RetextArgs {
    /// YAML configuration listing the plugins to attach.
    /// Defaults to `.retext.yaml` in the working directory, if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Attach a catalog plugin by name, after those from the configuration.
    #[arg(long = "use", value_name = "NAME", global = true)]
    pub plugins: Vec<String>,

    /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the plugins and print the resulting text.
    Process {
        /// A text file, a directory of `.txt` files, or `-` for stdin.
        #[arg(required = true)]
        input: PathBuf,
    },
    /// Print the typed tree after the plugins ran.
    Tree {
        /// A text file, a directory of `.txt` files, or `-` for stdin.
        #[arg(required = true)]
        input: PathBuf,
        /// Print the tree as CST JSON instead of an outline.
        #[arg(long)]
        json: bool,
    },
    /// Show the text after each plugin, with diffs.
    Trace {
        /// A text file, or `-` for stdin.
        #[arg(required = true)]
        input: PathBuf,
    },
    /// List the plugins available by name.
    Plugins,
}
