//! The retext Command-Line Interface.
//!
//! Builds a processor, attaches plugins from the configuration file and
//! `--use` flags, then dispatches to the subcommand handlers.

use std::{
    fs,
    io::{self, Read},
    path::Path,
    process,
};

use clap::Parser;
use im::Vector;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::{
    cli::{
        args::{Command, RetextArgs},
        output::TraceStep,
    },
    config::RetextConfig,
    errors::{print_error, RetextError},
    processor::{run_to_completion, Processor},
    tree,
};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = RetextArgs::parse();
    init_tracing(args.verbose);

    if let Err(error) = execute(args) {
        print_error(error);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn execute(args: RetextArgs) -> Result<(), RetextError> {
    let processor = Processor::new();
    RetextConfig::load_or_default(args.config.as_deref())?.apply(&processor)?;
    for name in &args.plugins {
        processor.use_named(name)?;
    }
    info!(plugins = ?processor.plugin_names(), "processor ready");

    match args.command {
        Command::Process { input } => handle_process(&processor, &input),
        Command::Tree { input, json } => handle_tree(&processor, &input, json),
        Command::Trace { input } => handle_trace(&processor, &input),
        Command::Plugins => {
            output::print_plugins(processor.catalog(), &processor.plugin_names())?;
            Ok(())
        }
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

/// Handles the `process` subcommand.
fn handle_process(processor: &Processor, input: &Path) -> Result<(), RetextError> {
    let documents = read_inputs(input)?;
    let banners = documents.len() > 1;
    for document in documents {
        if banners {
            output::print_header(&document.name)?;
        }
        let tree = processor.process(&document.text)?;
        let text = tree.borrow().to_text();
        output::print_text(&text)?;
    }
    Ok(())
}

/// Handles the `tree` subcommand.
fn handle_tree(processor: &Processor, input: &Path, json: bool) -> Result<(), RetextError> {
    let documents = read_inputs(input)?;
    let banners = documents.len() > 1;
    for document in documents {
        if banners {
            output::print_header(&document.name)?;
        }
        let tree = processor.process(&document.text)?;
        let rendered = if json {
            tree::to_cst(&tree).to_json_pretty()
        } else {
            tree::outline(&tree)
        };
        output::print_text(&rendered)?;
    }
    Ok(())
}

/// Handles the `trace` subcommand: runs each plugin on its own and records
/// the tree after it.
fn handle_trace(processor: &Processor, input: &Path) -> Result<(), RetextError> {
    for document in read_inputs(input)? {
        let mut node = processor.build(&document.text)?;
        let mut steps = vec![TraceStep {
            label: "parse".to_string(),
            outline: tree::outline(&node),
        }];
        for plugin in processor.plugins() {
            let label = plugin.name().to_string();
            node = run_to_completion(processor, Vector::unit(plugin), node)?;
            steps.push(TraceStep {
                label,
                outline: tree::outline(&node),
            });
        }
        output::print_trace(&steps)?;
    }
    Ok(())
}

// ============================================================================
// INPUT
// ============================================================================

struct Document {
    name: String,
    text: String,
}

/// Reads a file, every `.txt` file below a directory, or stdin for `-`.
fn read_inputs(input: &Path) -> Result<Vec<Document>, RetextError> {
    if input == Path::new("-") {
        if atty::is(atty::Stream::Stdin) {
            return Err(RetextError::config(
                "refusing to read from an interactive terminal; pipe text in or pass a file",
            ));
        }
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(vec![Document {
            name: "<stdin>".to_string(),
            text,
        }]);
    }

    if input.is_dir() {
        let mut documents = Vec::new();
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().map_or(false, |ext| ext == "txt") {
                documents.push(read_file(path)?);
            }
        }
        debug!(count = documents.len(), dir = %input.display(), "collected documents");
        return Ok(documents);
    }

    Ok(vec![read_file(input)?])
}

fn read_file(path: &Path) -> Result<Document, RetextError> {
    let text = fs::read_to_string(path)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", path.display())))?;
    Ok(Document {
        name: path.display().to_string(),
        text,
    })
}
