//! Handles all user-facing output for the CLI.
//!
//! Colour is used only when stdout is a terminal, so piped output stays plain.

use std::io::{self, Write};

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::plugins::PluginCatalog;

/// One snapshot of the tree in a trace: the initial parse, then one per plugin.
#[derive(Debug, Clone)]
pub struct TraceStep {
    pub label: String,
    pub outline: String,
}

fn stdout() -> StandardStream {
    let choice = if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

// ============================================================================
// CORE OUTPUT FUNCTIONS
// ============================================================================

/// Prints a `==> name <==` banner before a document when several are shown.
pub fn print_header(name: &str) -> io::Result<()> {
    let mut stdout = stdout();
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    writeln!(stdout, "==> {name} <==")?;
    stdout.reset()
}

pub fn print_text(text: &str) -> io::Result<()> {
    let mut stdout = stdout();
    write!(stdout, "{text}")?;
    if !text.ends_with('\n') {
        writeln!(stdout)?;
    }
    Ok(())
}

/// Prints each step of a trace, diffing it against the previous one.
pub fn print_trace(steps: &[TraceStep]) -> io::Result<()> {
    let mut stdout = stdout();
    let mut previous: Option<&str> = None;

    for (i, step) in steps.iter().enumerate() {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        writeln!(stdout, "--- Step {}: {} ---", i, step.label)?;
        stdout.reset()?;

        match previous {
            None => write!(stdout, "{}", step.outline)?,
            Some(last) if last == step.outline.trim_end() => writeln!(stdout, " (unchanged)")?,
            Some(last) => {
                let changeset = Changeset::new(last, step.outline.trim_end(), "\n");
                print_diff(&mut stdout, &changeset.diffs)?;
            }
        }
        writeln!(stdout)?;
        previous = Some(step.outline.trim_end());
    }
    Ok(())
}

/// Lists catalog plugins, marking those attached to the current processor.
pub fn print_plugins(catalog: &PluginCatalog, attached: &[String]) -> io::Result<()> {
    let mut stdout = stdout();
    for (name, summary) in catalog.entries() {
        let is_attached = attached.iter().any(|a| a == name);
        stdout.set_color(ColorSpec::new().set_bold(true))?;
        write!(stdout, "{name:<12}")?;
        stdout.reset()?;
        write!(stdout, " {summary}")?;
        if is_attached {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(stdout, " (attached)")?;
            stdout.reset()?;
        }
        writeln!(stdout)?;
    }
    Ok(())
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) -> io::Result<()> {
    for diff in diffs {
        match diff {
            Difference::Same(x) => {
                stdout.reset()?;
                for line in x.lines() {
                    writeln!(stdout, " {line}")?;
                }
            }
            Difference::Add(x) => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                for line in x.lines() {
                    writeln!(stdout, "+{line}")?;
                }
            }
            Difference::Rem(x) => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                for line in x.lines() {
                    writeln!(stdout, "-{line}")?;
                }
            }
        }
    }
    stdout.reset()
}
