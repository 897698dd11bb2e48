//! # Pipeline Runner
//!
//! Runs a snapshot of plugins over one tree, strictly in order, and reports a
//! single terminal result.
//!
//! ## Execution model
//!
//! The runner is explicit continuation passing over a shared [`Run`] state:
//!
//! - a sync plugin returns, and the runner loops to the next one;
//! - an async plugin receives a [`Next`] and the runner returns to its caller.
//!   Whoever holds the `Next` resumes the pipeline by calling it.
//!
//! ## Invariants
//!
//! - No plugin starts before its predecessor completed.
//! - The first failure wins: later plugins do not run.
//! - The completion callback fires at most once, whatever the plugins do.
//!   A step is completed by the first of "returned an error" and "called its
//!   continuation"; the other signal is ignored.
//! - There is no timeout. A plugin that drops its `Next` without calling it
//!   stalls the pipeline and the callback never fires.
//!
//! A continuation called while the runner is still on the stack (an async
//! plugin resuming inline) only records the completion; the running loop picks
//! it up. Stack depth therefore does not grow with the number of plugins.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use im::Vector;
use tracing::{debug, trace, warn};

use crate::{
    errors::RetextError,
    plugin::{Plugin, Transform},
    processor::Processor,
    tree::NodeRef,
};

/// Completion callback: receives the (possibly replaced) tree or the error.
pub type Done = Box<dyn FnOnce(Result<NodeRef, RetextError>)>;

struct Run {
    processor: Processor,
    plugins: Vector<Plugin>,
    /// Index of the plugin currently executing.
    cursor: Cell<usize>,
    /// A `drive` loop is active further up the stack.
    driving: Cell<bool>,
    node: RefCell<NodeRef>,
    done: RefCell<Option<Done>>,
}

impl Run {
    fn settled(&self) -> bool {
        self.done.borrow().is_none()
    }

    fn settle(&self, result: Result<NodeRef, RetextError>) {
        let done = self.done.borrow_mut().take();
        match done {
            Some(done) => {
                match &result {
                    Ok(_) => debug!(plugins = self.plugins.len(), "pipeline finished"),
                    Err(error) => debug!(%error, "pipeline failed"),
                }
                done(result);
            }
            None => warn!("pipeline already settled; dropping late result"),
        }
    }

    fn plugin_name(&self, index: usize) -> &str {
        self.plugins.get(index).map_or("<none>", Plugin::name)
    }
}

/// Where a pipeline stands when [`run_plugins`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The callback has fired.
    Settled,
    /// Waiting on the continuation of the named async plugin.
    Suspended { plugin: String },
}

/// Runs `plugins` over `node` in order and reports through `done`.
///
/// Returns as soon as the pipeline completes or suspends on an async plugin.
pub fn run_plugins(
    processor: &Processor,
    plugins: Vector<Plugin>,
    node: NodeRef,
    done: Done,
) -> Status {
    let run = Rc::new(Run {
        processor: processor.clone(),
        plugins,
        cursor: Cell::new(0),
        driving: Cell::new(false),
        node: RefCell::new(node),
        done: RefCell::new(Some(done)),
    });
    drive(&run);
    if run.settled() {
        Status::Settled
    } else {
        Status::Suspended {
            plugin: run.plugin_name(run.cursor.get()).to_string(),
        }
    }
}

/// Runs plugins until the pipeline settles or an async plugin suspends.
/// Re-entrant calls return at once and leave the work to the active loop.
fn drive(run: &Rc<Run>) {
    if run.driving.replace(true) {
        return;
    }
    step(run);
    run.driving.set(false);
}

fn step(run: &Rc<Run>) {
    loop {
        if run.settled() {
            return;
        }
        let index = run.cursor.get();
        let Some(plugin) = run.plugins.get(index).cloned() else {
            let node = run.node.borrow().clone();
            run.settle(Ok(node));
            return;
        };
        let node = run.node.borrow().clone();

        match plugin.transform() {
            Transform::Sync(transform) => {
                trace!(plugin = plugin.name(), index, "running sync plugin");
                if let Err(error) = transform(&node, &run.processor) {
                    run.settle(Err(error));
                    return;
                }
                run.cursor.set(index + 1);
            }
            Transform::Async(transform) => {
                trace!(plugin = plugin.name(), index, "running async plugin");
                let next = Next {
                    run: Some(Rc::clone(run)),
                    step: index,
                };
                if let Err(error) = transform(&node, &run.processor, next) {
                    if run.cursor.get() == index && !run.settled() {
                        run.settle(Err(error));
                        return;
                    }
                    warn!(
                        plugin = plugin.name(),
                        %error,
                        "plugin failed after completing its step; ignoring"
                    );
                }
                if run.cursor.get() == index {
                    trace!(plugin = plugin.name(), index, "pipeline suspended");
                    return;
                }
            }
        }
    }
}

// ============================================================================
// CONTINUATION
// ============================================================================

/// One-shot continuation handed to an async plugin.
///
/// Calling it completes the plugin's step. Dropping it uncalled stalls the
/// pipeline.
pub struct Next {
    run: Option<Rc<Run>>,
    step: usize,
}

impl Next {
    /// Completes the step. `Ok(Some(node))` replaces the tree for the rest of
    /// the pipeline; `Ok(None)` keeps it; `Err` fails the pipeline.
    pub fn call(mut self, result: Result<Option<NodeRef>, RetextError>) {
        let Some(run) = self.run.take() else {
            return;
        };
        if run.settled() || run.cursor.get() != self.step {
            warn!(
                plugin = run.plugin_name(self.step),
                "continuation called after the step completed; ignoring"
            );
            return;
        }
        match result {
            Ok(replacement) => {
                if let Some(node) = replacement {
                    trace!(plugin = run.plugin_name(self.step), "tree replaced");
                    *run.node.borrow_mut() = node;
                }
                run.cursor.set(self.step + 1);
                // No-op when called inline: the active loop sees the new cursor.
                drive(&run);
            }
            Err(error) => run.settle(Err(error)),
        }
    }

    /// Completes the step, keeping the current tree.
    pub fn resume(self) {
        self.call(Ok(None));
    }

    /// Completes the step with a replacement tree.
    pub fn replace(self, node: NodeRef) {
        self.call(Ok(Some(node)));
    }

    /// Fails the pipeline.
    pub fn fail(self, error: RetextError) {
        self.call(Err(error));
    }

    /// Name of the plugin this continuation belongs to.
    pub fn plugin(&self) -> &str {
        self.run
            .as_ref()
            .map_or("<none>", |run| run.plugin_name(self.step))
    }
}

impl Drop for Next {
    fn drop(&mut self) {
        if let Some(run) = &self.run {
            if !run.settled() && run.cursor.get() == self.step {
                warn!(
                    plugin = run.plugin_name(self.step),
                    "continuation dropped without being called; pipeline stalled"
                );
            }
        }
    }
}
