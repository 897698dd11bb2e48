//! # Processor
//!
//! The façade tying a parser, an object model and a plugin registry together.
//!
//! ## Usage Workflow
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//! use retext::{tree::NodeRef, Plugin, Processor};
//!
//! let processor = Processor::new();
//! processor
//!     .use_plugin(Plugin::sync("shout", |tree, _| {
//!         retext::tree::visit(tree, Some("WordNode"), &mut |word: &NodeRef| {
//!             let upper = word.borrow().to_text().to_uppercase();
//!             let _ = word.borrow_mut().set_text(upper);
//!         });
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let text = Rc::new(RefCell::new(String::new()));
//! let sink = Rc::clone(&text);
//! processor
//!     .parse("Cat.", move |result| {
//!         *sink.borrow_mut() = result.unwrap().borrow().to_text();
//!     })
//!     .unwrap();
//! assert_eq!(*text.borrow(), "CAT.");
//! ```
//!
//! ## Guards
//! The typed entry points cannot receive a missing callback or a non-plugin.
//! The erased entry points (`run_with`, `parse_with`, `use_named`,
//! `use_entry`) check their inputs and fail synchronously with a guard error
//! before any parsing or plugin work happens.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use tracing::{debug, info};

use crate::{
    config::PluginEntry,
    errors::RetextError,
    model::ObjectModel,
    parser::{EnglishParser, Parser},
    pipeline::{self, Done, Status},
    plugin::{Plugin, PluginRegistry},
    plugins::PluginCatalog,
    tree::{self, NodeRef},
};

struct ProcessorInner {
    parser: Rc<dyn Parser>,
    model: Rc<ObjectModel>,
    registry: RefCell<PluginRegistry>,
    catalog: PluginCatalog,
    /// Catalog plugins resolved by name, so repeated names share one identity.
    named: RefCell<HashMap<String, Plugin>>,
}

/// A processing instance. Cloning yields another handle to the same instance.
#[derive(Clone)]
pub struct Processor {
    inner: Rc<ProcessorInner>,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    /// A processor using the default English parser and the standard model.
    pub fn new() -> Self {
        Self::with_parser(EnglishParser::new())
    }

    pub fn with_parser<P: Parser + 'static>(parser: P) -> Self {
        Self::with_parts(parser, ObjectModel::standard(), PluginCatalog::standard())
    }

    /// Binds `parser` and `model` to each other and to a fresh registry.
    pub fn with_parts<P: Parser + 'static>(
        parser: P,
        model: ObjectModel,
        catalog: PluginCatalog,
    ) -> Self {
        let parser: Rc<dyn Parser> = Rc::new(parser);
        let model = Rc::new(model);
        model.bind_parser(&parser);
        parser.bind(Rc::downgrade(&model));

        Self {
            inner: Rc::new(ProcessorInner {
                parser,
                model,
                registry: RefCell::new(PluginRegistry::new()),
                catalog,
                named: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn parser(&self) -> &Rc<dyn Parser> {
        &self.inner.parser
    }

    pub fn model(&self) -> &Rc<ObjectModel> {
        &self.inner.model
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.inner.catalog
    }

    /// Attached plugins, in execution order.
    pub fn plugins(&self) -> Vec<Plugin> {
        self.inner.registry.borrow().snapshot().into_iter().collect()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.inner.registry.borrow().names()
    }

    // ========================================================================
    // ATTACHMENT
    // ========================================================================

    /// Attaches `plugin`. Attaching the same handle again is a no-op.
    ///
    /// A new plugin's attach hook runs once, synchronously, before this
    /// returns; it may attach further plugins. If the hook fails the plugin
    /// stays attached and the error is returned.
    pub fn use_plugin(&self, plugin: Plugin) -> Result<&Self, RetextError> {
        let added = self.inner.registry.borrow_mut().push(plugin.clone());
        if !added {
            debug!(plugin = plugin.name(), "plugin already attached");
            return Ok(self);
        }
        debug!(plugin = plugin.name(), "attached plugin");
        plugin.attach(self)?;
        Ok(self)
    }

    /// Attaches a catalog plugin by name, with default options.
    pub fn use_named(&self, name: &str) -> Result<&Self, RetextError> {
        let plugin = self.resolve_named(name)?;
        self.use_plugin(plugin)
    }

    /// Attaches a configured plugin entry. Entries with options get their own
    /// plugin instance.
    pub fn use_entry(&self, entry: &PluginEntry) -> Result<&Self, RetextError> {
        match entry.options() {
            Some(options) => {
                let plugin = self.inner.catalog.create(entry.name(), options)?;
                self.use_plugin(plugin)
            }
            None => self.use_named(entry.name()),
        }
    }

    fn resolve_named(&self, name: &str) -> Result<Plugin, RetextError> {
        if let Some(plugin) = self.inner.named.borrow().get(name) {
            return Ok(plugin.clone());
        }
        let plugin = self.inner.catalog.create_default(name)?;
        self.inner
            .named
            .borrow_mut()
            .insert(name.to_string(), plugin.clone());
        Ok(plugin)
    }

    // ========================================================================
    // EXECUTION
    // ========================================================================

    /// Runs every attached plugin over `node`, then calls `callback` once.
    pub fn run<F>(&self, node: NodeRef, callback: F) -> &Self
    where
        F: FnOnce(Result<NodeRef, RetextError>) + 'static,
    {
        self.dispatch(node, Box::new(callback));
        self
    }

    /// [`run`](Self::run) with an erased, optional callback.
    pub fn run_with(&self, node: NodeRef, callback: Option<Done>) -> Result<&Self, RetextError> {
        let callback = require_callback(callback, "run")?;
        self.dispatch(node, callback);
        Ok(self)
    }

    /// Parses `text`, builds the tree and runs the pipeline over it.
    ///
    /// Parser and build failures are returned directly and never reach the
    /// callback.
    pub fn parse<F>(&self, text: &str, callback: F) -> Result<&Self, RetextError>
    where
        F: FnOnce(Result<NodeRef, RetextError>) + 'static,
    {
        let node = self.build(text)?;
        self.dispatch(node, Box::new(callback));
        Ok(self)
    }

    /// [`parse`](Self::parse) with an erased, optional callback. The callback
    /// is checked before the parser runs.
    pub fn parse_with(&self, text: &str, callback: Option<Done>) -> Result<&Self, RetextError> {
        let callback = require_callback(callback, "parse")?;
        let node = self.build(text)?;
        self.dispatch(node, callback);
        Ok(self)
    }

    /// Parses and builds a tree without running any plugin.
    pub fn build(&self, text: &str) -> Result<NodeRef, RetextError> {
        let cst = self.inner.parser.parse(text)?;
        tree::from_cst(&self.inner.model, &cst)
    }

    /// Parses and processes `text`, returning the final tree.
    ///
    /// For pipelines whose plugins complete before returning. If an async
    /// plugin suspends, this fails with `Suspended`.
    pub fn process(&self, text: &str) -> Result<NodeRef, RetextError> {
        let node = self.build(text)?;
        self.process_tree(node)
    }

    /// Runs the pipeline over an existing tree, returning the final tree.
    pub fn process_tree(&self, node: NodeRef) -> Result<NodeRef, RetextError> {
        let plugins = self.inner.registry.borrow().snapshot();
        run_to_completion(self, plugins, node)
    }

    fn dispatch(&self, node: NodeRef, callback: Done) {
        let plugins = self.inner.registry.borrow().snapshot();
        info!(plugins = plugins.len(), "running pipeline");
        pipeline::run_plugins(self, plugins, node, callback);
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("model", &self.inner.model)
            .field("plugins", &self.plugin_names())
            .finish()
    }
}

/// Runs `plugins` and collects the result, which must be available once the
/// runner returns.
pub(crate) fn run_to_completion(
    processor: &Processor,
    plugins: im::Vector<Plugin>,
    node: NodeRef,
) -> Result<NodeRef, RetextError> {
    let slot: Rc<RefCell<Option<Result<NodeRef, RetextError>>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&slot);
    let status = pipeline::run_plugins(
        processor,
        plugins,
        node,
        Box::new(move |result| *sink.borrow_mut() = Some(result)),
    );
    match status {
        Status::Suspended { plugin } => Err(RetextError::Suspended { plugin }),
        // `Settled` is only reported after the callback ran, and the callback
        // always fills the slot.
        Status::Settled => slot
            .borrow_mut()
            .take()
            .unwrap_or_else(|| unreachable!("settled pipeline left no result")),
    }
}

fn require_callback(callback: Option<Done>, operation: &'static str) -> Result<Done, RetextError> {
    callback.ok_or(RetextError::InvalidCallback { operation })
}
