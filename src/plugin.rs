//! # Plugins
//!
//! A plugin is a named transform over a tree plus an optional attach hook.
//! Plugins declare their calling convention up front:
//!
//! 1. **Sync** plugins return when their work is done. The pipeline advances
//!    immediately.
//! 2. **Async** plugins receive a [`Next`] continuation and advance the
//!    pipeline by calling it, possibly long after they returned.
//!
//! A [`Plugin`] is a cheap handle. Cloning it keeps its identity, which is
//! what the [`PluginRegistry`] deduplicates on.

use std::{fmt, rc::Rc};

use im::Vector;

use crate::{errors::RetextError, pipeline::Next, processor::Processor, tree::NodeRef};

pub type SyncFn = dyn Fn(&NodeRef, &Processor) -> Result<(), RetextError>;
pub type AsyncFn = dyn Fn(&NodeRef, &Processor, Next) -> Result<(), RetextError>;
pub type AttachFn = dyn Fn(&Processor) -> Result<(), RetextError>;

/// The calling convention a plugin was registered with.
pub enum Transform {
    Sync(Box<SyncFn>),
    Async(Box<AsyncFn>),
}

struct PluginInner {
    name: String,
    transform: Transform,
    attach: Option<Box<AttachFn>>,
}

#[derive(Clone)]
pub struct Plugin(Rc<PluginInner>);

impl Plugin {
    /// Starts a plugin with an attach hook or other options.
    pub fn build(name: impl Into<String>) -> PluginBuilder {
        PluginBuilder {
            name: name.into(),
            attach: None,
        }
    }

    /// A plugin that finishes before returning.
    pub fn sync<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&NodeRef, &Processor) -> Result<(), RetextError> + 'static,
    {
        Self::build(name).sync(transform)
    }

    /// A plugin that finishes by calling its continuation.
    pub fn asynchronous<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&NodeRef, &Processor, Next) -> Result<(), RetextError> + 'static,
    {
        Self::build(name).asynchronous(transform)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_async(&self) -> bool {
        matches!(self.0.transform, Transform::Async(_))
    }

    pub fn has_attach(&self) -> bool {
        self.0.attach.is_some()
    }

    /// Identity comparison: true only for clones of the same handle.
    pub fn same_as(&self, other: &Plugin) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn transform(&self) -> &Transform {
        &self.0.transform
    }

    pub(crate) fn attach(&self, processor: &Processor) -> Result<(), RetextError> {
        match &self.0.attach {
            Some(hook) => hook(processor),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .field("async", &self.is_async())
            .field("attach", &self.has_attach())
            .finish()
    }
}

pub struct PluginBuilder {
    name: String,
    attach: Option<Box<AttachFn>>,
}

impl PluginBuilder {
    /// Hook run once, synchronously, when the plugin is first attached. It may
    /// attach further plugins to the same processor.
    pub fn on_attach<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Processor) -> Result<(), RetextError> + 'static,
    {
        self.attach = Some(Box::new(hook));
        self
    }

    pub fn sync<F>(self, transform: F) -> Plugin
    where
        F: Fn(&NodeRef, &Processor) -> Result<(), RetextError> + 'static,
    {
        self.finish(Transform::Sync(Box::new(transform)))
    }

    pub fn asynchronous<F>(self, transform: F) -> Plugin
    where
        F: Fn(&NodeRef, &Processor, Next) -> Result<(), RetextError> + 'static,
    {
        self.finish(Transform::Async(Box::new(transform)))
    }

    fn finish(self, transform: Transform) -> Plugin {
        Plugin(Rc::new(PluginInner {
            name: self.name,
            transform,
            attach: self.attach,
        }))
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Ordered, identity-deduplicated, append-only list of plugins.
#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: Vector<Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, plugin: &Plugin) -> bool {
        self.plugins.iter().any(|known| known.same_as(plugin))
    }

    /// Appends `plugin` unless the same handle is already registered.
    /// Returns whether the registry changed.
    pub fn push(&mut self, plugin: Plugin) -> bool {
        if self.contains(&plugin) {
            return false;
        }
        self.plugins.push_back(plugin);
        true
    }

    /// Structurally shared copy of the current order, for one pipeline run.
    pub fn snapshot(&self) -> Vector<Plugin> {
        self.plugins.clone()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Plugin {
        Plugin::sync(name, |_, _| Ok(()))
    }

    #[test]
    fn registry_deduplicates_by_identity() {
        let mut registry = PluginRegistry::new();
        let plugin = noop("a");
        assert!(registry.push(plugin.clone()));
        assert!(!registry.push(plugin));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn equal_names_are_distinct_plugins() {
        let mut registry = PluginRegistry::new();
        assert!(registry.push(noop("a")));
        assert!(registry.push(noop("a")));
        assert_eq!(registry.names(), vec!["a", "a"]);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_pushes() {
        let mut registry = PluginRegistry::new();
        registry.push(noop("a"));
        let snapshot = registry.snapshot();
        registry.push(noop("b"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn calling_convention_is_explicit() {
        let plugin = Plugin::asynchronous("later", |_, _, next| {
            next.resume();
            Ok(())
        });
        assert!(plugin.is_async());
        assert!(!noop("now").is_async());
    }
}
