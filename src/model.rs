//! # Object Model
//!
//! The registry of node types a tree can be built from. Each registered type
//! has a [`Shape`]: parent types hold ordered children, text types hold a
//! literal string. Lookup by the CST `type` tag resolves to a shared
//! [`NodeType`] handle once per node.
//!
//! An `ObjectModel` is bound to exactly one parser when a
//! [`Processor`](crate::processor::Processor) is constructed. Both sides keep a
//! weak link to the other; the processor owns the strong references.

use std::{
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use once_cell::unsync::OnceCell;

use crate::{
    errors::RetextError,
    parser::Parser,
    tree::{Node, NodeRef},
};

// ============================================================================
// STANDARD NODE TYPES
// ============================================================================

pub const ROOT_NODE: &str = "RootNode";
pub const PARAGRAPH_NODE: &str = "ParagraphNode";
pub const SENTENCE_NODE: &str = "SentenceNode";
pub const WORD_NODE: &str = "WordNode";
pub const WHITE_SPACE_NODE: &str = "WhiteSpaceNode";
pub const PUNCTUATION_NODE: &str = "PunctuationNode";
pub const SYMBOL_NODE: &str = "SymbolNode";
pub const SOURCE_NODE: &str = "SourceNode";
pub const TEXT_NODE: &str = "TextNode";

const STANDARD_TYPES: &[(&str, Shape)] = &[
    (ROOT_NODE, Shape::Parent),
    (PARAGRAPH_NODE, Shape::Parent),
    (SENTENCE_NODE, Shape::Parent),
    (WORD_NODE, Shape::Text),
    (WHITE_SPACE_NODE, Shape::Text),
    (PUNCTUATION_NODE, Shape::Text),
    (SYMBOL_NODE, Shape::Text),
    (SOURCE_NODE, Shape::Text),
    (TEXT_NODE, Shape::Text),
];

/// Whether a node type is built by appending children or from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Parent,
    Text,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Parent => f.write_str("parent"),
            Shape::Text => f.write_str("text"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct NodeType {
    name: String,
    shape: Shape,
}

impl NodeType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_parent(&self) -> bool {
        self.shape == Shape::Parent
    }
}

// ============================================================================
// OBJECT MODEL
// ============================================================================

#[derive(Default)]
pub struct ObjectModel {
    types: HashMap<String, Rc<NodeType>>,
    parser: OnceCell<Weak<dyn Parser>>,
}

impl ObjectModel {
    /// A model with no registered types.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A model with the standard natural-language node types registered.
    pub fn standard() -> Self {
        let mut model = Self::empty();
        for (name, shape) in STANDARD_TYPES {
            model.register(*name, *shape);
        }
        model
    }

    /// Registers a node type, replacing any earlier type with the same name.
    pub fn register(&mut self, name: impl Into<String>, shape: Shape) -> &mut Self {
        let name = name.into();
        self.types
            .insert(name.clone(), Rc::new(NodeType { name, shape }));
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Rc<NodeType>, RetextError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| RetextError::UnknownNodeType {
                node_type: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Instantiates an empty node of the named type.
    pub fn create(&self, name: &str) -> Result<NodeRef, RetextError> {
        Ok(Node::new(self.resolve(name)?).into_ref())
    }

    /// Records the parser this model is bound to. Returns `false` if the model
    /// was already bound; the first binding is kept.
    pub fn bind_parser(&self, parser: &Rc<dyn Parser>) -> bool {
        self.parser.set(Rc::downgrade(parser)).is_ok()
    }

    /// The bound parser, while its owning processor is alive.
    pub fn parser(&self) -> Option<Rc<dyn Parser>> {
        self.parser.get().and_then(Weak::upgrade)
    }
}

impl fmt::Debug for ObjectModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectModel")
            .field("types", &self.type_names())
            .field("bound", &self.parser.get().is_some())
            .finish()
    }
}
