//! # Typed Text Tree
//!
//! Mutable nodes built from the object model. A parent node owns its children
//! in order; a text node owns its literal content. Every node carries a `data`
//! map that plugins use to annotate the tree.
//!
//! Nodes are shared as [`NodeRef`] (`Rc<RefCell<Node>>`): the parent holds its
//! children, the caller holds the root, and a plugin borrows mutably for the
//! duration of its turn.

use std::{cell::RefCell, fmt::Write as _, rc::Rc};

use tracing::trace;

use crate::{
    cst::{CstContent, CstNode, Data},
    errors::RetextError,
    model::{NodeType, ObjectModel, Shape},
};

pub type NodeRef = Rc<RefCell<Node>>;

#[derive(Debug)]
enum Content {
    Children(Vec<NodeRef>),
    Text(String),
}

#[derive(Debug)]
pub struct Node {
    kind: Rc<NodeType>,
    content: Content,
    data: Data,
}

impl Node {
    /// An empty node of the given type: no children, or an empty string.
    pub fn new(kind: Rc<NodeType>) -> Self {
        let content = match kind.shape() {
            Shape::Parent => Content::Children(Vec::new()),
            Shape::Text => Content::Text(String::new()),
        };
        Self {
            kind,
            content,
            data: Data::new(),
        }
    }

    pub fn into_ref(self) -> NodeRef {
        Rc::new(RefCell::new(self))
    }

    pub fn kind(&self) -> &NodeType {
        &self.kind
    }

    pub fn node_type(&self) -> &str {
        self.kind.name()
    }

    pub fn is_parent(&self) -> bool {
        self.kind.is_parent()
    }

    /// Appends `child` as the last child of a parent node.
    pub fn append(&mut self, child: NodeRef) -> Result<(), RetextError> {
        self.children_mut("children")?.push(child);
        Ok(())
    }

    /// Inserts `child` as the first child of a parent node.
    pub fn prepend(&mut self, child: NodeRef) -> Result<(), RetextError> {
        self.children_mut("children")?.insert(0, child);
        Ok(())
    }

    /// Detaches and returns the child at `index`.
    pub fn remove(&mut self, index: usize) -> Option<NodeRef> {
        match &mut self.content {
            Content::Children(children) if index < children.len() => Some(children.remove(index)),
            _ => None,
        }
    }

    /// Children in order. Text nodes have none.
    pub fn children(&self) -> &[NodeRef] {
        match &self.content {
            Content::Children(children) => children,
            Content::Text(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.children().len()
    }

    pub fn is_empty(&self) -> bool {
        match &self.content {
            Content::Children(children) => children.is_empty(),
            Content::Text(text) => text.is_empty(),
        }
    }

    /// Leaf construction: sets the literal content of a text node.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), RetextError> {
        match &mut self.content {
            Content::Text(current) => {
                *current = text.into();
                Ok(())
            }
            Content::Children(_) => Err(self.shape_mismatch("a text value")),
        }
    }

    /// The literal content of a text node.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Children(_) => None,
        }
    }

    /// Concatenation of every leaf below this node, in order.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        match &self.content {
            Content::Text(text) => out.push_str(text),
            Content::Children(children) => {
                for child in children {
                    child.borrow().write_text(out);
                }
            }
        }
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Data {
        &mut self.data
    }

    fn children_mut(&mut self, operation: &'static str) -> Result<&mut Vec<NodeRef>, RetextError> {
        let kind = &self.kind;
        match &mut self.content {
            Content::Children(children) => Ok(children),
            Content::Text(_) => Err(RetextError::ShapeMismatch {
                node_type: kind.name().to_string(),
                shape: kind.shape(),
                operation,
            }),
        }
    }

    fn shape_mismatch(&self, operation: &'static str) -> RetextError {
        RetextError::ShapeMismatch {
            node_type: self.node_type().to_string(),
            shape: self.kind.shape(),
            operation,
        }
    }
}

// ============================================================================
// TREE BUILDER
// ============================================================================

/// Builds a typed tree from a CST node, recursively.
///
/// Children keep their CST order, leaves receive the CST `value` verbatim and
/// `data` is copied key by key (shallow, last write wins). Recursion depth
/// follows the CST depth; pathologically deep input can exhaust the stack.
pub fn from_cst(model: &ObjectModel, cst: &CstNode) -> Result<NodeRef, RetextError> {
    let mut node = Node::new(model.resolve(&cst.node_type)?);

    match cst.content()? {
        CstContent::Children(children) => {
            for child in children {
                node.append(from_cst(model, child)?)?;
            }
        }
        CstContent::Value(value) => node.set_text(value)?,
    }

    if let Some(data) = &cst.data {
        for (key, value) in data {
            node.data.insert(key.clone(), value.clone());
        }
    }

    trace!(node_type = %cst.node_type, "built node");
    Ok(node.into_ref())
}

/// Serializes a tree back to CST form, including annotations.
pub fn to_cst(node: &NodeRef) -> CstNode {
    let node = node.borrow();
    let cst = match &node.content {
        Content::Children(children) => {
            CstNode::parent(node.node_type(), children.iter().map(to_cst).collect())
        }
        Content::Text(text) => CstNode::leaf(node.node_type(), text.clone()),
    };
    if node.data.is_empty() {
        cst
    } else {
        CstNode {
            data: Some(node.data.clone()),
            ..cst
        }
    }
}

// ============================================================================
// TRAVERSAL
// ============================================================================

/// Depth-first, pre-order walk. When `node_type` is given only nodes of that
/// type are passed to `f`, but the whole tree is still traversed.
///
/// No borrow of a node is held while `f` runs, so `f` may mutate it.
pub fn visit<F>(node: &NodeRef, node_type: Option<&str>, f: &mut F)
where
    F: FnMut(&NodeRef),
{
    let matches = node_type.map_or(true, |wanted| node.borrow().node_type() == wanted);
    if matches {
        f(node);
    }
    let children = node.borrow().children().to_vec();
    for child in &children {
        visit(child, node_type, f);
    }
}

/// Indented outline of a tree, one node per line.
pub fn outline(node: &NodeRef) -> String {
    let mut out = String::new();
    write_outline(node, 0, &mut out);
    out
}

fn write_outline(node: &NodeRef, depth: usize, out: &mut String) {
    let node = node.borrow();
    let _ = write!(out, "{:indent$}{}", "", node.node_type(), indent = depth * 2);
    if let Some(text) = node.text() {
        let _ = write!(out, " {text:?}");
    }
    if !node.data().is_empty() {
        let _ = write!(out, " {}", serde_json::Value::Object(node.data().clone()));
    }
    out.push('\n');
    for child in node.children() {
        write_outline(child, depth + 1, out);
    }
}
