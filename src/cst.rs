//! # Concrete Syntax Tree
//!
//! The untyped tree handed over by a [`Parser`](crate::parser::Parser). A node
//! carries a `type` tag, either an ordered list of `children` or a literal
//! `value`, and optional free-form `data` forwarded verbatim to the typed tree.
//!
//! The serde representation matches the JSON shape produced by natural
//! language parsers (`{"type": "WordNode", "value": "Cat"}`), so CSTs can be
//! loaded from files or emitted by `retext tree --json`.

use serde::{Deserialize, Serialize};

use crate::errors::RetextError;

/// Free-form node attributes, shared by CST and tree nodes.
pub type Data = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CstNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<CstNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
}

/// Validated view of a node's payload: `children` XOR `value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CstContent<'a> {
    Children(&'a [CstNode]),
    Value(&'a str),
}

impl CstNode {
    /// Creates a non-leaf node.
    pub fn parent(node_type: impl Into<String>, children: Vec<CstNode>) -> Self {
        Self {
            node_type: node_type.into(),
            children: Some(children),
            value: None,
            data: None,
        }
    }

    /// Creates a leaf node.
    pub fn leaf(node_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            children: None,
            value: Some(value.into()),
            data: None,
        }
    }

    /// Adds one `data` attribute, replacing an earlier value for the same key.
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data
            .get_or_insert_with(Data::new)
            .insert(key.into(), value);
        self
    }

    pub fn content(&self) -> Result<CstContent<'_>, RetextError> {
        match (&self.children, &self.value) {
            (Some(children), None) => Ok(CstContent::Children(children)),
            (None, Some(value)) => Ok(CstContent::Value(value)),
            (Some(_), Some(_)) => Err(self.malformed("carries both `children` and `value`")),
            (None, None) => Err(self.malformed("carries neither `children` nor `value`")),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, RetextError> {
        serde_json::from_str(json).map_err(|e| {
            let offset = byte_offset(json, e.line(), e.column());
            RetextError::parse("cst.json", json, (offset, 0), e.to_string())
        })
    }

    pub fn to_json_pretty(&self) -> String {
        // Serializing owned strings and JSON values cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    fn malformed(&self, reason: &str) -> RetextError {
        RetextError::MalformedCst {
            node_type: self.node_type.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Byte offset of a one-based `line`/`column` position, clamped to `text`.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}
