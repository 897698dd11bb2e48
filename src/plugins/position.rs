//! Byte offsets for every node.
//!
//! Writes `data.position = {"start": n, "end": m}` on each node, where the
//! range indexes into the concatenated text of the tree.

use serde_json::json;

use crate::{errors::RetextError, plugin::Plugin, tree::NodeRef};

use super::Options;

pub const NAME: &str = "position";

pub fn plugin(_options: &Options) -> Result<Plugin, RetextError> {
    Ok(Plugin::sync(NAME, |tree, _| {
        annotate(tree, 0);
        Ok(())
    }))
}

/// Annotates `node` as starting at `start` and returns its end offset.
fn annotate(node: &NodeRef, start: usize) -> usize {
    let (text_len, children) = {
        let node = node.borrow();
        (node.text().map(str::len), node.children().to_vec())
    };
    let end = match text_len {
        Some(len) => start + len,
        None => children
            .iter()
            .fold(start, |offset, child| annotate(child, offset)),
    };
    node.borrow_mut()
        .data_mut()
        .insert("position".into(), json!({ "start": start, "end": end }));
    end
}
