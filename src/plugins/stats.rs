//! Document statistics on the root node.
//!
//! Attaching `stats` also attaches `position`, so every tree that carries
//! counts also carries offsets.

use serde_json::json;

use crate::{
    errors::RetextError,
    model::{PARAGRAPH_NODE, SENTENCE_NODE, WORD_NODE},
    plugin::Plugin,
    tree::{visit, NodeRef},
};

use super::{position, Options};

pub const NAME: &str = "stats";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub words: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub characters: usize,
}

pub fn plugin(_options: &Options) -> Result<Plugin, RetextError> {
    Ok(Plugin::build(NAME)
        .on_attach(|processor| processor.use_named(position::NAME).map(|_| ()))
        .sync(|tree, _| {
            let counts = count(tree);
            tree.borrow_mut().data_mut().insert(
                "stats".into(),
                json!({
                    "words": counts.words,
                    "sentences": counts.sentences,
                    "paragraphs": counts.paragraphs,
                    "characters": counts.characters,
                }),
            );
            Ok(())
        }))
}

pub fn count(tree: &NodeRef) -> Counts {
    let mut counts = Counts {
        characters: tree.borrow().to_text().chars().count(),
        ..Counts::default()
    };
    visit(tree, None, &mut |node: &NodeRef| {
        match node.borrow().node_type() {
            WORD_NODE => counts.words += 1,
            SENTENCE_NODE => counts.sentences += 1,
            PARAGRAPH_NODE => counts.paragraphs += 1,
            _ => {}
        }
    });
    counts
}
