//! Default natural-language parser.
//!
//! The `pest` grammar yields a flat stream of words, white space, punctuation
//! and symbols. Grouping happens here:
//!
//! - white space holding two or more line breaks separates paragraphs and is
//!   kept in the root;
//! - a sentence ends after terminal punctuation (`.`, `!`, `?`, `…`, `‽`),
//!   absorbing further terminals and the closing quotes and brackets that
//!   follow it;
//! - white space between sentences belongs to the paragraph.
//!
//! Every byte of the input lands in exactly one leaf, so concatenating the
//! leaves reproduces the input.

use std::{
    mem,
    rc::{Rc, Weak},
};

use once_cell::unsync::OnceCell;
use pest::{error::InputLocation, Parser as _};
use pest_derive::Parser;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    cst::CstNode,
    errors::RetextError,
    model::{
        ObjectModel, PARAGRAPH_NODE, PUNCTUATION_NODE, ROOT_NODE, SENTENCE_NODE, SYMBOL_NODE,
        WHITE_SPACE_NODE, WORD_NODE,
    },
};

#[derive(Parser)]
#[grammar = "parser/english.pest"]
struct EnglishGrammar;

const TERMINALS: &[&str] = &[".", "!", "?", "\u{2026}", "\u{203d}"];
const CLOSERS: &[&str] = &[
    ")", "]", "}", "\"", "'", "\u{201d}", "\u{2019}", "\u{bb}",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    WhiteSpace,
    Punctuation,
    Symbol,
}

impl TokenKind {
    fn node_type(self) -> &'static str {
        match self {
            TokenKind::Word => WORD_NODE,
            TokenKind::WhiteSpace => WHITE_SPACE_NODE,
            TokenKind::Punctuation => PUNCTUATION_NODE,
            TokenKind::Symbol => SYMBOL_NODE,
        }
    }
}

/// English prose parser producing `RootNode → ParagraphNode → SentenceNode`
/// trees with word, white space, punctuation and symbol leaves.
#[derive(Debug, Default)]
pub struct EnglishParser {
    model: OnceCell<Weak<ObjectModel>>,
}

impl EnglishParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// The object model this parser was bound to, if its processor is alive.
    pub fn model(&self) -> Option<Rc<ObjectModel>> {
        self.model.get().and_then(Weak::upgrade)
    }

    fn tokenize<'a>(&self, text: &'a str) -> Result<Vec<(TokenKind, &'a str)>, RetextError> {
        let mut pairs = EnglishGrammar::parse(Rule::tokens, text)
            .map_err(|error| convert_parse_error(error, text))?;
        let Some(tokens) = pairs.next() else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        // Byte range of the pending run of adjacent symbol code points.
        let mut symbols: Option<(usize, usize)> = None;
        for pair in tokens.into_inner() {
            let kind = match pair.as_rule() {
                Rule::word => TokenKind::Word,
                Rule::white_space => TokenKind::WhiteSpace,
                Rule::punctuation => TokenKind::Punctuation,
                Rule::symbol => {
                    let span = pair.as_span();
                    let start = symbols.map_or(span.start(), |(start, _)| start);
                    symbols = Some((start, span.end()));
                    continue;
                }
                _ => continue,
            };
            flush_symbols(text, &mut symbols, &mut out);
            out.push((kind, pair.as_str()));
        }
        flush_symbols(text, &mut symbols, &mut out);
        Ok(out)
    }
}

impl crate::parser::Parser for EnglishParser {
    fn parse(&self, text: &str) -> Result<CstNode, RetextError> {
        let tokens = self.tokenize(text)?;
        debug!(tokens = tokens.len(), "tokenized input");

        let mut grouper = Grouper::default();
        for (kind, token) in tokens {
            grouper.push(kind, token);
        }
        Ok(grouper.finish())
    }

    fn bind(&self, model: Weak<ObjectModel>) {
        if self.model.set(model).is_err() {
            debug!("english parser already bound; keeping the first object model");
        }
    }
}

// ============================================================================
// GROUPING
// ============================================================================

#[derive(Default)]
struct Grouper {
    root: Vec<CstNode>,
    paragraph: Vec<CstNode>,
    sentence: Vec<CstNode>,
    /// The current sentence has seen its terminal punctuation.
    closed: bool,
}

impl Grouper {
    fn push(&mut self, kind: TokenKind, text: &str) {
        let leaf = CstNode::leaf(kind.node_type(), text);
        match kind {
            TokenKind::WhiteSpace if is_paragraph_break(text) => {
                self.finish_paragraph();
                self.root.push(leaf);
            }
            TokenKind::WhiteSpace if self.closed || self.sentence.is_empty() => {
                self.finish_sentence();
                self.paragraph.push(leaf);
            }
            TokenKind::WhiteSpace => self.sentence.push(leaf),
            TokenKind::Punctuation
                if self.closed && (CLOSERS.contains(&text) || TERMINALS.contains(&text)) =>
            {
                self.sentence.push(leaf);
            }
            _ => {
                if self.closed {
                    self.finish_sentence();
                }
                self.closed = kind == TokenKind::Punctuation && TERMINALS.contains(&text);
                self.sentence.push(leaf);
            }
        }
    }

    fn finish_sentence(&mut self) {
        self.closed = false;
        let mut trailing = Vec::new();
        while self
            .sentence
            .last()
            .is_some_and(|node| node.node_type == WHITE_SPACE_NODE)
        {
            trailing.extend(self.sentence.pop());
        }
        if !self.sentence.is_empty() {
            let words = mem::take(&mut self.sentence);
            self.paragraph.push(CstNode::parent(SENTENCE_NODE, words));
        }
        self.paragraph.extend(trailing.into_iter().rev());
    }

    fn finish_paragraph(&mut self) {
        self.finish_sentence();
        let children = mem::take(&mut self.paragraph);
        if children
            .iter()
            .all(|node| node.node_type == WHITE_SPACE_NODE)
        {
            self.root.extend(children);
        } else {
            self.root.push(CstNode::parent(PARAGRAPH_NODE, children));
        }
    }

    fn finish(mut self) -> CstNode {
        self.finish_paragraph();
        CstNode::parent(ROOT_NODE, self.root)
    }
}

/// Emits the pending symbol run as one token per extended grapheme cluster,
/// so emoji sequences joined by ZWJ or followed by a variation selector stay
/// whole.
fn flush_symbols<'a>(
    text: &'a str,
    symbols: &mut Option<(usize, usize)>,
    out: &mut Vec<(TokenKind, &'a str)>,
) {
    if let Some((start, end)) = symbols.take() {
        out.extend(
            text[start..end]
                .graphemes(true)
                .map(|grapheme| (TokenKind::Symbol, grapheme)),
        );
    }
}

fn is_paragraph_break(white_space: &str) -> bool {
    white_space.matches('\n').count() >= 2
}

fn convert_parse_error(error: pest::error::Error<Rule>, text: &str) -> RetextError {
    let span = match error.location {
        InputLocation::Pos(pos) => (pos, 0),
        InputLocation::Span((start, end)) => (start, end.saturating_sub(start)),
    };
    RetextError::parse("input", text, span, error.variant.message().to_string())
}
