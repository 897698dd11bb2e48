//! # Parsers
//!
//! A parser turns text into a [`CstNode`]. The engine only relies on the
//! [`Parser`] trait; the crate ships [`EnglishParser`] as the default.
//!
//! Any `Fn(&str) -> Result<CstNode, RetextError>` is a parser too, which keeps
//! fixed-output parsers for tests and embedders to a single closure.

use std::rc::Weak;

use crate::{cst::CstNode, errors::RetextError, model::ObjectModel};

mod english;

pub use english::EnglishParser;

pub trait Parser {
    /// Parses `text` into a concrete syntax tree. Failures propagate
    /// synchronously out of [`Processor::parse`](crate::processor::Processor::parse).
    fn parse(&self, text: &str) -> Result<CstNode, RetextError>;

    /// Called once when the parser is bound to a processor's object model.
    fn bind(&self, _model: Weak<ObjectModel>) {}
}

impl<F> Parser for F
where
    F: Fn(&str) -> Result<CstNode, RetextError>,
{
    fn parse(&self, text: &str) -> Result<CstNode, RetextError> {
        self(text)
    }
}
