//! retext: parse prose into a typed text tree and run plugins over it.
//!
//! A [`Processor`] binds a [`Parser`](parser::Parser) to an [`ObjectModel`],
//! keeps an ordered registry of [`Plugin`]s, and runs them in sequence over
//! each tree it builds. See [`processor`] for a worked example.

pub use crate::cst::CstNode;
pub use crate::errors::{ErrorCategory, RetextError};
pub use crate::model::{ObjectModel, Shape};
pub use crate::pipeline::Next;
pub use crate::plugin::Plugin;
pub use crate::processor::Processor;
pub use crate::tree::{Node, NodeRef};

pub mod cli;
pub mod config;
pub mod cst;
pub mod errors;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod processor;
pub mod tree;
