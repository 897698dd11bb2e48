//! Retext Error Handling
//!
//! Every failure the engine can surface is a [`RetextError`]. The enum is split
//! into four families, see [`ErrorCategory`]:
//!
//! - **Guards**: contract violations by the caller (`InvalidPlugin`,
//!   `InvalidCallback`). Raised synchronously at the offending call.
//! - **Build**: the CST could not be mapped onto the object model
//!   (`UnknownNodeType`, `ShapeMismatch`, `MalformedCst`).
//! - **Parse**: the upstream parser rejected its input. Carries the source text
//!   so `miette` can render a labelled snippet.
//! - **Pipeline**: a plugin failed. Delivered through the completion callback.
//!
//! Configuration and I/O failures from the CLI surface share the same type.

use std::fmt;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::model::Shape;

/// Unified error type for all retext failure modes.
#[derive(Debug, Error, Diagnostic)]
pub enum RetextError {
    #[error("unknown node type `{node_type}`")]
    #[diagnostic(
        code(retext::build::unknown_node_type),
        help("register `{node_type}` on the object model before building trees that use it")
    )]
    UnknownNodeType { node_type: String },

    #[error("`{node_type}` is a {shape} node and cannot accept {operation}")]
    #[diagnostic(code(retext::build::shape_mismatch))]
    ShapeMismatch {
        node_type: String,
        shape: Shape,
        operation: &'static str,
    },

    #[error("malformed CST node `{node_type}`: {reason}")]
    #[diagnostic(
        code(retext::build::malformed_cst),
        help("a CST node carries exactly one of `children` or `value`")
    )]
    MalformedCst { node_type: String, reason: String },

    #[error("invalid plugin: {reason}")]
    #[diagnostic(code(retext::guard::invalid_plugin))]
    InvalidPlugin { reason: String },

    #[error("invalid callback: `{operation}` requires a completion callback")]
    #[diagnostic(code(retext::guard::invalid_callback))]
    InvalidCallback { operation: &'static str },

    #[error("parse error: {message}")]
    #[diagnostic(code(retext::parse))]
    Parse {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("plugin `{plugin}` failed: {message}")]
    #[diagnostic(code(retext::pipeline::plugin))]
    Plugin { plugin: String, message: String },

    #[error("pipeline suspended: plugin `{plugin}` has not resumed")]
    #[diagnostic(
        code(retext::pipeline::suspended),
        help("asynchronous plugins must be driven to completion by their caller")
    )]
    Suspended { plugin: String },

    #[error("configuration error: {message}")]
    #[diagnostic(code(retext::config))]
    Config { message: String },

    #[error(transparent)]
    #[diagnostic(code(retext::io))]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by tests and the CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Guard,
    Build,
    Parse,
    Pipeline,
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Guard => "guard",
            ErrorCategory::Build => "build",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Pipeline => "pipeline",
            ErrorCategory::Config => "config",
        };
        f.write_str(name)
    }
}

impl RetextError {
    /// Error raised by a plugin while processing a tree.
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        RetextError::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Parse failure with the offending source attached for rendering.
    pub fn parse(
        source_name: impl AsRef<str>,
        source: impl Into<String>,
        span: impl Into<SourceSpan>,
        message: impl Into<String>,
    ) -> Self {
        RetextError::Parse {
            message: message.into(),
            src: NamedSource::new(source_name, source.into()),
            span: span.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        RetextError::Config {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPlugin { .. } | Self::InvalidCallback { .. } => ErrorCategory::Guard,
            Self::UnknownNodeType { .. } | Self::ShapeMismatch { .. } | Self::MalformedCst { .. } => {
                ErrorCategory::Build
            }
            Self::Parse { .. } => ErrorCategory::Parse,
            Self::Plugin { .. } | Self::Suspended { .. } => ErrorCategory::Pipeline,
            Self::Config { .. } | Self::Io(_) => ErrorCategory::Config,
        }
    }

    /// True for caller contract violations, the "type errors" of the API.
    pub fn is_guard(&self) -> bool {
        self.category() == ErrorCategory::Guard
    }
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints a RetextError with full miette diagnostics.
pub fn print_error(error: RetextError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        assert!(RetextError::InvalidCallback { operation: "run" }.is_guard());
        assert_eq!(
            RetextError::plugin("stats", "boom").category(),
            ErrorCategory::Pipeline
        );
        assert_eq!(
            RetextError::UnknownNodeType {
                node_type: "X".into()
            }
            .category(),
            ErrorCategory::Build
        );
        assert_eq!(
            RetextError::parse("input", "abc", 0usize..1, "bad").category(),
            ErrorCategory::Parse
        );
    }

    #[test]
    fn diagnostic_codes_are_namespaced() {
        let error = RetextError::plugin("stats", "boom");
        let code = error.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("retext::pipeline::plugin"));
        assert_eq!(error.to_string(), "plugin `stats` failed: boom");
    }

    #[test]
    fn shape_mismatch_message_names_the_shape() {
        let error = RetextError::ShapeMismatch {
            node_type: "WordNode".into(),
            shape: Shape::Text,
            operation: "children",
        };
        assert_eq!(
            error.to_string(),
            "`WordNode` is a text node and cannot accept children"
        );
    }
}
