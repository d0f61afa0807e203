//! Unified error types for the bakery workspace.
//!
//! Resolution is all-or-nothing: every variant is fatal and is surfaced to
//! the caller with enough context to correct the source document.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum BakeryError {
    /// The document is structurally invalid: a required section or mandatory
    /// builder field is absent, or the JSON itself does not parse.
    #[error("malformed spec: {message}")]
    MalformedSpec {
        /// Description of the structural violation, including the document
        /// location where serde can provide one.
        message: String,
    },

    /// A placeholder had no value through any precedence layer.
    #[error("unresolved variable `{variable}` (referenced by {context})")]
    UnresolvedVariable {
        /// Name of the variable that could not be resolved.
        variable: String,
        /// The builder or provision step and field that referenced it.
        context: String,
    },

    /// A provision step or selection names a builder that is not declared.
    #[error("provision step {step} applies to unknown builder \"{builder}\"")]
    ApplicabilityMismatch {
        /// Human-readable identity of the offending step or selector.
        step: String,
        /// The undeclared builder name.
        builder: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization of a resolved plan failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BakeryError>;
