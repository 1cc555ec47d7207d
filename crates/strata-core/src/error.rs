//! Error types for statement rendering and value conversion.

use thiserror::Error;

/// Errors raised while rendering a statement or converting a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A placeholder had no parameter left to consume.
    #[error("placeholder #{position} has no parameter")]
    MissingParameter {
        /// Zero-based placeholder position.
        position: usize,
    },

    /// A placeholder received a parameter of the wrong kind.
    #[error("placeholder #{position} expects {expected}")]
    ParameterKind {
        /// Zero-based placeholder position.
        position: usize,
        /// Human readable kind that was expected.
        expected: &'static str,
    },

    /// More parameters than placeholders.
    #[error("{unused} parameter(s) left unused")]
    UnusedParameters {
        /// Number of parameters that were never consumed.
        unused: usize,
    },

    /// A `SET ?` placeholder received no assignments.
    #[error("empty assignment list")]
    EmptyAssignments,

    /// A value could not be converted to the requested type.
    #[error("cannot convert {found} value to {expected}")]
    Conversion {
        /// Target type.
        expected: &'static str,
        /// Source value type.
        found: &'static str,
    },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
