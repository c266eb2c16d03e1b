// Engine error types.
//
// Sparse or malformed statistics never surface here; they degrade to zero or
// to a skipped weight term. Only caller/engine contract mismatches do.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoringError {
    #[error("unknown scoring component `{path}`")]
    UnknownComponent { path: String },

    #[error("component `{path}` has the wrong shape: expected {expected}")]
    ShapeMismatch { path: String, expected: &'static str },

    #[error("invalid weight for `{path}`: {value}")]
    InvalidWeight { path: String, value: f64 },

    #[error("no category definition for clutch component `{key}`")]
    MissingCategory { key: String },

    #[error("failed to parse weight tree: {message}")]
    Parse { message: String },
}
