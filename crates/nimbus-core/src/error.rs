//! Error types for tree navigation and host-value conversion.
//!
//! Every failure carries the path prefix at which it was detected so callers
//! can print a one-line diagnostic pointing at the offending location.

use thiserror::Error;

use crate::{
    node::NodeKind,
    path::{Path, PathSegment},
};

/// A type alias for `Result<T, NodeError>`.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Errors raised by [`Node`](crate::node::Node) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The segment type does not fit the node kind (an index on a mapping,
    /// or a key on a sequence).
    #[error("cannot index a {found} with `{segment}` at `{path}`")]
    PathType {
        path: Path,
        segment: PathSegment,
        found: NodeKind,
    },

    /// A read addressed a mapping key that does not exist.
    #[error("unknown key `{key}` at `{path}`")]
    UnknownKey { path: Path, key: String },

    /// A read or write addressed an index outside the allowed bounds.
    #[error("index {index} out of range for sequence of length {len} at `{path}`")]
    IndexOutOfRange {
        path: Path,
        index: usize,
        len: usize,
    },

    /// A path continued past a scalar.
    #[error("cannot index scalar with `{segment}` at `{path}`")]
    NotIndexable { path: Path, segment: PathSegment },

    /// An unresolved alias was met where a concrete value is required.
    #[error("alias `*{anchor}` is not supported at `{path}`")]
    UnsupportedNode { path: Path, anchor: String },

    /// A host value could not be converted to or from a tree.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl NodeError {
    /// Returns the path at which the error was detected, if it has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            NodeError::PathType { path, .. }
            | NodeError::UnknownKey { path, .. }
            | NodeError::IndexOutOfRange { path, .. }
            | NodeError::NotIndexable { path, .. }
            | NodeError::UnsupportedNode { path, .. } => Some(path),
            NodeError::Encoding(_) => None,
        }
    }

    pub(crate) fn encoding(message: impl Into<String>) -> Self {
        NodeError::Encoding(message.into())
    }
}
