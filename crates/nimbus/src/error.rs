//! Error types for Nimbus operations.
//!
//! This module provides the main error type [`NimbusError`] which wraps
//! the error conditions that can occur while loading, editing and analysing
//! templates.

use std::io;

use thiserror::Error;

use nimbus_core::NodeError;

use crate::graph::GraphError;

/// The main error type for Nimbus operations.
///
/// # Diagnostic Variants
///
/// The `Parse` variant keeps the source text next to the parser error so a
/// renderer can point at the failing location.
#[derive(Debug, Error)]
pub enum NimbusError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: serde_yaml::Error, src: String },

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl NimbusError {
    /// Create a new `Parse` error with the associated source code.
    pub fn new_parse_error(err: serde_yaml::Error, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}
