//! Nimbus Core Types
//!
//! This crate provides the order-preserving document tree used to represent
//! infrastructure templates. It includes:
//!
//! - **Nodes**: the tree itself ([`node::Node`]) with scalar, sequence, mapping
//!   and alias variants, comments, and path-based get/set
//! - **Paths**: typed addressing of any location in a tree ([`path::Path`],
//!   [`path!`])
//! - **Conversion**: trees to and from serde host values through
//!   `serde_yaml::Value`
//! - **Errors**: [`error::NodeError`], raised by every fallible tree operation

mod convert;
pub mod error;
pub mod node;
pub mod path;

pub use error::NodeError;
pub use node::{Alias, Mapping, Node, NodeEntry, NodeKind, Scalar, ScalarKind, Sequence};
pub use path::{Path, PathSegment};
