//! The generic document tree.
//!
//! A [`Node`] is a closed tagged union of [`Scalar`], [`Sequence`], [`Mapping`]
//! and [`Alias`]. Mappings keep their entries in insertion order so that a
//! decoded document re-serializes with its original layout. Anything that must
//! be deterministic regardless of storage order (flattening, diffing, graph
//! extraction) sorts keys explicitly.
//!
//! Scalars, sequences and mappings may carry a comment. Comments are metadata:
//! they are cloned and carried through [`Node::set`], but ignored by equality.
//!
//! # Example
//!
//! ```
//! use nimbus_core::{node::Node, path};
//!
//! let mut root = Node::empty_mapping();
//! root.set(&path!["Foo", 0], "Bar").unwrap();
//! root.set(&path!["Foo", 1, "Baz"], "Quux").unwrap();
//!
//! assert_eq!(root.get(&path!["Foo", 1, "Baz"]).unwrap(), &Node::from("Quux"));
//! assert_eq!(root.to_string(), "{Foo: [Bar, {Baz: Quux}]}");
//! ```

use std::fmt;

use indexmap::IndexMap;
use log::trace;

use crate::{
    error::{NodeError, Result},
    path::{Path, PathSegment},
};

/// The primitive type inferred for a [`Scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    String,
    Number,
    Boolean,
    Null,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => write!(f, "string"),
            ScalarKind::Number => write!(f, "number"),
            ScalarKind::Boolean => write!(f, "boolean"),
            ScalarKind::Null => write!(f, "null"),
        }
    }
}

/// The shape of a [`Node`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
    Alias,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Scalar => write!(f, "scalar"),
            NodeKind::Sequence => write!(f, "sequence"),
            NodeKind::Mapping => write!(f, "mapping"),
            NodeKind::Alias => write!(f, "alias"),
        }
    }
}

// =============================================================================
// Scalar
// =============================================================================

/// An opaque leaf value: its textual representation plus an inferred type.
///
/// Two scalars are equal when both the representation and the kind match,
/// so the string `"1"` and the number `1` are different values.
#[derive(Debug, Clone)]
pub struct Scalar {
    repr: String,
    kind: ScalarKind,
    comment: Option<String>,
}

impl Scalar {
    /// Creates a scalar from its textual representation and kind.
    pub fn new(repr: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            repr: repr.into(),
            kind,
            comment: None,
        }
    }

    /// Creates a string scalar.
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(value, ScalarKind::String)
    }

    /// Creates the null scalar.
    pub fn null() -> Self {
        Self::new("null", ScalarKind::Null)
    }

    /// Returns the textual representation.
    pub fn repr(&self) -> &str {
        &self.repr
    }

    /// Returns the inferred primitive type.
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Returns the value if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self.kind {
            ScalarKind::String => Some(&self.repr),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match (self.kind, self.repr.as_str()) {
            (ScalarKind::Boolean, "true") => Some(true),
            (ScalarKind::Boolean, "false") => Some(false),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.kind {
            ScalarKind::Number => self.repr.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            ScalarKind::Number => self.repr.parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind == ScalarKind::Null
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    /// Sets the comment (builder style).
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.set_comment(comment);
        self
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.repr == other.repr
    }
}

impl Eq for Scalar {}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::string(value)
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::string(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::new(value.to_string(), ScalarKind::Boolean)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::new(value.to_string(), ScalarKind::Number)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::new(value.to_string(), ScalarKind::Number)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::new(serde_yaml::Number::from(value).to_string(), ScalarKind::Number)
    }
}

// =============================================================================
// Sequence
// =============================================================================

/// An ordered list of child nodes addressed by 0-based index.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    items: Vec<Node>,
    comment: Option<String>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.items.get_mut(index)
    }

    /// Appends a node at index `len()`.
    pub fn push(&mut self, node: impl Into<Node>) {
        self.items.push(node.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.items.iter()
    }

    pub fn items(&self) -> &[Node] {
        &self.items
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    /// Sets the comment (builder style).
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.set_comment(comment);
        self
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for Sequence {}

impl From<Vec<Node>> for Sequence {
    fn from(items: Vec<Node>) -> Self {
        Self {
            items,
            comment: None,
        }
    }
}

impl FromIterator<Node> for Sequence {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

// =============================================================================
// Mapping
// =============================================================================

/// An insertion-ordered map from string keys to child nodes.
///
/// Keys are unique. Re-inserting an existing key replaces its value in place
/// and keeps its position.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    entries: IndexMap<String, Node>,
    comment: Option<String>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces an entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<Node>) -> Option<Node> {
        self.entries.insert(key.into(), node.into())
    }

    /// Returns the keys in storage (insertion) order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the keys sorted by byte order.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the entries in storage (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// Returns the entries sorted by key.
    pub fn sorted_iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        let mut entries: Vec<(&str, &Node)> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }

    /// Returns the single entry of a one-key mapping.
    pub fn single_entry(&self) -> Option<(&str, &Node)> {
        if self.entries.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    /// Sets the comment (builder style).
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.set_comment(comment);
        self
    }
}

/// Mappings compare as maps: same keys with equal values, in any order.
impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Mapping {}

impl<K: Into<String>> FromIterator<(K, Node)> for Mapping {
    fn from_iter<T: IntoIterator<Item = (K, Node)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            comment: None,
        }
    }
}

// =============================================================================
// Alias
// =============================================================================

/// A reference to an anchored node that was left unresolved by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    anchor: String,
}

impl Alias {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
        }
    }

    pub fn anchor(&self) -> &str {
        &self.anchor
    }
}

// =============================================================================
// Node
// =============================================================================

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Sequence),
    Mapping(Mapping),
    Alias(Alias),
}

/// One entry produced by [`Node::nodes`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry<'a> {
    /// Path relative to the traversal root.
    pub path: Path,
    pub node: &'a Node,
}

impl Node {
    /// Creates an empty mapping node.
    pub fn empty_mapping() -> Self {
        Node::Mapping(Mapping::new())
    }

    /// Creates an empty sequence node.
    pub fn empty_sequence() -> Self {
        Node::Sequence(Sequence::new())
    }

    /// Creates the null scalar.
    pub fn null() -> Self {
        Node::Scalar(Scalar::null())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Scalar(_) => NodeKind::Scalar,
            Node::Sequence(_) => NodeKind::Sequence,
            Node::Mapping(_) => NodeKind::Mapping,
            Node::Alias(_) => NodeKind::Alias,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// Returns the string value of a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// Returns the attached comment, if any.
    pub fn comment(&self) -> Option<&str> {
        match self {
            Node::Scalar(scalar) => scalar.comment(),
            Node::Sequence(sequence) => sequence.comment(),
            Node::Mapping(mapping) => mapping.comment(),
            Node::Alias(_) => None,
        }
    }

    /// Attaches a comment.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::UnsupportedNode`] for aliases, which cannot carry
    /// comments.
    pub fn set_comment(&mut self, comment: impl Into<String>) -> Result<()> {
        match self.comment_slot_mut() {
            Some(slot) => {
                *slot = Some(comment.into());
                Ok(())
            }
            None => Err(self.unsupported(Path::root())),
        }
    }

    /// Removes and returns the attached comment.
    pub fn take_comment(&mut self) -> Option<String> {
        self.comment_slot_mut().and_then(Option::take)
    }

    fn comment_slot_mut(&mut self) -> Option<&mut Option<String>> {
        match self {
            Node::Scalar(scalar) => Some(&mut scalar.comment),
            Node::Sequence(sequence) => Some(&mut sequence.comment),
            Node::Mapping(mapping) => Some(&mut mapping.comment),
            Node::Alias(_) => None,
        }
    }

    fn unsupported(&self, path: Path) -> NodeError {
        let anchor = match self {
            Node::Alias(alias) => alias.anchor.clone(),
            _ => String::new(),
        };
        NodeError::UnsupportedNode { path, anchor }
    }

    /// Builds the error for a segment that cannot step into this node.
    fn step_error(&self, path: &Path, depth: usize) -> NodeError {
        let at = path.prefix(depth);
        let segment = path.segments()[depth].clone();
        match self {
            Node::Mapping(_) => match segment {
                PathSegment::Key(key) => NodeError::UnknownKey { path: at, key },
                segment @ PathSegment::Index(_) => NodeError::PathType {
                    path: at,
                    segment,
                    found: NodeKind::Mapping,
                },
            },
            Node::Sequence(sequence) => match segment {
                PathSegment::Index(index) => NodeError::IndexOutOfRange {
                    path: at,
                    index,
                    len: sequence.len(),
                },
                segment @ PathSegment::Key(_) => NodeError::PathType {
                    path: at,
                    segment,
                    found: NodeKind::Sequence,
                },
            },
            Node::Scalar(_) => NodeError::NotIndexable { path: at, segment },
            Node::Alias(_) => self.unsupported(at),
        }
    }

    /// Returns the node at `path`.
    ///
    /// The empty path returns `self`.
    ///
    /// # Errors
    ///
    /// - [`NodeError::UnknownKey`] for an absent mapping key
    /// - [`NodeError::IndexOutOfRange`] for an index `>= len`
    /// - [`NodeError::NotIndexable`] when the path continues past a scalar
    /// - [`NodeError::UnsupportedNode`] when the path crosses an alias
    /// - [`NodeError::PathType`] for an index on a mapping or a key on a sequence
    pub fn get(&self, path: &Path) -> Result<&Node> {
        let mut current = self;
        for (depth, segment) in path.iter().enumerate() {
            let next = match (current, segment) {
                (Node::Mapping(mapping), PathSegment::Key(key)) => mapping.get(key),
                (Node::Sequence(sequence), PathSegment::Index(index)) => sequence.get(*index),
                _ => None,
            };
            current = next.ok_or_else(|| current.step_error(path, depth))?;
        }
        Ok(current)
    }

    /// Returns a mutable reference to the node at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`Node::get`].
    pub fn get_mut(&mut self, path: &Path) -> Result<&mut Node> {
        get_mut_at(self, path, 0)
    }

    /// Stores `value` at `path`, creating missing structure on the way.
    ///
    /// Missing mapping keys are appended. A sequence grows by one element when
    /// the index equals its length. Freshly created positions become mappings
    /// or sequences depending on the next segment. The stored node keeps the
    /// shape of `value`; if the replaced node carried a comment and `value`
    /// has none, the comment is kept.
    ///
    /// The tree is left untouched when an error is returned.
    ///
    /// # Errors
    ///
    /// Same descent errors as [`Node::get`], except that absent keys are
    /// created and `index == len` appends. Any other index past the end fails
    /// with [`NodeError::IndexOutOfRange`].
    pub fn set(&mut self, path: &Path, value: impl Into<Node>) -> Result<()> {
        trace!(path:% = path; "Setting node");
        set_at(self, path, 0, value.into())
    }

    fn replace(&mut self, mut value: Node) {
        if value.comment().is_none() {
            if let Some(comment) = self.take_comment() {
                if let Some(slot) = value.comment_slot_mut() {
                    *slot = Some(comment);
                }
            }
        }
        *self = value;
    }

    /// Flattens the tree into `(path, node)` entries.
    ///
    /// Depth-first pre-order: a node comes before its children, mapping
    /// children are visited in sorted key order and sequence children in index
    /// order. Paths are relative to `self`, which is the first entry.
    pub fn nodes(&self) -> Vec<NodeEntry<'_>> {
        let mut out = Vec::new();
        self.collect_nodes(Path::root(), &mut out);
        out
    }

    fn collect_nodes<'a>(&'a self, path: Path, out: &mut Vec<NodeEntry<'a>>) {
        out.push(NodeEntry {
            path: path.clone(),
            node: self,
        });
        match self {
            Node::Mapping(mapping) => {
                for (key, child) in mapping.sorted_iter() {
                    child.collect_nodes(path.child(key), out);
                }
            }
            Node::Sequence(sequence) => {
                for (index, child) in sequence.iter().enumerate() {
                    child.collect_nodes(path.child(index), out);
                }
            }
            Node::Scalar(_) | Node::Alias(_) => {}
        }
    }
}

fn get_mut_at<'a>(node: &'a mut Node, path: &Path, depth: usize) -> Result<&'a mut Node> {
    let Some(segment) = path.segments().get(depth) else {
        return Ok(node);
    };

    let child = match (node, segment) {
        (Node::Mapping(mapping), PathSegment::Key(key)) => mapping
            .entries
            .get_mut(key.as_str())
            .ok_or_else(|| NodeError::UnknownKey {
                path: path.prefix(depth),
                key: key.clone(),
            })?,
        (Node::Sequence(sequence), PathSegment::Index(index)) => {
            let len = sequence.items.len();
            sequence
                .items
                .get_mut(*index)
                .ok_or_else(|| NodeError::IndexOutOfRange {
                    path: path.prefix(depth),
                    index: *index,
                    len,
                })?
        }
        (node, _) => return Err(node.step_error(path, depth)),
    };
    get_mut_at(child, path, depth + 1)
}

fn set_at(node: &mut Node, path: &Path, depth: usize, value: Node) -> Result<()> {
    let Some(segment) = path.segments().get(depth) else {
        node.replace(value);
        return Ok(());
    };

    match (node, segment) {
        (Node::Mapping(mapping), PathSegment::Key(key)) => {
            if let Some(child) = mapping.entries.get_mut(key.as_str()) {
                return set_at(child, path, depth + 1, value);
            }
            let subtree = build_subtree(path, depth + 1, value)?;
            mapping.entries.insert(key.clone(), subtree);
            Ok(())
        }
        (Node::Sequence(sequence), PathSegment::Index(index)) => {
            let len = sequence.items.len();
            if *index < len {
                set_at(&mut sequence.items[*index], path, depth + 1, value)
            } else if *index == len {
                let subtree = build_subtree(path, depth + 1, value)?;
                sequence.items.push(subtree);
                Ok(())
            } else {
                Err(NodeError::IndexOutOfRange {
                    path: path.prefix(depth),
                    index: *index,
                    len,
                })
            }
        }
        (node, _) => Err(node.step_error(path, depth)),
    }
}

/// Builds the subtree for the rest of `path` starting at `depth`.
///
/// Each fresh position takes the kind its next segment asks for.
fn build_subtree(path: &Path, depth: usize, value: Node) -> Result<Node> {
    let Some(segment) = path.segments().get(depth) else {
        return Ok(value);
    };

    match segment {
        PathSegment::Key(key) => {
            let child = build_subtree(path, depth + 1, value)?;
            let mut mapping = Mapping::new();
            mapping.insert(key.clone(), child);
            Ok(Node::Mapping(mapping))
        }
        PathSegment::Index(0) => {
            let child = build_subtree(path, depth + 1, value)?;
            Ok(Node::Sequence(Sequence::from(vec![child])))
        }
        PathSegment::Index(index) => Err(NodeError::IndexOutOfRange {
            path: path.prefix(depth),
            index: *index,
            len: 0,
        }),
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Node::Scalar(scalar)
    }
}

impl From<Sequence> for Node {
    fn from(sequence: Sequence) -> Self {
        Node::Sequence(sequence)
    }
}

impl From<Mapping> for Node {
    fn from(mapping: Mapping) -> Self {
        Node::Mapping(mapping)
    }
}

impl From<Alias> for Node {
    fn from(alias: Alias) -> Self {
        Node::Alias(alias)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(Sequence::from(items))
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Scalar(value.into())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Scalar(value.into())
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Scalar(value.into())
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Scalar(value.into())
    }
}

impl From<u64> for Node {
    fn from(value: u64) -> Self {
        Node::Scalar(value.into())
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Scalar(value.into())
    }
}

/// Single-line flow rendering, e.g. `{Foo: [Bar, 1]}`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Scalar(scalar) => write!(f, "{}", scalar.repr),
            Node::Sequence(sequence) => {
                write!(f, "[")?;
                for (i, item) in sequence.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Node::Mapping(mapping) => {
                write!(f, "{{")?;
                for (i, (key, value)) in mapping.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Node::Alias(alias) => write!(f, "*{}", alias.anchor),
        }
    }
}
