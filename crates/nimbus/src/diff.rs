//! Structural comparison of document trees.
//!
//! [`diff`] walks two trees side by side and emits one [`DiffEntry`] per path
//! present in either input: depth-first, a parent before its children, mapping
//! keys in sorted order. Presentation is left to renderers; [`DiffMode`] only
//! selects which entries they see.
//!
//! Sequences are compared by index. An element inserted at the front of a
//! list therefore shows up as a cascade of changes plus one addition at the
//! end, not as a move.
//!
//! # Example
//!
//! ```
//! use nimbus::{diff::{DiffKind, DiffMode, diff}, template::Template};
//!
//! let from = Template::parse("Resources:\n  Bucket:\n    Type: A\n").unwrap();
//! let to = Template::parse("Resources:\n  Bucket:\n    Type: B\n").unwrap();
//!
//! let result = diff(from.root(), to.root());
//! let changed: Vec<String> = result
//!     .entries_for(DiffMode::Concise)
//!     .map(|entry| entry.path().to_string())
//!     .collect();
//! assert_eq!(changed, vec!["", "Resources", "Resources/Bucket", "Resources/Bucket/Type"]);
//! assert_eq!(result.summary().changed, 4);
//! ```

use std::fmt;

use log::debug;
use serde::Deserialize;

use nimbus_core::{Node, path::Path};

/// How a path differs between the two inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffKind::Added => write!(f, "added"),
            DiffKind::Removed => write!(f, "removed"),
            DiffKind::Changed => write!(f, "changed"),
            DiffKind::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Which entries a diff reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    /// Only added, removed and changed entries.
    #[default]
    Concise,
    /// Every entry, unchanged ones included.
    Verbose,
}

impl DiffMode {
    fn includes(self, kind: DiffKind) -> bool {
        match self {
            DiffMode::Concise => kind != DiffKind::Unchanged,
            DiffMode::Verbose => true,
        }
    }
}

/// One compared path, borrowing the compared values.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry<'a> {
    path: Path,
    kind: DiffKind,
    from: Option<&'a Node>,
    to: Option<&'a Node>,
}

impl<'a> DiffEntry<'a> {
    /// Path relative to the compared roots.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DiffKind {
        self.kind
    }

    /// The value on the `from` side; `None` for added paths.
    pub fn from(&self) -> Option<&'a Node> {
        self.from
    }

    /// The value on the `to` side; `None` for removed paths.
    pub fn to(&self) -> Option<&'a Node> {
        self.to
    }
}

/// Entry counts per [`DiffKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} changed",
            self.added, self.removed, self.changed
        )
    }
}

/// The ordered result of [`diff`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff<'a> {
    entries: Vec<DiffEntry<'a>>,
}

impl<'a> Diff<'a> {
    /// Returns every entry, unchanged ones included.
    pub fn entries(&self) -> &[DiffEntry<'a>] {
        &self.entries
    }

    /// Returns the entries selected by `mode`, in order.
    pub fn entries_for(&self, mode: DiffMode) -> impl Iterator<Item = &DiffEntry<'a>> {
        self.entries
            .iter()
            .filter(move |entry| mode.includes(entry.kind))
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for entry in &self.entries {
            match entry.kind {
                DiffKind::Added => summary.added += 1,
                DiffKind::Removed => summary.removed += 1,
                DiffKind::Changed => summary.changed += 1,
                DiffKind::Unchanged => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Returns `true` when the inputs are structurally equal.
    pub fn is_unchanged(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.kind == DiffKind::Unchanged)
    }
}

impl<'d, 'a> IntoIterator for &'d Diff<'a> {
    type Item = &'d DiffEntry<'a>;
    type IntoIter = std::slice::Iter<'d, DiffEntry<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Compares two trees. Comments are ignored.
///
/// Entries borrow from both inputs instead of copying subtrees.
pub fn diff<'a>(from: &'a Node, to: &'a Node) -> Diff<'a> {
    let mut entries = Vec::new();
    compare(from, to, Path::root(), &mut entries);

    let result = Diff { entries };
    debug!(summary:% = result.summary(); "Diff computed");
    result
}

/// Emits the entries for `path` and below; returns whether anything differs.
fn compare<'a>(from: &'a Node, to: &'a Node, path: Path, out: &mut Vec<DiffEntry<'a>>) -> bool {
    match (from, to) {
        (Node::Mapping(a), Node::Mapping(b)) => {
            let slot = push_pair(out, &path, DiffKind::Unchanged, from, to);

            let mut keys: Vec<&str> = a.keys().chain(b.keys()).collect();
            keys.sort_unstable();
            keys.dedup();

            let mut changed = false;
            for key in keys {
                let child = path.child(key);
                changed |= match (a.get(key), b.get(key)) {
                    (Some(x), Some(y)) => compare(x, y, child, out),
                    (Some(x), None) => push_subtree(out, child, DiffKind::Removed, x),
                    (None, Some(y)) => push_subtree(out, child, DiffKind::Added, y),
                    (None, None) => false,
                };
            }
            mark(out, slot, changed)
        }
        (Node::Sequence(a), Node::Sequence(b)) => {
            let slot = push_pair(out, &path, DiffKind::Unchanged, from, to);

            let mut changed = false;
            for index in 0..a.len().max(b.len()) {
                let child = path.child(index);
                changed |= match (a.get(index), b.get(index)) {
                    (Some(x), Some(y)) => compare(x, y, child, out),
                    (Some(x), None) => push_subtree(out, child, DiffKind::Removed, x),
                    (None, Some(y)) => push_subtree(out, child, DiffKind::Added, y),
                    (None, None) => false,
                };
            }
            mark(out, slot, changed)
        }
        (Node::Scalar(a), Node::Scalar(b)) => push_leaf(out, path, a == b, from, to),
        (Node::Alias(a), Node::Alias(b)) => push_leaf(out, path, a == b, from, to),
        // Kind mismatch: the whole subtree is replaced.
        _ => push_leaf(out, path, false, from, to),
    }
}

fn push_pair<'a>(
    out: &mut Vec<DiffEntry<'a>>,
    path: &Path,
    kind: DiffKind,
    from: &'a Node,
    to: &'a Node,
) -> usize {
    out.push(DiffEntry {
        path: path.clone(),
        kind,
        from: Some(from),
        to: Some(to),
    });
    out.len() - 1
}

fn push_leaf<'a>(
    out: &mut Vec<DiffEntry<'a>>,
    path: Path,
    equal: bool,
    from: &'a Node,
    to: &'a Node,
) -> bool {
    let kind = if equal {
        DiffKind::Unchanged
    } else {
        DiffKind::Changed
    };
    push_pair(out, &path, kind, from, to);
    !equal
}

fn mark(out: &mut [DiffEntry<'_>], slot: usize, changed: bool) -> bool {
    if changed {
        out[slot].kind = DiffKind::Changed;
    }
    changed
}

/// Emits `kind` for `node` and every descendant, in flattening order.
fn push_subtree<'a>(
    out: &mut Vec<DiffEntry<'a>>,
    base: Path,
    kind: DiffKind,
    node: &'a Node,
) -> bool {
    for entry in node.nodes() {
        let value = Some(entry.node);
        let (from, to) = match kind {
            DiffKind::Removed => (value, None),
            _ => (None, value),
        };
        out.push(DiffEntry {
            path: base.join(&entry.path),
            kind,
            from,
            to,
        });
    }
    true
}


#[cfg(test)]
mod proptest_tests {
    use std::{collections::HashMap, result::Result};

    use nimbus_core::Mapping;
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn node_strategy() -> impl Strategy<Value = Node> {
        let leaf = prop_oneof![
            "[a-c]{1,2}".prop_map(Node::from),
            (0i64..4).prop_map(Node::from),
            any::<bool>().prop_map(Node::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Node::from),
                prop::collection::vec(("[a-d]", inner), 0..4)
                    .prop_map(|entries| Node::from(Mapping::from_iter(entries))),
            ]
        })
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Swapping the inputs swaps Added/Removed and the from/to values.
    fn check_symmetry(a: Node, b: Node) -> Result<(), TestCaseError> {
        let forward = diff(&a, &b);
        let backward = diff(&b, &a);
        prop_assert_eq!(forward.entries().len(), backward.entries().len());

        let backward_by_path: HashMap<&Path, &DiffEntry> = backward
            .entries()
            .iter()
            .map(|entry| (entry.path(), entry))
            .collect();

        for entry in forward.entries() {
            let other = backward_by_path.get(entry.path());
            prop_assert!(other.is_some(), "missing path {}", entry.path());
            let Some(other) = other else {
                continue;
            };
            let expected = match entry.kind() {
                DiffKind::Added => DiffKind::Removed,
                DiffKind::Removed => DiffKind::Added,
                kind => kind,
            };
            prop_assert_eq!(other.kind(), expected, "at {}", entry.path());
            prop_assert_eq!(other.from(), entry.to());
            prop_assert_eq!(other.to(), entry.from());
        }
        Ok(())
    }

    /// Every path of either input appears exactly once.
    fn check_paths_covered(a: Node, b: Node) -> Result<(), TestCaseError> {
        let result = diff(&a, &b);
        let mut seen: Vec<&Path> = result.entries().iter().map(DiffEntry::path).collect();
        let total = seen.len();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), total, "duplicate paths");

        for entry in a.nodes().iter().chain(b.nodes().iter()) {
            // Paths below a kind mismatch are summarised by their parent.
            let covered = seen.binary_search(&&entry.path).is_ok()
                || seen.iter().any(|path| {
                    entry.path.starts_with(path)
                        && result
                            .entries()
                            .iter()
                            .any(|e| e.path() == *path && e.kind() == DiffKind::Changed)
                });
            prop_assert!(covered, "path {} not covered", entry.path);
        }
        Ok(())
    }

    /// Diffing a tree against itself reports nothing in concise mode.
    fn check_self_diff(a: Node) -> Result<(), TestCaseError> {
        let result = diff(&a, &a);
        prop_assert!(result.is_unchanged());
        prop_assert_eq!(result.entries().len(), a.nodes().len());
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn diff_is_symmetric(a in node_strategy(), b in node_strategy()) {
            check_symmetry(a, b)?;
        }

        #[test]
        fn diff_covers_all_paths(a in node_strategy(), b in node_strategy()) {
            check_paths_covered(a, b)?;
        }

        #[test]
        fn self_diff_is_unchanged(a in node_strategy()) {
            check_self_diff(a)?;
        }
    }
}
