//! Plain-text rendering of diffs and dependency graphs.

use std::fmt::{self, Write};

use nimbus::{
    diff::{Diff, DiffEntry, DiffKind, DiffMode},
    graph::{Graph, GraphError},
    node::{Node, ScalarKind},
};
use nimbus_core::NodeError;

/// Renders the entries selected by `mode`, one per line, followed by a
/// summary line.
///
/// Lines start with `+` (added), `-` (removed), `~` (changed) or a space
/// (unchanged). Scalar values are shown inline; a composite shows only its
/// path and is followed by its children.
pub fn render_diff(diff: &Diff<'_>, mode: DiffMode) -> String {
    let mut out = String::new();
    if diff.is_unchanged() && mode == DiffMode::Concise {
        out.push_str("no changes\n");
        return out;
    }

    for entry in diff.entries_for(mode) {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}", DisplayEntry(entry));
    }
    let _ = writeln!(out, "{}", diff.summary());
    out
}

/// Renders the deployment order of `graph`, each element followed by its
/// direct dependencies.
///
/// # Errors
///
/// Returns `GraphError::Cycle` when the graph cannot be ordered.
pub fn render_graph(graph: &Graph) -> Result<String, GraphError> {
    let mut out = String::new();
    for element in graph.nodes()? {
        let dependencies = graph.dependencies(element);
        if dependencies.is_empty() {
            let _ = writeln!(out, "{element}");
            continue;
        }

        let names: Vec<String> = dependencies.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "{element} -> {}", names.join(", "));
    }
    Ok(out)
}

/// Renders a node the way `get` prints it: YAML for composites, the bare
/// representation for scalars.
pub fn render_node(node: &Node) -> Result<String, NodeError> {
    if let Node::Scalar(scalar) = node {
        return Ok(format!("{}\n", scalar.repr()));
    }
    let value = node.to_value()?;
    serde_yaml::to_string(&value).map_err(|err| NodeError::Encoding(err.to_string()))
}

struct DisplayEntry<'e, 'a>(&'e DiffEntry<'a>);

impl fmt::Display for DisplayEntry<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.0;
        let symbol = match entry.kind() {
            DiffKind::Added => '+',
            DiffKind::Removed => '-',
            DiffKind::Changed => '~',
            DiffKind::Unchanged => ' ',
        };
        write!(f, "{symbol} ")?;
        if entry.path().is_root() {
            write!(f, "/")?;
        } else {
            write!(f, "{}", entry.path())?;
        }

        match (entry.from(), entry.to()) {
            (Some(from), Some(to)) if entry.kind() == DiffKind::Changed => {
                if !same_composite(from, to) {
                    write!(f, ": {} -> {}", DisplayValue(from), DisplayValue(to))?;
                }
            }
            (_, Some(value)) | (Some(value), None) => {
                if !is_composite(value) {
                    write!(f, ": {}", DisplayValue(value))?;
                }
            }
            (None, None) => {}
        }
        Ok(())
    }
}

/// Flow form of a value. A string scalar that would read back as another
/// type (`'1'`, `'true'`, `''`) is quoted so a type change stays visible.
struct DisplayValue<'a>(&'a Node);

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Node::Scalar(scalar)
                if scalar.kind() == ScalarKind::String && reads_as_other_type(scalar.repr()) =>
            {
                write!(f, "{:?}", scalar.repr())
            }
            node => write!(f, "{node}"),
        }
    }
}

fn reads_as_other_type(text: &str) -> bool {
    !matches!(
        serde_yaml::from_str::<serde_yaml::Value>(text),
        Ok(serde_yaml::Value::String(_))
    )
}

fn is_composite(node: &Node) -> bool {
    matches!(node, Node::Mapping(_) | Node::Sequence(_))
}

fn same_composite(from: &Node, to: &Node) -> bool {
    matches!(
        (from, to),
        (Node::Mapping(_), Node::Mapping(_)) | (Node::Sequence(_), Node::Sequence(_))
    )
}
