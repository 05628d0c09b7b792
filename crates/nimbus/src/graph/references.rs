//! Reference discovery inside element bodies.
//!
//! The scanner walks a subtree and reports the raw names referenced by
//! intrinsic functions. Raw names may still carry an attribute suffix
//! (`Bucket.Arn`); resolution happens in the builder.

use log::trace;

use nimbus_core::{Mapping, Node, Sequence};

use crate::config::GraphConfig;

const REF: &str = "Ref";
const GET_ATT: &str = "Fn::GetAtt";
const SUB: &str = "Fn::Sub";
const DEPENDS_ON: &str = "DependsOn";

/// Walks element bodies and collects referenced names.
pub(super) struct ReferenceScanner<'a> {
    config: &'a GraphConfig,
}

impl<'a> ReferenceScanner<'a> {
    pub(super) fn new(config: &'a GraphConfig) -> Self {
        Self { config }
    }

    /// Appends every name referenced anywhere in `node` to `out`.
    ///
    /// Mapping entries are visited in sorted key order so the result does not
    /// depend on document layout.
    pub(super) fn scan(&self, node: &Node, out: &mut Vec<String>) {
        match node {
            Node::Mapping(mapping) => {
                if let Some((key, value)) = mapping.single_entry() {
                    if self.scan_intrinsic(key, value, out) {
                        return;
                    }
                }
                for (_, child) in mapping.sorted_iter() {
                    self.scan(child, out);
                }
            }
            Node::Sequence(sequence) => {
                for item in sequence.iter() {
                    self.scan(item, out);
                }
            }
            Node::Scalar(_) | Node::Alias(_) => {}
        }
    }

    /// Handles a single-key intrinsic call. Returns `false` when the call has
    /// a shape that is not a reference, so the caller falls back to a plain
    /// walk of its children.
    fn scan_intrinsic(&self, key: &str, value: &Node, out: &mut Vec<String>) -> bool {
        match (key, value) {
            (REF, Node::Scalar(name)) => {
                out.push(name.repr().to_string());
                true
            }
            (GET_ATT, Node::Scalar(target)) => {
                out.push(target.repr().to_string());
                true
            }
            (GET_ATT, Node::Sequence(args)) => self.scan_get_att_args(args, out),
            (SUB, _) if !self.config.sub_placeholders() => false,
            (SUB, Node::Scalar(template)) => {
                sub_placeholders(template.repr(), None, out);
                true
            }
            (SUB, Node::Sequence(args)) => self.scan_sub_args(args, out),
            _ => false,
        }
    }

    fn scan_get_att_args(&self, args: &Sequence, out: &mut Vec<String>) -> bool {
        let Some(target) = args.get(0).and_then(Node::as_scalar) else {
            return false;
        };
        out.push(target.repr().to_string());
        for rest in args.iter().skip(1) {
            self.scan(rest, out);
        }
        true
    }

    fn scan_sub_args(&self, args: &Sequence, out: &mut Vec<String>) -> bool {
        if args.len() != 2 {
            return false;
        }
        let template = args.get(0).and_then(Node::as_scalar);
        let variables = args.get(1).and_then(Node::as_mapping);
        let (Some(template), Some(variables)) = (template, variables) else {
            return false;
        };

        sub_placeholders(template.repr(), Some(variables), out);
        for (_, value) in variables.sorted_iter() {
            self.scan(value, out);
        }
        true
    }
}

/// Returns the explicit `DependsOn` names of a resource body.
///
/// Accepts a single name or a list of names; anything else is ignored.
pub(super) fn depends_on(resource: &Node) -> Vec<String> {
    let Some(value) = resource.as_mapping().and_then(|body| body.get(DEPENDS_ON)) else {
        return Vec::new();
    };
    match value {
        Node::Scalar(name) => vec![name.repr().to_string()],
        Node::Sequence(names) => names
            .iter()
            .filter_map(Node::as_scalar)
            .map(|name| name.repr().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Extracts `${Name}` and `${Name.Attr}` placeholders from an `Fn::Sub`
/// template string.
///
/// `${!Literal}` is an escape and names bound by `variables` are local, so
/// neither is reported.
fn sub_placeholders(template: &str, variables: Option<&Mapping>, out: &mut Vec<String>) {
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = after[..end].trim();
        rest = &after[end + 1..];

        if name.is_empty() || name.starts_with('!') {
            continue;
        }
        if variables.is_some_and(|vars| vars.contains_key(name)) {
            trace!(name; "Skipping bound Fn::Sub variable");
            continue;
        }
        out.push(name.to_string());
    }
}
