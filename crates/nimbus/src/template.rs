//! Templates and the elements they declare.
//!
//! A [`Template`] is a document tree whose root is always a mapping of
//! top-level sections (`Parameters`, `Resources`, `Outputs`, ...). An
//! [`Element`] names one entry declared under a section.

use std::fmt;

use log::{debug, trace};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use nimbus_core::{Mapping, Node, NodeError, path::Path};

use crate::error::NimbusError;

/// The section an [`Element`] belongs to.
///
/// `PseudoParameters` holds built-in names that are resolved without a
/// declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Parameters,
    Resources,
    Outputs,
    PseudoParameters,
}

impl Section {
    /// Returns the section key as it appears in a template.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Parameters => "Parameters",
            Section::Resources => "Resources",
            Section::Outputs => "Outputs",
            Section::PseudoParameters => "PseudoParameters",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named entity declared under a top-level section.
///
/// Elements are ordered by name first, then by section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element {
    name: String,
    section: Section,
}

impl Element {
    pub fn new(name: impl Into<String>, section: Section) -> Self {
        Self {
            name: name.into(),
            section,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn section(&self) -> Section {
        self.section
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.section, self.name)
    }
}

/// An infrastructure template.
///
/// # Example
///
/// ```
/// use nimbus::{path, template::Template};
///
/// let mut template = Template::new();
/// template.set(&path!["Resources", "Bucket", "Type"], "AWS::S3::Bucket").unwrap();
///
/// let bucket_type = template.get(&path!["Resources", "Bucket", "Type"]).unwrap();
/// assert_eq!(bucket_type.as_str(), Some("AWS::S3::Bucket"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    root: Node,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    /// Creates a template with no sections.
    pub fn new() -> Self {
        Self {
            root: Node::empty_mapping(),
        }
    }

    /// Parses YAML or JSON text into a template.
    ///
    /// Short-form intrinsic tags (`!Ref`, `!GetAtt`, `!Sub`, ...) are expanded
    /// to their long form.
    ///
    /// # Errors
    ///
    /// Returns [`NimbusError::Parse`] for malformed text and
    /// [`NimbusError::Node`] when the document is not a mapping or contains
    /// keys that cannot be represented.
    pub fn parse(source: &str) -> Result<Self, NimbusError> {
        debug!(len = source.len(); "Parsing template");
        let value: serde_yaml::Value = serde_yaml::from_str(source)
            .map_err(|err| NimbusError::new_parse_error(err, source))?;
        let node = Node::try_from(value)?;
        let template = Self::try_from(node)?;
        trace!(sections:? = template.section_names(); "Parsed template");
        Ok(template)
    }

    /// Builds a template from any serializable host value.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Encoding`] if the value is not map-shaped.
    pub fn from_value<T: Serialize + ?Sized>(value: &T) -> Result<Self, NodeError> {
        Self::try_from(Node::encode(value)?)
    }

    /// Returns the root mapping node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Consumes the template and returns its root node.
    pub fn into_node(self) -> Node {
        self.root
    }

    /// Returns a top-level section if it is present and map-shaped.
    pub fn section(&self, section: Section) -> Option<&Mapping> {
        self.root
            .as_mapping()
            .and_then(|root| root.get(section.as_str()))
            .and_then(Node::as_mapping)
    }

    fn section_names(&self) -> Vec<&str> {
        self.root
            .as_mapping()
            .map(|root| root.keys().collect())
            .unwrap_or_default()
    }

    /// Returns the node at `path`.
    ///
    /// # Errors
    ///
    /// See [`Node::get`].
    pub fn get(&self, path: &Path) -> Result<&Node, NodeError> {
        self.root.get(path)
    }

    /// Stores `value` at `path`; see [`Node::set`].
    ///
    /// # Errors
    ///
    /// See [`Node::set`]. Replacing the whole root with something other than
    /// a mapping fails with [`NodeError::Encoding`].
    pub fn set(&mut self, path: &Path, value: impl Into<Node>) -> Result<(), NodeError> {
        let value = value.into();
        if path.is_root() && value.as_mapping().is_none() {
            return Err(NodeError::Encoding(format!(
                "template root must be a mapping, found {}",
                value.kind()
            )));
        }
        self.root.set(path, value)
    }

    /// Renders the template as YAML text, keeping section and key order.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::UnsupportedNode`] if the tree contains an alias.
    pub fn to_yaml(&self) -> Result<String, NodeError> {
        let value = self.root.to_value()?;
        serde_yaml::to_string(&value).map_err(|err| NodeError::Encoding(err.to_string()))
    }
}

impl TryFrom<Node> for Template {
    type Error = NodeError;

    fn try_from(root: Node) -> Result<Self, Self::Error> {
        match root {
            Node::Mapping(_) => Ok(Self { root }),
            // An empty document parses as null.
            Node::Scalar(ref scalar) if scalar.is_null() => Ok(Self::new()),
            other => Err(NodeError::Encoding(format!(
                "template root must be a mapping, found {}",
                other.kind()
            ))),
        }
    }
}

impl From<Template> for Node {
    fn from(template: Template) -> Self {
        template.root
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = Node::deserialize(deserializer)?;
        Template::try_from(node).map_err(D::Error::custom)
    }
}
