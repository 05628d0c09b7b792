//! Path addressing for document trees.
//!
//! A [`Path`] is an ordered list of [`PathSegment`]s. A segment is either a
//! mapping key or a sequence index, so any location in a tree can be read or
//! written without knowing the template schema.
//!
//! # Example
//!
//! ```
//! use nimbus_core::{path, path::{Path, PathSegment}};
//!
//! let p = path!["Resources", "Bucket", "Properties", 0];
//! assert_eq!(p.to_string(), "Resources/Bucket/Properties/0");
//!
//! let parsed: Path = "Resources/Bucket/Properties/0".parse().unwrap();
//! assert_eq!(parsed, p);
//! assert_eq!(parsed.last(), Some(&PathSegment::Index(0)));
//! ```

use std::{convert::Infallible, fmt, str::FromStr};

/// A single step in a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// A mapping key.
    Key(String),
    /// A 0-based sequence index.
    Index(usize),
}

impl PathSegment {
    /// Returns the key if this segment addresses a mapping.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathSegment::Key(key) => Some(key),
            PathSegment::Index(_) => None,
        }
    }

    /// Returns the index if this segment addresses a sequence.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Key(_) => None,
            PathSegment::Index(index) => Some(*index),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{key}"),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<&String> for PathSegment {
    fn from(key: &String) -> Self {
        PathSegment::Key(key.clone())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// An ordered sequence of segments addressing a location in a tree.
///
/// The empty path addresses the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// Creates the empty (root) path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a path from any sequence of segment-like values.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Returns the segments of this path.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the final segment, if any.
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Returns a new path with `segment` appended (builder style).
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Appends a segment in place.
    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into());
    }

    /// Returns a new path made of `self` followed by `other`.
    pub fn join(&self, other: &Path) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// Returns the path made of the first `len` segments.
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Returns `true` if `self` is `other` or one of its ancestors.
    pub fn starts_with(&self, other: &Path) -> bool {
        self.0.starts_with(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathSegment> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Parses the `/`-separated textual form.
///
/// Segments made only of ASCII digits become [`PathSegment::Index`]; every
/// other segment is a key. The empty string is the root path.
impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments = s
            .split('/')
            .map(|part| {
                if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                    part.parse::<usize>()
                        .map(PathSegment::Index)
                        .unwrap_or_else(|_| PathSegment::Key(part.to_string()))
                } else {
                    PathSegment::Key(part.to_string())
                }
            })
            .collect();

        Ok(Self(segments))
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<T: IntoIterator<Item = PathSegment>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathSegment;
    type IntoIter = std::slice::Iter<'a, PathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Builds a [`Path`] from a list of keys and indices.
///
/// ```
/// use nimbus_core::path;
///
/// let p = path!["Outputs", "BucketArn", "Value", "Fn::GetAtt", 1];
/// assert_eq!(p.len(), 5);
/// assert!(path![].is_root());
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::path::Path::root()
    };
    ($($segment:expr),+ $(,)?) => {
        $crate::path::Path::from(vec![$($crate::path::PathSegment::from($segment)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_segments() {
        let p = Path::new::<_, PathSegment>(vec!["Foo".into(), 1usize.into(), "Bar".into()]);
        assert_eq!(p.to_string(), "Foo/1/Bar");
        assert_eq!(Path::root().to_string(), "");
    }

    #[test]
    fn test_parse_numeric_segments_as_indices() {
        let p: Path = "Foo/12/Bar".parse().unwrap();
        assert_eq!(
            p.segments(),
            &[
                PathSegment::Key("Foo".to_string()),
                PathSegment::Index(12),
                PathSegment::Key("Bar".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_empty_is_root() {
        let p: Path = "".parse().unwrap();
        assert!(p.is_root());
    }

    #[test]
    fn test_parse_keeps_intrinsic_names() {
        let p: Path = "Value/Fn::GetAtt/0".parse().unwrap();
        assert_eq!(p.segments()[1], PathSegment::Key("Fn::GetAtt".to_string()));
        assert_eq!(p.segments()[2], PathSegment::Index(0));
    }

    #[test]
    fn test_macro_mixes_keys_and_indices() {
        let p = path!["Foo", 0, "Baz"];
        assert_eq!(p.segments()[1].as_index(), Some(0));
        assert_eq!(p.segments()[2].as_key(), Some("Baz"));
    }

    #[test]
    fn test_child_and_prefix() {
        let p = path!["A"].child(3usize).child("B");
        assert_eq!(p.to_string(), "A/3/B");
        assert_eq!(p.prefix(2).to_string(), "A/3");
        assert!(p.starts_with(&path!["A", 3]));
        assert!(!p.starts_with(&path!["B"]));
    }

    #[test]
    fn test_join() {
        let p = path!["A"].join(&path![0, "B"]);
        assert_eq!(p, path!["A", 0, "B"]);
    }
}
