//! Errors raised while building or ordering a dependency graph.
//!
//! Unresolved references are not fatal one by one: the builder keeps going
//! and an [`UnresolvedCollector`] gathers every failure so they can be
//! reported together.

use std::fmt;

use thiserror::Error;

use crate::template::Element;

/// A reference to a name that is neither declared nor a pseudo-parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{element}` references undeclared name `{name}`")]
pub struct UnresolvedDependencyError {
    element: Element,
    name: String,
}

impl UnresolvedDependencyError {
    pub fn new(element: Element, name: impl Into<String>) -> Self {
        Self {
            element,
            name: name.into(),
        }
    }

    /// The element whose body holds the reference.
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// The unresolved name, already cut at the first `.`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Every unresolved reference found in one template, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} unresolved reference(s)", .errors.len())]
pub struct UnresolvedDependencies {
    errors: Vec<UnresolvedDependencyError>,
}

impl UnresolvedDependencies {
    pub fn new(errors: Vec<UnresolvedDependencyError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[UnresolvedDependencyError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<'a> IntoIterator for &'a UnresolvedDependencies {
    type Item = &'a UnresolvedDependencyError;
    type IntoIter = std::slice::Iter<'a, UnresolvedDependencyError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Errors returned by graph construction and ordering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error(transparent)]
    Unresolved(#[from] UnresolvedDependencies),

    /// Each inner list is one strongly connected component, sorted.
    #[error("dependency cycle: {}", DisplayCycles(.0))]
    Cycle(Vec<Vec<Element>>),
}

struct DisplayCycles<'a>(&'a [Vec<Element>]);

impl fmt::Display for DisplayCycles<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cycle) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            for (j, element) in cycle.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{element}")?;
            }
        }
        Ok(())
    }
}

/// A collector for unresolved references found during a build.
#[derive(Debug, Default)]
pub struct UnresolvedCollector {
    errors: Vec<UnresolvedDependencyError>,
}

impl UnresolvedCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an unresolved reference. Repeats of the same pair are dropped.
    pub fn emit(&mut self, error: UnresolvedDependencyError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    /// Returns the collected errors without failing.
    pub fn into_errors(self) -> Vec<UnresolvedDependencyError> {
        self.errors
    }

    /// Finish collection and return a result.
    ///
    /// - If anything was collected, returns `Err` with all of it.
    /// - Otherwise returns `Ok(())`.
    pub fn finish(self) -> Result<(), UnresolvedDependencies> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(UnresolvedDependencies::new(self.errors))
        }
    }
}
