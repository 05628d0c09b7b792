//! Error adapter for converting NimbusError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! A graph error carrying several unresolved references is rendered as one
//! report per reference, so every undeclared name is listed.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use nimbus::{
    NimbusError,
    graph::{GraphError, UnresolvedDependencyError},
};
use nimbus_core::NodeError;

/// Adapter for a template that failed to parse.
///
/// Points a label at the location reported by the YAML parser when it has
/// one.
pub struct ParseAdapter<'a> {
    err: &'a serde_yaml::Error,
    src: &'a str,
}

impl<'a> ParseAdapter<'a> {
    pub fn new(err: &'a serde_yaml::Error, src: &'a str) -> Self {
        Self { err, src }
    }

    fn span(&self) -> Option<SourceSpan> {
        let index = self.err.location()?.index().min(self.src.len());
        let len = usize::from(index < self.src.len());
        Some(SourceSpan::new(index.into(), len))
    }
}

impl fmt::Debug for ParseAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseAdapter")
            .field("err", &self.err)
            .finish()
    }
}

impl fmt::Display for ParseAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse template: {}", self.err)
    }
}

impl std::error::Error for ParseAdapter<'_> {}

impl MietteDiagnostic for ParseAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("nimbus::parse"))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span()?;
        Some(Box::new(std::iter::once(
            LabeledSpan::new_primary_with_span(Some("here".to_string()), span),
        )))
    }
}

/// Adapter for one unresolved reference.
#[derive(Debug)]
pub struct UnresolvedAdapter<'a>(pub &'a UnresolvedDependencyError);

impl fmt::Display for UnresolvedAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for UnresolvedAdapter<'_> {}

impl MietteDiagnostic for UnresolvedAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("nimbus::graph::unresolved"))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!(
            "declare `{}` under Parameters or Resources",
            self.0.name()
        )))
    }
}

/// Adapter for [`NimbusError`] variants without source information.
pub struct ErrorAdapter<'a>(pub &'a NimbusError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            NimbusError::Io(_) => "nimbus::io",
            NimbusError::Parse { .. } => "nimbus::parse",
            NimbusError::Node(NodeError::Encoding(_)) => "nimbus::encoding",
            NimbusError::Node(_) => "nimbus::path",
            NimbusError::Graph(GraphError::Unresolved(_)) => "nimbus::graph::unresolved",
            NimbusError::Graph(GraphError::Cycle(_)) => "nimbus::graph::cycle",
            NimbusError::Config(_) => "nimbus::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            NimbusError::Graph(GraphError::Cycle(_)) => Some(Box::new(
                "remove one of the references between the listed elements",
            )),
            _ => None,
        }
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A parse failure with a source snippet.
    Parse(ParseAdapter<'a>),
    /// A single undeclared name.
    Unresolved(UnresolvedAdapter<'a>),
    /// Any other error.
    Error(ErrorAdapter<'a>),
}

impl Reportable<'_> {
    fn inner(&self) -> &dyn MietteDiagnostic {
        match self {
            Reportable::Parse(p) => p,
            Reportable::Unresolved(u) => u,
            Reportable::Error(e) => e,
        }
    }
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner(), f)
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Error(e) => e.source(),
            Reportable::Parse(_) | Reportable::Unresolved(_) => None,
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.inner().code()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.inner().help()
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.inner().source_code()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.inner().labels()
    }
}

/// Convert a [`NimbusError`] into a list of reportable errors.
///
/// Unresolved references yield one [`Reportable`] each; every other error
/// yields exactly one.
pub fn to_reportables(err: &NimbusError) -> Vec<Reportable<'_>> {
    match err {
        NimbusError::Parse { err, src } => vec![Reportable::Parse(ParseAdapter::new(err, src))],
        NimbusError::Graph(GraphError::Unresolved(unresolved)) => unresolved
            .errors()
            .iter()
            .map(|e| Reportable::Unresolved(UnresolvedAdapter(e)))
            .collect(),
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

#[cfg(test)]
mod tests {
    use nimbus::{
        graph::UnresolvedDependencies,
        template::{Element, Section},
    };
    use nimbus_core::path;

    use super::*;

    fn code_of(reportable: &Reportable<'_>) -> String {
        reportable.code().map(|c| c.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_parse_error_has_label() {
        let src = "Resources:\n  Bucket: [unclosed\n";
        let err = serde_yaml::from_str::<serde_yaml::Value>(src).unwrap_err();
        let err = NimbusError::new_parse_error(err, src);

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        assert_eq!(code_of(&reportables[0]), "nimbus::parse");
        assert!(reportables[0].source_code().is_some());

        let labels: Vec<_> = reportables[0].labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert!(labels[0].primary());
        assert!(labels[0].offset() <= src.len());
    }

    #[test]
    fn test_one_report_per_unresolved_reference() {
        let bucket = Element::new("Bucket", Section::Resources);
        let errors = vec![
            UnresolvedDependencyError::new(bucket.clone(), "Missing"),
            UnresolvedDependencyError::new(bucket, "Other"),
        ];
        let err = NimbusError::Graph(GraphError::Unresolved(UnresolvedDependencies::new(errors)));

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 2);
        assert_eq!(
            reportables[0].to_string(),
            "`Resources/Bucket` references undeclared name `Missing`"
        );
        assert_eq!(code_of(&reportables[1]), "nimbus::graph::unresolved");
        assert!(
            reportables[1]
                .help()
                .unwrap()
                .to_string()
                .contains("`Other`")
        );
    }

    #[test]
    fn test_error_codes() {
        let cases = [
            (
                NimbusError::Node(NodeError::UnknownKey {
                    path: path!["Resources"],
                    key: "Bucket".to_string(),
                }),
                "nimbus::path",
            ),
            (
                NimbusError::Node(NodeError::Encoding("bad".to_string())),
                "nimbus::encoding",
            ),
            (
                NimbusError::Graph(GraphError::Cycle(vec![vec![Element::new(
                    "A",
                    Section::Resources,
                )]])),
                "nimbus::graph::cycle",
            ),
            (NimbusError::Config("bad".to_string()), "nimbus::config"),
            (
                NimbusError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                "nimbus::io",
            ),
        ];

        for (err, expected) in &cases {
            let reportables = to_reportables(err);
            assert_eq!(reportables.len(), 1);
            assert_eq!(code_of(&reportables[0]), *expected, "{err}");
        }
    }

    #[test]
    fn test_path_error_message_keeps_prefix() {
        let err = NimbusError::Node(NodeError::UnknownKey {
            path: path!["Resources"],
            key: "Bucket".to_string(),
        });

        let reportables = to_reportables(&err);
        assert_eq!(
            reportables[0].to_string(),
            "unknown key `Bucket` at `Resources`"
        );
    }
}
