//! Nimbus - dependency graphs and structural diffs for infrastructure templates.
//!
//! Templates are parsed into an order-preserving document tree, edited by
//! path, analysed for references between their elements, and compared
//! structurally.

pub mod config;
pub mod diff;
pub mod graph;
pub mod template;

mod error;

pub use nimbus_core::{node, path};

pub use error::NimbusError;

use std::{fs, path::Path as FsPath};

use log::{debug, info, trace};

use config::AppConfig;
use diff::Diff;
use graph::{Graph, GraphBuilder};
use template::Template;

/// Entry point for loading, analysing and comparing templates.
///
/// # Examples
///
/// ```rust
/// use nimbus::{TemplateProcessor, config::AppConfig};
///
/// let processor = TemplateProcessor::new(AppConfig::default());
///
/// let template = processor
///     .parse("Parameters:\n  Name: {Type: String}\nResources:\n  Bucket:\n    Properties:\n      BucketName: !Ref Name\n")
///     .expect("Failed to parse");
///
/// let graph = processor.graph(&template).expect("Failed to build graph");
/// assert_eq!(graph.node_count(), 2);
///
/// let diff = processor.diff(&template, &template);
/// assert!(diff.is_unchanged());
/// ```
#[derive(Debug, Default)]
pub struct TemplateProcessor {
    config: AppConfig,
}

impl TemplateProcessor {
    /// Create a new processor with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse YAML or JSON text into a template.
    ///
    /// # Errors
    ///
    /// Returns `NimbusError::Parse` for malformed text and `NimbusError::Node`
    /// when the document is not a mapping.
    pub fn parse(&self, source: &str) -> Result<Template, NimbusError> {
        info!("Parsing template");
        let template = Template::parse(source)?;
        debug!("Template parsed successfully");
        Ok(template)
    }

    /// Read and parse a template file.
    ///
    /// # Errors
    ///
    /// Returns `NimbusError::Io` if the file cannot be read, otherwise the
    /// same errors as [`TemplateProcessor::parse`].
    pub fn load(&self, path: impl AsRef<FsPath>) -> Result<Template, NimbusError> {
        let path = path.as_ref();
        info!(path:? = path; "Loading template");
        let source = fs::read_to_string(path)?;
        self.parse(&source)
    }

    /// Build the dependency graph of a template.
    ///
    /// # Errors
    ///
    /// Returns `NimbusError::Graph` carrying every unresolved reference.
    pub fn graph(&self, template: &Template) -> Result<Graph, NimbusError> {
        let graph = GraphBuilder::new(self.config.graph()).build(template)?;
        trace!(graph:?; "Built graph");
        Ok(graph)
    }

    /// Build the dependency graph and return its deployment order.
    ///
    /// # Errors
    ///
    /// Returns `NimbusError::Graph` for unresolved references or cycles.
    pub fn deployment_order(&self, template: &Template) -> Result<Vec<template::Element>, NimbusError> {
        let graph = self.graph(template)?;
        let order = graph.nodes()?.into_iter().cloned().collect();
        Ok(order)
    }

    /// Compare two templates.
    ///
    /// The result holds every entry; use
    /// [`Diff::entries_for`] with [`AppConfig::diff`] to apply the
    /// configured mode.
    pub fn diff<'a>(&self, from: &'a Template, to: &'a Template) -> Diff<'a> {
        info!(mode:? = self.config.diff().mode(); "Comparing templates");
        diff::diff(from.root(), to.root())
    }
}
