//! Dependency graphs between template elements.
//!
//! [`GraphBuilder`] scans `Resources` and `Outputs` for intrinsic references
//! and produces a [`Graph`] whose edges point from the referencing element to
//! the element it needs. [`Graph::nodes`] returns a deployment order in which
//! every element comes after everything it depends on.
//!
//! # Example
//!
//! ```
//! use nimbus::{config::GraphConfig, graph::GraphBuilder, template::Template};
//!
//! let template = Template::parse(
//!     "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n\
//!      Outputs:\n  Arn:\n    Value: !GetAtt Bucket.Arn\n",
//! )
//! .unwrap();
//!
//! let graph = GraphBuilder::new(&GraphConfig::default()).build(&template).unwrap();
//! let order: Vec<String> = graph.nodes().unwrap().iter().map(|e| e.name().to_string()).collect();
//! assert_eq!(order, vec!["Bucket", "Arn"]);
//! ```

mod error;
mod references;

pub use error::{
    GraphError, UnresolvedCollector, UnresolvedDependencies, UnresolvedDependencyError,
};

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use log::{debug, info, trace};
use petgraph::{
    Direction,
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};

use crate::{
    config::GraphConfig,
    template::{Element, Section, Template},
};

use references::ReferenceScanner;

/// A directed graph of elements.
///
/// An edge `from -> to` means `from` references `to`. Nodes and edges are
/// unique; a self reference is kept as a self-loop.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    graph: DiGraph<Element, ()>,
    node_ids: HashMap<Element, NodeIndex>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an element, returning its index. Registering twice is a no-op.
    pub fn add_element(&mut self, element: Element) -> NodeIndex {
        if let Some(&idx) = self.node_ids.get(&element) {
            return idx;
        }
        let idx = self.graph.add_node(element.clone());
        self.node_ids.insert(element, idx);
        idx
    }

    /// Adds the edge `from -> to`, registering both ends. Adding twice is a no-op.
    pub fn add_dependency(&mut self, from: Element, to: Element) {
        trace!(from:% = from, to:% = to; "Adding dependency");
        let from = self.add_element(from);
        let to = self.add_element(to);
        self.graph.update_edge(from, to, ());
    }

    pub fn contains(&self, element: &Element) -> bool {
        self.node_ids.contains_key(element)
    }

    pub fn contains_edge(&self, from: &Element, to: &Element) -> bool {
        match (self.node_ids.get(from), self.node_ids.get(to)) {
            (Some(&from), Some(&to)) => self.graph.contains_edge(from, to),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns all elements sorted by `(name, section)`.
    pub fn elements(&self) -> Vec<&Element> {
        let mut elements: Vec<&Element> =
            self.graph.node_indices().map(|idx| &self.graph[idx]).collect();
        elements.sort();
        elements
    }

    /// Returns all `(from, to)` edges, sorted.
    pub fn edges(&self) -> Vec<(&Element, &Element)> {
        let mut edges: Vec<(&Element, &Element)> = self
            .graph
            .raw_edges()
            .iter()
            .map(|edge| (&self.graph[edge.source()], &self.graph[edge.target()]))
            .collect();
        edges.sort();
        edges
    }

    /// Returns the elements `element` references, sorted.
    pub fn dependencies(&self, element: &Element) -> Vec<&Element> {
        self.neighbors(element, Direction::Outgoing)
    }

    /// Returns the elements that reference `element`, sorted.
    pub fn dependents(&self, element: &Element) -> Vec<&Element> {
        self.neighbors(element, Direction::Incoming)
    }

    fn neighbors(&self, element: &Element, direction: Direction) -> Vec<&Element> {
        let Some(&idx) = self.node_ids.get(element) else {
            return Vec::new();
        };
        let mut neighbors: Vec<&Element> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| &self.graph[n])
            .collect();
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }

    /// Returns every element with dependencies before dependents.
    ///
    /// Among the elements that are ready at any step, the smallest by
    /// `(name, section)` comes first, so the order is fully determined by the
    /// graph contents.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Cycle`] listing every cyclic strongly connected
    /// component (self-loops included).
    pub fn nodes(&self) -> Result<Vec<&Element>, GraphError> {
        // Number of distinct dependencies not yet emitted, per node.
        let mut pending: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Outgoing).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<(&Element, NodeIndex)>> = pending
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&idx, _)| Reverse((&self.graph[idx], idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((element, idx))) = ready.pop() {
            order.push(element);
            for dependent in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse((&self.graph[dependent], dependent)));
                    }
                }
            }
        }

        if order.len() < self.graph.node_count() {
            return Err(GraphError::Cycle(self.cycles()));
        }
        Ok(order)
    }

    fn cycles(&self) -> Vec<Vec<Element>> {
        let mut cycles: Vec<Vec<Element>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut elements: Vec<Element> =
                    scc.into_iter().map(|idx| self.graph[idx].clone()).collect();
                elements.sort();
                elements
            })
            .collect();
        cycles.sort();
        debug!(cycles = cycles.len(); "Dependency cycles found");
        cycles
    }
}

/// Builds a [`Graph`] from a [`Template`].
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder<'a> {
    config: &'a GraphConfig,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a GraphConfig) -> Self {
        Self { config }
    }

    /// Builds the dependency graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Unresolved`] with every reference that names
    /// neither a declared element nor a pseudo-parameter.
    pub fn build(&self, template: &Template) -> Result<Graph, GraphError> {
        let mut collector = UnresolvedCollector::new();
        let graph = self.build_with(template, &mut collector);
        collector.finish()?;
        Ok(graph)
    }

    /// Builds the graph from the resolvable references and returns the
    /// unresolved ones alongside it.
    pub fn build_partial(&self, template: &Template) -> (Graph, Vec<UnresolvedDependencyError>) {
        let mut collector = UnresolvedCollector::new();
        let graph = self.build_with(template, &mut collector);
        (graph, collector.into_errors())
    }

    fn build_with(&self, template: &Template, collector: &mut UnresolvedCollector) -> Graph {
        info!("Building dependency graph");
        let index = declared_names(template);
        let scanner = ReferenceScanner::new(self.config);
        let mut graph = Graph::new();

        for section in [Section::Resources, Section::Outputs] {
            let Some(entries) = template.section(section) else {
                continue;
            };
            for (name, body) in entries.sorted_iter() {
                let element = Element::new(name, section);
                debug!(element:% = element; "Scanning element");
                graph.add_element(element.clone());

                let mut raw_names = Vec::new();
                scanner.scan(body, &mut raw_names);
                if section == Section::Resources {
                    raw_names.extend(references::depends_on(body));
                }

                for raw in raw_names {
                    match self.resolve(&index, &raw) {
                        Some(target) => graph.add_dependency(element.clone(), target),
                        None => {
                            let name = base_name(&raw);
                            debug!(element:% = element, name; "Unresolved reference");
                            collector.emit(UnresolvedDependencyError::new(element.clone(), name));
                        }
                    }
                }
            }
        }

        debug!(nodes = graph.node_count(), edges = graph.edge_count(); "Graph built");
        graph
    }

    fn resolve(&self, index: &HashMap<&str, Section>, raw: &str) -> Option<Element> {
        let name = base_name(raw);
        if let Some(&section) = index.get(name) {
            return Some(Element::new(name, section));
        }
        if name.starts_with(self.config.pseudo_parameter_prefix()) {
            return Some(Element::new(name, Section::PseudoParameters));
        }
        None
    }
}

/// Maps every declared name to its section. `Resources` wins over
/// `Parameters` when a name is declared in both.
fn declared_names(template: &Template) -> HashMap<&str, Section> {
    let mut index = HashMap::new();
    for section in [Section::Parameters, Section::Resources] {
        if let Some(entries) = template.section(section) {
            for name in entries.keys() {
                index.insert(name, section);
            }
        }
    }
    index
}

/// Cuts an attribute suffix: `Bucket.Arn` -> `Bucket`.
fn base_name(raw: &str) -> &str {
    raw.split('.').next().unwrap_or(raw)
}


#[cfg(test)]
mod proptest_tests {
    use std::result::Result;

    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    /// Resources `R0..Rn`, each referencing an arbitrary subset of the others.
    fn template_strategy() -> impl Strategy<Value = Template> {
        (1usize..8).prop_flat_map(|count| {
            prop::collection::vec(prop::collection::vec(0..count, 0..4), count).prop_map(
                move |refs| {
                    let mut template = Template::new();
                    for (i, targets) in refs.into_iter().enumerate() {
                        let base = nimbus_core::path!["Resources", format!("R{i}")];
                        template
                            .set(&base.child("Type"), "X")
                            .expect("fresh template accepts any resource");
                        for (j, target) in targets.into_iter().enumerate() {
                            let mut reference = nimbus_core::Mapping::new();
                            reference.insert("Ref", format!("R{target}"));
                            template
                                .set(&base.child(format!("P{j}")), reference)
                                .expect("fresh template accepts any property");
                        }
                    }
                    template
                },
            )
        })
    }

    // ===================
    // Property Test Functions
    // ===================

    /// When ordering succeeds, every edge points backwards in the order.
    fn check_order_respects_edges(template: Template) -> Result<(), TestCaseError> {
        let graph = GraphBuilder::new(&GraphConfig::default())
            .build(&template)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        match graph.nodes() {
            Ok(order) => {
                prop_assert_eq!(order.len(), graph.node_count());
                let position: HashMap<&Element, usize> =
                    order.iter().enumerate().map(|(i, e)| (*e, i)).collect();
                for (from, to) in graph.edges() {
                    prop_assert!(position[to] < position[from], "{} before {}", to, from);
                }
            }
            Err(GraphError::Cycle(cycles)) => prop_assert!(!cycles.is_empty()),
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
        Ok(())
    }

    /// Building twice gives the same graph.
    fn check_build_is_deterministic(template: Template) -> Result<(), TestCaseError> {
        let config = GraphConfig::default();
        let builder = GraphBuilder::new(&config);
        let (a, _) = builder.build_partial(&template);
        let (b, _) = builder.build_partial(&template);
        prop_assert_eq!(a.elements(), b.elements());
        prop_assert_eq!(a.edges(), b.edges());
        prop_assert_eq!(a.nodes().ok(), b.nodes().ok());
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn order_respects_edges(template in template_strategy()) {
            check_order_respects_edges(template)?;
        }

        #[test]
        fn build_is_deterministic(template in template_strategy()) {
            check_build_is_deterministic(template)?;
        }
    }
}
