//! Dependency graph construction.
//!
//! Builds the graph of concrete component types at composition time:
//! - Rejects components without exactly one constructor
//! - Resolves every constructor parameter through the registry
//! - Rejects any edge that would close a cycle, as it is inserted
//!
//! The graph is acyclic by construction, so a topological order always
//! exists and covers every vertex.
//!
//! # Algorithm
//! Vertices live in an arena (`Vec`) and edges are adjacency indices.
//! Before inserting `from → to`, a depth-first search checks whether
//! `from` is already reachable from `to`; if it is, the found path plus
//! the new edge is the cycle.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tarkib_support::rendering::render_dot;
use tracing::{debug, instrument, trace, warn};

use crate::descriptor::ComponentDescriptor;
use crate::error::{CyclicDependencyError, Result, TarkibError};
use crate::key::TypeKey;
use crate::registry::CapabilityRegistry;

/// Directed acyclic graph of component types.
///
/// Edges point from a dependency to its dependent, so a topological
/// order is a valid construction order.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    vertices: Vec<TypeKey>,
    index: HashMap<TypeKey, usize>,
    /// `dependents[v]` = vertices with an edge `v → _`, in insertion order
    dependents: Vec<Vec<usize>>,
    edge_count: usize,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph for `descriptors`.
    ///
    /// Every descriptor is checked for exactly one constructor before any
    /// vertex is added.
    ///
    /// # Errors
    /// - [`TarkibError::AmbiguousConstructor`] / [`TarkibError::MissingConstructor`]
    /// - [`TarkibError::UnresolvedDependency`] / [`TarkibError::AmbiguousImplementation`]
    /// - [`TarkibError::CyclicDependency`]
    #[instrument(skip_all, name = "graph_build")]
    pub fn build(descriptors: &[ComponentDescriptor], registry: &CapabilityRegistry) -> Result<Self> {
        for descriptor in descriptors {
            descriptor.constructor()?;
        }

        let mut graph = Self::new();
        for descriptor in descriptors {
            let component = descriptor.key();
            let dependent = graph.add_vertex(component);

            for dependency in descriptor.constructor()?.params() {
                for implementation in registry.resolve_dependency(dependency, component)? {
                    let provider = graph.add_vertex(implementation.component());
                    graph.add_edge(provider, dependent)?;
                }
            }
        }

        debug!(
            vertices = graph.len(),
            edges = graph.edge_count,
            "Dependency graph built"
        );
        Ok(graph)
    }

    /// Adds a vertex for `key` if absent and returns its index.
    pub fn add_vertex(&mut self, key: TypeKey) -> usize {
        if let Some(&index) = self.index.get(&key) {
            return index;
        }

        let index = self.vertices.len();
        self.vertices.push(key);
        self.dependents.push(Vec::new());
        self.index.insert(key, index);
        index
    }

    /// Adds the edge `from → to` (dependency → dependent).
    ///
    /// Returns `false` if the edge already existed.
    ///
    /// # Errors
    /// [`TarkibError::CyclicDependency`] if `from` is reachable from `to`.
    /// The graph is left unchanged.
    ///
    /// # Panics
    /// If either index was not returned by [`add_vertex`](Self::add_vertex).
    pub fn add_edge(&mut self, from: usize, to: usize) -> Result<bool> {
        if self.dependents[from].contains(&to) {
            return Ok(false);
        }

        if let Some(path) = self.path(to, from) {
            let mut chain = Vec::with_capacity(path.len() + 1);
            chain.push(self.vertices[from]);
            chain.extend(path.into_iter().map(|v| self.vertices[v]));

            warn!(cycle = ?chain, "Cyclic dependency detected!");
            return Err(TarkibError::CyclicDependency(CyclicDependencyError { chain }));
        }

        trace!(
            dependency = %self.vertices[from],
            dependent = %self.vertices[to],
            "Added edge"
        );
        self.dependents[from].push(to);
        self.edge_count += 1;
        Ok(true)
    }

    /// Finds a path `start ⇝ goal` following edges, both ends included.
    fn path(&self, start: usize, goal: usize) -> Option<Vec<usize>> {
        if start == goal {
            return Some(vec![start]);
        }

        let mut parent: Vec<Option<usize>> = vec![None; self.vertices.len()];
        let mut visited = vec![false; self.vertices.len()];
        let mut stack = vec![start];
        visited[start] = true;

        while let Some(vertex) = stack.pop() {
            for &next in &self.dependents[vertex] {
                if visited[next] {
                    continue;
                }
                visited[next] = true;
                parent[next] = Some(vertex);

                if next == goal {
                    let mut path = vec![goal];
                    let mut cursor = goal;
                    while let Some(previous) = parent[cursor] {
                        path.push(previous);
                        cursor = previous;
                    }
                    path.reverse();
                    return Some(path);
                }
                stack.push(next);
            }
        }

        None
    }

    /// Returns a topological order: every dependency precedes its dependents.
    ///
    /// Kahn's algorithm seeded in vertex insertion order, so the result
    /// is stable for a given descriptor order. No other ordering among
    /// independent branches is promised.
    pub fn topological_order(&self) -> Vec<TypeKey> {
        let mut in_degree = vec![0usize; self.vertices.len()];
        for targets in &self.dependents {
            for &to in targets {
                in_degree[to] += 1;
            }
        }

        let mut ready: VecDeque<usize> = (0..self.vertices.len())
            .filter(|&v| in_degree[v] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.vertices.len());

        while let Some(vertex) = ready.pop_front() {
            order.push(self.vertices[vertex]);
            for &next in &self.dependents[vertex] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        order
    }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> &[TypeKey] {
        &self.vertices
    }

    /// Edges as `(dependency, dependent)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (TypeKey, TypeKey)> + '_ {
        self.dependents.iter().enumerate().flat_map(move |(from, targets)| {
            targets
                .iter()
                .map(move |&to| (self.vertices[from], self.vertices[to]))
        })
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.index.contains_key(key)
    }

    /// Components that depend directly on `key`.
    pub fn dependents_of(&self, key: &TypeKey) -> Vec<TypeKey> {
        self.index
            .get(key)
            .map(|&v| self.dependents[v].iter().map(|&to| self.vertices[to]).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Renders the graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let names: Vec<&str> = self.vertices.iter().map(|k| k.type_name()).collect();
        let edges: Vec<(usize, usize)> = self
            .dependents
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| targets.iter().map(move |&to| (from, to)))
            .collect();
        render_dot(&names, &edges)
    }

    /// A serializable copy of the graph, keyed by type name.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            vertices: self.vertices.iter().map(|k| k.type_name().to_string()).collect(),
            edges: self
                .edges()
                .map(|(from, to)| GraphEdge {
                    dependency: from.type_name().to_string(),
                    dependent: to.type_name().to_string(),
                })
                .collect(),
        }
    }
}

/// Serializable view of a [`DependencyGraph`] for external renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSnapshot {
    pub vertices: Vec<String>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub dependency: String,
    pub dependent: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Dependency;
    use crate::registry::ResolutionPolicy;

    // === Types for tests ===
    trait Ia: Send + Sync {}
    trait Ib: Send + Sync {}
    trait Ic: Send + Sync {}
    trait Id: Send + Sync {}

    struct A;
    impl Ia for A {}
    struct B;
    impl Ib for B {}
    struct C;
    impl Ic for C {}
    struct D;
    impl Id for D {}

    fn build(descriptors: &[ComponentDescriptor]) -> Result<DependencyGraph> {
        let registry = CapabilityRegistry::build(descriptors, ResolutionPolicy::default())?;
        DependencyGraph::build(descriptors, &registry)
    }

    fn position(order: &[TypeKey], key: TypeKey) -> usize {
        order.iter().position(|k| *k == key).unwrap()
    }

    fn a(deps: Vec<Dependency>) -> ComponentDescriptor {
        ComponentDescriptor::builder::<A>()
            .provides::<dyn Ia>(|it| it)
            .constructor(deps, |_| Ok(A))
            .build()
    }

    fn b(deps: Vec<Dependency>) -> ComponentDescriptor {
        ComponentDescriptor::builder::<B>()
            .provides::<dyn Ib>(|it| it)
            .constructor(deps, |_| Ok(B))
            .build()
    }

    fn c(deps: Vec<Dependency>) -> ComponentDescriptor {
        ComponentDescriptor::builder::<C>()
            .provides::<dyn Ic>(|it| it)
            .constructor(deps, |_| Ok(C))
            .build()
    }

    fn d(deps: Vec<Dependency>) -> ComponentDescriptor {
        ComponentDescriptor::builder::<D>()
            .provides::<dyn Id>(|it| it)
            .constructor(deps, |_| Ok(D))
            .build()
    }

    #[test]
    fn simple_chain_orders_dependency_first() {
        let graph = build(&[b(vec![Dependency::one::<dyn Ia>()]), a(vec![])]).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(
            graph.topological_order(),
            vec![TypeKey::of::<A>(), TypeKey::of::<B>()]
        );
        assert_eq!(graph.dependents_of(&TypeKey::of::<A>()), vec![TypeKey::of::<B>()]);
    }

    #[test]
    fn mutual_dependency_is_a_cycle() {
        let result = build(&[
            a(vec![Dependency::one::<dyn Ib>()]),
            b(vec![Dependency::one::<dyn Ia>()]),
        ]);

        match result {
            Err(TarkibError::CyclicDependency(err)) => {
                assert_eq!(
                    err.chain,
                    vec![TypeKey::of::<A>(), TypeKey::of::<B>(), TypeKey::of::<A>()]
                );
            }
            other => panic!("Expected CyclicDependency, got: {other:?}"),
        }
    }

    #[test]
    fn long_cycle_names_every_participant() {
        // A → B → C → A
        let result = build(&[
            a(vec![Dependency::one::<dyn Ic>()]),
            b(vec![Dependency::one::<dyn Ia>()]),
            c(vec![Dependency::one::<dyn Ib>()]),
        ]);

        match result {
            Err(TarkibError::CyclicDependency(err)) => {
                assert_eq!(err.chain.len(), 4);
                assert_eq!(err.chain.first(), err.chain.last());
                for key in [TypeKey::of::<A>(), TypeKey::of::<B>(), TypeKey::of::<C>()] {
                    assert!(err.chain.contains(&key));
                }
            }
            other => panic!("Expected CyclicDependency, got: {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let result = build(&[a(vec![Dependency::one::<dyn Ia>()])]);
        match result {
            Err(TarkibError::CyclicDependency(err)) => {
                assert_eq!(err.chain, vec![TypeKey::of::<A>(), TypeKey::of::<A>()]);
            }
            other => panic!("Expected CyclicDependency, got: {other:?}"),
        }
    }

    #[test]
    fn missing_implementation_is_unresolved() {
        let result = build(&[c(vec![Dependency::one::<dyn Id>()])]);
        match result {
            Err(TarkibError::UnresolvedDependency(err)) => {
                assert_eq!(err.requested, TypeKey::of::<dyn Id>());
                assert_eq!(err.required_by, Some(TypeKey::of::<C>()));
            }
            other => panic!("Expected UnresolvedDependency, got: {other:?}"),
        }
    }

    #[test]
    fn two_constructors_rejected_before_resolution() {
        // B's parameter is unresolvable too, but the constructor check runs first.
        let ambiguous = ComponentDescriptor::builder::<A>()
            .constructor([], |_| Ok(A))
            .constructor([], |_| Ok(A))
            .build();
        let result = build(&[b(vec![Dependency::one::<dyn Id>()]), ambiguous]);

        assert!(matches!(result, Err(TarkibError::AmbiguousConstructor(_))));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        //     D
        //    / \
        //   B   C
        //    \ /
        //     A
        let graph = build(&[
            a(vec![Dependency::one::<dyn Ib>(), Dependency::one::<dyn Ic>()]),
            b(vec![Dependency::one::<dyn Id>()]),
            c(vec![Dependency::one::<dyn Id>()]),
            d(vec![]),
        ])
        .unwrap();

        let order = graph.topological_order();
        assert_eq!(order.len(), 4);
        for (dependency, dependent) in graph.edges() {
            assert!(position(&order, dependency) < position(&order, dependent));
        }
        assert_eq!(order[0], TypeKey::of::<D>());
        assert_eq!(order[3], TypeKey::of::<A>());
    }

    #[test]
    fn repeated_parameter_adds_one_edge() {
        let graph = build(&[
            b(vec![Dependency::one::<dyn Ia>(), Dependency::one::<dyn Ia>()]),
            a(vec![]),
        ])
        .unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.topological_order().len(), 2);
    }

    #[test]
    fn rejected_edge_leaves_graph_unchanged() {
        let mut graph = DependencyGraph::new();
        let x = graph.add_vertex(TypeKey::of::<A>());
        let y = graph.add_vertex(TypeKey::of::<B>());
        assert!(graph.add_edge(x, y).unwrap());
        assert!(!graph.add_edge(x, y).unwrap());
        assert!(graph.add_edge(y, x).is_err());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.add_vertex(TypeKey::of::<A>()), x);
    }

    #[test]
    fn dot_export_lists_edges() {
        let graph = build(&[b(vec![Dependency::one::<dyn Ia>()]), a(vec![])]).unwrap();
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph G {"));
        assert!(dot.contains("graph__tests__A -> tarkib_container__graph__tests__B;"));
    }

    #[test]
    fn snapshot_serializes() {
        let graph = build(&[b(vec![Dependency::one::<dyn Ia>()]), a(vec![])]).unwrap();
        let json = serde_json::to_value(graph.snapshot()).unwrap();

        assert_eq!(json["vertices"].as_array().unwrap().len(), 2);
        assert_eq!(
            json["edges"][0]["dependency"],
            "tarkib_container::graph::tests::A"
        );
        assert_eq!(json["edges"][0]["dependent"], "tarkib_container::graph::tests::B");
    }
}
