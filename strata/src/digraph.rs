//! Adjacency-map directed graph with cycle detection.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct Digraph<V> {
    edges: HashMap<V, HashSet<V>>,
}

impl<V> Default for Digraph<V> {
    fn default() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }
}

impl<V: Copy + Eq + Hash> Digraph<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, v: V) {
        self.edges.entry(v).or_default();
    }

    /// Returns false if the edge was already present.
    pub fn add_edge(&mut self, from: V, to: V) -> bool {
        self.add_vertex(to);
        self.edges.entry(from).or_default().insert(to)
    }

    pub fn remove_edge(&mut self, from: V, to: V) -> bool {
        self.edges
            .get_mut(&from)
            .map(|targets| targets.remove(&to))
            .unwrap_or(false)
    }

    /// Drops every edge leaving `v`, keeping the vertex itself.
    pub fn remove_outgoing(&mut self, v: V) {
        if let Some(targets) = self.edges.get_mut(&v) {
            targets.clear();
        }
    }

    /// Drops `v` and every edge touching it.
    pub fn remove_vertex(&mut self, v: V) {
        self.edges.remove(&v);
        for targets in self.edges.values_mut() {
            targets.remove(&v);
        }
    }

    pub fn has_edge(&self, from: V, to: V) -> bool {
        self.edges
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
    }

    pub fn successors(&self, v: V) -> impl Iterator<Item = V> + '_ {
        self.edges.get(&v).into_iter().flatten().copied()
    }

    pub fn vertex_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(HashSet::len).sum()
    }

    pub fn edges(&self) -> impl Iterator<Item = (V, V)> + '_ {
        self.edges
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (*from, *to)))
    }

    /// The same graph with every edge flipped.
    pub fn reverse(&self) -> Self {
        let mut reversed = Self::new();
        for v in self.edges.keys() {
            reversed.add_vertex(*v);
        }
        for (from, to) in self.edges() {
            reversed.add_edge(to, from);
        }
        reversed
    }

    pub fn has_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut recursion_stack = HashSet::new();
        self.edges
            .keys()
            .any(|v| self.has_cycle_util(*v, &mut visited, &mut recursion_stack))
    }

    /// True if a cycle is reachable from `start`.
    pub fn has_cycle_from(&self, start: V) -> bool {
        let mut visited = HashSet::new();
        let mut recursion_stack = HashSet::new();
        self.has_cycle_util(start, &mut visited, &mut recursion_stack)
    }

    fn has_cycle_util(
        &self,
        v: V,
        visited: &mut HashSet<V>,
        recursion_stack: &mut HashSet<V>,
    ) -> bool {
        if recursion_stack.contains(&v) {
            return true;
        }
        if !visited.insert(v) {
            return false;
        }

        recursion_stack.insert(v);
        for next in self.successors(v) {
            if self.has_cycle_util(next, visited, recursion_stack) {
                return true;
            }
        }
        recursion_stack.remove(&v);
        false
    }
}
