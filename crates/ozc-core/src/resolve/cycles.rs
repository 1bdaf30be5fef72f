//! Strongly connected components of the named-type reference graph.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

/// For each node, the id of the component it belongs to, plus which nodes
/// sit on a cycle (a component of two or more, or a self-edge).
#[derive(Debug, Default)]
pub struct Components {
    pub component_of: HashMap<String, usize>,
    pub cyclic: IndexSet<String>,
}

impl Components {
    /// Whether the edge `from → to` closes a cycle.
    pub fn is_cycle_edge(&self, from: &str, to: &str) -> bool {
        match (self.component_of.get(from), self.component_of.get(to)) {
            (Some(a), Some(b)) => a == b && self.cyclic.contains(from),
            _ => false,
        }
    }
}

/// Tarjan's algorithm. `graph` maps each node to its successors; edges to
/// nodes outside the graph are ignored.
pub fn strongly_connected(graph: &IndexMap<String, IndexSet<String>>) -> Components {
    let mut state = Tarjan {
        graph,
        index: 0,
        indices: HashMap::new(),
        lowlink: HashMap::new(),
        stack: Vec::new(),
        on_stack: IndexSet::new(),
        out: Components::default(),
        next_component: 0,
    };
    for node in graph.keys() {
        if !state.indices.contains_key(node.as_str()) {
            state.visit(node);
        }
    }
    state.out
}

struct Tarjan<'g> {
    graph: &'g IndexMap<String, IndexSet<String>>,
    index: usize,
    indices: HashMap<&'g str, usize>,
    lowlink: HashMap<&'g str, usize>,
    stack: Vec<&'g str>,
    on_stack: IndexSet<&'g str>,
    out: Components,
    next_component: usize,
}

impl<'g> Tarjan<'g> {
    fn visit(&mut self, node: &'g str) {
        self.indices.insert(node, self.index);
        self.lowlink.insert(node, self.index);
        self.index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        let graph = self.graph;
        if let Some(successors) = graph.get(node) {
            for next in successors {
                let next = next.as_str();
                if !graph.contains_key(next) {
                    continue;
                }
                if !self.indices.contains_key(next) {
                    self.visit(next);
                    let low = self.lowlink[node].min(self.lowlink[next]);
                    self.lowlink.insert(node, low);
                } else if self.on_stack.contains(next) {
                    let low = self.lowlink[node].min(self.indices[next]);
                    self.lowlink.insert(node, low);
                }
            }
        }

        if self.lowlink[node] != self.indices[node] {
            return;
        }
        let id = self.next_component;
        self.next_component += 1;
        let mut members = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack.swap_remove(member);
            members.push(member);
            if member == node {
                break;
            }
        }
        let self_edge = graph.get(node).is_some_and(|s| s.contains(node));
        let is_cycle = members.len() > 1 || self_edge;
        for member in members {
            self.out.component_of.insert(member.to_string(), id);
            if is_cycle {
                self.out.cyclic.insert(member.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> IndexMap<String, IndexSet<String>> {
        edges
            .iter()
            .map(|(from, to)| {
                (
                    from.to_string(),
                    to.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_mutual_recursion() {
        let g = graph(&[("A", &["B"]), ("B", &["A"]), ("C", &["A"])]);
        let c = strongly_connected(&g);
        assert!(c.is_cycle_edge("A", "B"));
        assert!(c.is_cycle_edge("B", "A"));
        assert!(!c.is_cycle_edge("C", "A"));
        assert!(!c.cyclic.contains("C"));
    }

    #[test]
    fn test_self_reference() {
        let g = graph(&[("Node", &["Node", "Leaf"]), ("Leaf", &[])]);
        let c = strongly_connected(&g);
        assert!(c.is_cycle_edge("Node", "Node"));
        assert!(!c.is_cycle_edge("Node", "Leaf"));
        assert!(!c.cyclic.contains("Leaf"));
    }

    #[test]
    fn test_acyclic_chain() {
        let g = graph(&[("A", &["B"]), ("B", &["C"]), ("C", &[]), ("D", &["Missing"])]);
        let c = strongly_connected(&g);
        assert!(c.cyclic.is_empty());
        assert_eq!(c.component_of.len(), 4);
    }
}
