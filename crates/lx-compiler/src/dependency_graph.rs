use crate::*;

/// Edges from every named declaration to the declarations it references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: &str) {
        self.edges.entry(node.to_string()).or_default();
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.add_node(to);
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    pub fn dependencies_of(&self, node: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(node)
            .into_iter()
            .flat_map(|dependencies| dependencies.iter().map(String::as_str))
    }

    /// Nodes that appear in their own dependency lineage.
    pub fn circular_nodes(&self) -> BTreeSet<String> {
        self.nodes()
            .filter(|node| self.exists_in_lineage(node))
            .map(ToString::to_string)
            .collect()
    }

    fn exists_in_lineage(&self, root: &str) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = self.dependencies_of(root).collect::<Vec<_>>();

        while let Some(node) = stack.pop() {
            if node == root {
                return true;
            }
            if visited.insert(node) {
                stack.extend(self.dependencies_of(node));
            }
        }

        false
    }

    pub fn node_and_dependencies(&self, node: &str) -> BTreeSet<String> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![node.to_string()];

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            stack.extend(self.dependencies_of(&current).map(ToString::to_string));
        }

        visited
    }
}

#[cfg(test)]
mod dependency_graph_tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    #[test]
    fn mutual_and_self_recursion_are_circular() {
        let graph = graph(&[("A", "B"), ("B", "A"), ("C", "C"), ("D", "A")]);
        let circular = graph.circular_nodes();
        assert!(circular.contains("A"));
        assert!(circular.contains("B"));
        assert!(circular.contains("C"));
        assert!(!circular.contains("D"));
    }

    #[test]
    fn node_and_dependencies_returns_transitive_closure() {
        let graph = graph(&[("Scenario", "Tax"), ("Tax", "Rates"), ("Other", "Rates")]);
        let closure = graph.node_and_dependencies("Scenario");
        assert_eq!(
            closure.into_iter().collect::<Vec<_>>(),
            vec!["Rates".to_string(), "Scenario".to_string(), "Tax".to_string()]
        );
        assert_eq!(graph.node_and_dependencies("Unknown").len(), 1);
    }
}
