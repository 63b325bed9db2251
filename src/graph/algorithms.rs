//! Graph algorithms shared by the clustering implementations

use crate::graph::{CompressedGraph, Graph, Node};
use std::collections::{BTreeMap, HashMap};

/// Union-Find data structure for connected component analysis
pub struct DisjointSets {
    /// Parent pointers (parent[i] = parent of node i)
    parent: Vec<usize>,

    /// Size of each set (for union by size)
    size: Vec<usize>,
}

impl DisjointSets {
    /// Create a new DisjointSets data structure with every element in its own set
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            size: vec![1; size],
        }
    }

    /// Find the root of the set containing x with path compression
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }

        root
    }

    /// Union the sets containing x and y
    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x == root_y {
            return;
        }

        // Attach smaller tree under root of larger tree
        if self.size[root_x] >= self.size[root_y] {
            self.parent[root_y] = root_x;
            self.size[root_x] += self.size[root_y];
        } else {
            self.parent[root_x] = root_y;
            self.size[root_y] += self.size[root_x];
        }
    }

    /// Group elements by set.
    ///
    /// Groups are ordered by their smallest element; members are ascending.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let mut slot: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for element in 0..self.parent.len() {
            let root = self.find(element);
            let idx = *slot.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[idx].push(element);
        }

        groups
    }
}

/// Connected components over the internal indices of a snapshot
pub fn components<N: Node>(graph: &CompressedGraph<N>) -> Vec<Vec<usize>> {
    let mut sets = DisjointSets::new(graph.node_count);

    for src in 0..graph.node_count {
        for &dst in graph.outgoing_edges(src) {
            sets.union(src, dst as usize);
        }
    }

    sets.groups()
}

/// Connected components of a graph, in vertex iteration order
pub fn connected_components<N: Node>(graph: &Graph<N>) -> Vec<Vec<N>> {
    let compressed = CompressedGraph::from_graph(graph);

    components(&compressed)
        .into_iter()
        .map(|members| members.into_iter().map(|i| compressed.node(i)).collect())
        .collect()
}

/// Ego-network of a vertex: the subgraph induced by its neighbors, the vertex
/// itself excluded.
pub fn ego_network<N: Node>(graph: &Graph<N>, node: N) -> Graph<N> {
    let neighbors: Vec<N> = graph.neighbors(node).filter(|&n| n != node).collect();
    let mut ego = Graph::with_capacity(neighbors.len(), neighbors.len());

    for &neighbor in &neighbors {
        ego.add_node(neighbor);
    }

    for &neighbor in &neighbors {
        for (_, other, &weight) in graph.edges(neighbor) {
            if other != node && other != neighbor && ego.contains_node(other) {
                ego.add_edge(neighbor, other, weight);
            }
        }
    }

    ego
}

/// Weights of the edges incident to a vertex, keyed by neighbor
pub fn neighbor_weights<N: Node>(graph: &Graph<N>, node: N) -> BTreeMap<N, f64> {
    graph
        .edges(node)
        .filter(|&(_, neighbor, _)| neighbor != node)
        .map(|(_, neighbor, &weight)| (neighbor, weight))
        .collect()
}

/// Sum of the weights of the edges incident to a vertex
pub fn weighted_degree<N: Node>(graph: &Graph<N>, node: N) -> f64 {
    neighbor_weights(graph, node).values().sum()
}
