use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

/// The role a node plays in the symbolic graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Emotion,
    Virtue,
}

/// The base emotions, in canonical order.
pub const EMOTIONS: [&str; 6] = [
    "anger",
    "fear",
    "disgust",
    "sadness",
    "surprise",
    "happiness",
];

/// The base virtues, in canonical order.
pub const VIRTUES: [&str; 6] = [
    "patience",
    "courage",
    "empathy",
    "resilience",
    "focus",
    "compassion",
];

/// Emotion → virtue pairs. These also seed the virtue reference table.
pub const EMOTION_VIRTUE_EDGES: [(&str, &str); 6] = [
    ("anger", "patience"),
    ("fear", "courage"),
    ("disgust", "empathy"),
    ("sadness", "resilience"),
    ("surprise", "focus"),
    ("happiness", "compassion"),
];

/// Virtue ↔ virtue links forming the inner cube.
pub const VIRTUE_EDGES: [(&str, &str); 3] = [
    ("patience", "resilience"),
    ("courage", "focus"),
    ("empathy", "compassion"),
];

/// A small undirected graph of emotions and virtues.
///
/// Built once from the constants above; it is a lookup structure, not a
/// store. Node names are lower-case.
#[derive(Debug, Clone)]
pub struct SymbolicGraph {
    kinds: HashMap<String, NodeKind>,
    /// Adjacency lists in insertion order so traversal output is stable.
    adjacency: HashMap<String, Vec<String>>,
}

impl Default for SymbolicGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolicGraph {
    /// Build the base graph: six emotions, six virtues, nine edges.
    pub fn new() -> Self {
        let mut g = Self {
            kinds: HashMap::new(),
            adjacency: HashMap::new(),
        };
        for e in EMOTIONS {
            g.add_node(e, NodeKind::Emotion);
        }
        for v in VIRTUES {
            g.add_node(v, NodeKind::Virtue);
        }
        for (a, b) in EMOTION_VIRTUE_EDGES.iter().chain(VIRTUE_EDGES.iter()) {
            g.add_edge(a, b);
        }
        g
    }

    fn add_node(&mut self, name: &str, kind: NodeKind) {
        self.kinds.insert(name.to_string(), kind);
        self.adjacency.entry(name.to_string()).or_default();
    }

    fn add_edge(&mut self, a: &str, b: &str) {
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .push(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .push(a.to_string());
    }

    /// The kind of `node`, or `None` if it is not in the graph.
    pub fn kind(&self, node: &str) -> Option<NodeKind> {
        self.kinds.get(node).copied()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.kinds.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum::<usize>() / 2
    }

    /// Direct neighbours of `node`. Empty for unknown nodes.
    pub fn neighbours(&self, node: &str) -> &[String] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Virtues directly connected to `emotion`.
    pub fn virtues_for(&self, emotion: &str) -> Vec<&str> {
        self.neighbours(emotion)
            .iter()
            .filter(|n| self.kind(n) == Some(NodeKind::Virtue))
            .map(String::as_str)
            .collect()
    }

    /// Shortest path from `from` to `to`, inclusive of both ends.
    ///
    /// Returns an empty vector when either node is unknown or no path exists.
    /// A node's path to itself is `[node]`.
    pub fn path(&self, from: &str, to: &str) -> Vec<String> {
        if !self.kinds.contains_key(from) || !self.kinds.contains_key(to) {
            return vec![];
        }
        if from == to {
            return vec![from.to_string()];
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        visited.insert(from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for next in self.neighbours(current) {
                if !visited.insert(next.as_str()) {
                    continue;
                }
                parent.insert(next.as_str(), current);
                if next == to {
                    return rebuild_path(&parent, from, to);
                }
                queue.push_back(next.as_str());
            }
        }

        vec![]
    }
}

fn rebuild_path(parent: &HashMap<&str, &str>, from: &str, to: &str) -> Vec<String> {
    let mut path = vec![to.to_string()];
    let mut cursor = to;
    while cursor != from {
        match parent.get(cursor) {
            Some(&p) => {
                path.push(p.to_string());
                cursor = p;
            }
            None => return vec![],
        }
    }
    path.reverse();
    path
}
