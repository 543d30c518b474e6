//! In-memory object graphs.
//!
//! [`ObjectGraph`] is an arena of [`Node`]s addressed by [`NodeRef`]. A
//! node can be referenced from any number of containers, including itself,
//! so the arena expresses shared sub-objects and cycles without shared
//! ownership. [`Value`] is the tree-shaped counterpart for data that has
//! neither.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tags_types::Scalar;

use crate::error::{GraphError, GraphResult};

/// Index of a node in an [`ObjectGraph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({})", self.0)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One object in the arena.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    /// Ordered elements.
    Sequence(Vec<NodeRef>),
    /// Entries keyed by text.
    Mapping(BTreeMap<String, NodeRef>),
}

/// An arena of nodes that may share children and form cycles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectGraph {
    nodes: Vec<Node>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node: NodeRef) -> Option<&Node> {
        self.nodes.get(node.0)
    }

    /// Iterate over every node with its reference.
    pub fn iter(&self) -> impl Iterator<Item = (NodeRef, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeRef(i), n))
    }

    // ---------------------------------------------------------------
    // Building
    // ---------------------------------------------------------------

    pub fn add(&mut self, node: Node) -> NodeRef {
        self.nodes.push(node);
        NodeRef(self.nodes.len() - 1)
    }

    pub fn scalar(&mut self, value: impl Into<Scalar>) -> NodeRef {
        self.add(Node::Scalar(value.into()))
    }

    /// Add an empty sequence.
    pub fn sequence(&mut self) -> NodeRef {
        self.add(Node::Sequence(Vec::new()))
    }

    /// Add an empty mapping.
    pub fn mapping(&mut self) -> NodeRef {
        self.add(Node::Mapping(BTreeMap::new()))
    }

    /// Append `item` to the sequence `seq`.
    pub fn push(&mut self, seq: NodeRef, item: NodeRef) -> GraphResult<()> {
        self.check(item)?;
        match self.node_mut(seq)? {
            Node::Sequence(items) => {
                items.push(item);
                Ok(())
            }
            _ => Err(GraphError::WrongNodeKind {
                node: seq,
                expected: "sequence",
            }),
        }
    }

    /// Set `key` in the mapping `map`, returning the previous value.
    pub fn insert(
        &mut self,
        map: NodeRef,
        key: impl Into<String>,
        value: NodeRef,
    ) -> GraphResult<Option<NodeRef>> {
        self.check(value)?;
        match self.node_mut(map)? {
            Node::Mapping(entries) => Ok(entries.insert(key.into(), value)),
            _ => Err(GraphError::WrongNodeKind {
                node: map,
                expected: "mapping",
            }),
        }
    }

    pub(crate) fn replace(&mut self, node: NodeRef, with: Node) -> GraphResult<()> {
        *self.node_mut(node)? = with;
        Ok(())
    }

    fn check(&self, node: NodeRef) -> GraphResult<()> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::InvalidNode(node))
        }
    }

    fn node_mut(&mut self, node: NodeRef) -> GraphResult<&mut Node> {
        self.nodes
            .get_mut(node.0)
            .ok_or(GraphError::InvalidNode(node))
    }

    // ---------------------------------------------------------------
    // Trees
    // ---------------------------------------------------------------

    /// Build a graph from a tree, returning the graph and its root.
    pub fn from_value(value: &Value) -> (Self, NodeRef) {
        let mut graph = Self::new();
        let root = graph.add_value(value);
        (graph, root)
    }

    /// Add a tree to this graph. Every tree node becomes a fresh node.
    pub fn add_value(&mut self, value: &Value) -> NodeRef {
        match value {
            Value::Scalar(s) => self.scalar(s.clone()),
            Value::List(items) => {
                let refs = items.iter().map(|v| self.add_value(v)).collect();
                self.add(Node::Sequence(refs))
            }
            Value::Map(entries) => {
                let refs = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.add_value(v)))
                    .collect();
                self.add(Node::Mapping(refs))
            }
        }
    }

    /// Convert the subgraph under `root` into a tree.
    ///
    /// Shared nodes are copied into every position that references them.
    /// Fails with [`GraphError::CycleInTree`] when the subgraph has a cycle.
    pub fn to_value(&self, root: NodeRef) -> GraphResult<Value> {
        let mut path = Vec::new();
        self.to_value_inner(root, &mut path)
    }

    fn to_value_inner(&self, node: NodeRef, path: &mut Vec<NodeRef>) -> GraphResult<Value> {
        if path.contains(&node) {
            return Err(GraphError::CycleInTree(node));
        }
        let value = match self.node(node).ok_or(GraphError::InvalidNode(node))? {
            Node::Scalar(s) => return Ok(Value::Scalar(s.clone())),
            Node::Sequence(items) => {
                path.push(node);
                let items = items
                    .iter()
                    .map(|&item| self.to_value_inner(item, path))
                    .collect::<GraphResult<_>>()?;
                Value::List(items)
            }
            Node::Mapping(entries) => {
                path.push(node);
                let entries = entries
                    .iter()
                    .map(|(k, &v)| -> GraphResult<(String, Value)> {
                        Ok((k.clone(), self.to_value_inner(v, path)?))
                    })
                    .collect::<GraphResult<_>>()?;
                Value::Map(entries)
            }
        };
        path.pop();
        Ok(value)
    }

    // ---------------------------------------------------------------
    // Comparison
    // ---------------------------------------------------------------

    /// Whether the subgraph under `a` has the same shape as the subgraph of
    /// `other` under `b`: equal scalars, equal keys and element order, and
    /// the same sharing and cycle topology among containers.
    ///
    /// Scalars compare by value; two equal scalars count as the same
    /// whether or not they are one node.
    pub fn isomorphic(&self, a: NodeRef, other: &ObjectGraph, b: NodeRef) -> bool {
        let mut forward: HashMap<NodeRef, NodeRef> = HashMap::new();
        let mut backward: HashMap<NodeRef, NodeRef> = HashMap::new();
        let mut stack = vec![(a, b)];

        while let Some((x, y)) = stack.pop() {
            let (Some(nx), Some(ny)) = (self.node(x), other.node(y)) else {
                return false;
            };
            if let (Node::Scalar(p), Node::Scalar(q)) = (nx, ny) {
                if p != q {
                    return false;
                }
                continue;
            }
            match (forward.get(&x), backward.get(&y)) {
                (Some(&fx), Some(&by)) if fx == y && by == x => continue,
                (None, None) => {
                    forward.insert(x, y);
                    backward.insert(y, x);
                }
                _ => return false,
            }
            match (nx, ny) {
                (Node::Sequence(p), Node::Sequence(q)) => {
                    if p.len() != q.len() {
                        return false;
                    }
                    stack.extend(p.iter().copied().zip(q.iter().copied()));
                }
                (Node::Mapping(p), Node::Mapping(q)) => {
                    if !p.keys().eq(q.keys()) {
                        return false;
                    }
                    stack.extend(p.values().copied().zip(q.values().copied()));
                }
                _ => return false,
            }
        }
        true
    }
}

/// A tree-shaped object: no sharing, no cycles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::List(_) => "sequence",
            Self::Map(_) => "mapping",
        }
    }
}

macro_rules! value_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Scalar(v.into())
                }
            }
        )*
    };
}

value_from_scalar!(Scalar, bool, i64, i32, f64, &str, String);

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self::Map(entries)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s:?}"),
            Self::Sequence(items) => write!(f, "sequence[{}]", items.len()),
            Self::Mapping(entries) => write!(f, "mapping{{{}}}", entries.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let mut user = BTreeMap::new();
        user.insert("name".to_string(), Value::from("ada"));
        user.insert(
            "langs".to_string(),
            Value::List(vec![Value::from("en"), Value::from("fr")]),
        );
        user.insert("age".to_string(), Value::from(36i64));
        Value::Map(user)
    }

    #[test]
    fn builder_rejects_wrong_kind() {
        let mut g = ObjectGraph::new();
        let s = g.scalar(1i64);
        let m = g.mapping();
        assert!(matches!(
            g.push(m, s),
            Err(GraphError::WrongNodeKind { expected: "sequence", .. })
        ));
        assert!(matches!(
            g.insert(s, "k", m),
            Err(GraphError::WrongNodeKind { expected: "mapping", .. })
        ));
        assert!(matches!(
            g.push(NodeRef(99), s),
            Err(GraphError::InvalidNode(_))
        ));
        let seq = g.sequence();
        assert!(matches!(g.push(seq, NodeRef(42)), Err(GraphError::InvalidNode(_))));
    }

    #[test]
    fn insert_replaces() {
        let mut g = ObjectGraph::new();
        let m = g.mapping();
        let a = g.scalar("a");
        let b = g.scalar("b");
        assert_eq!(g.insert(m, "k", a).unwrap(), None);
        assert_eq!(g.insert(m, "k", b).unwrap(), Some(a));
    }

    #[test]
    fn tree_roundtrip() {
        let value = sample();
        let (g, root) = ObjectGraph::from_value(&value);
        assert_eq!(g.len(), 6);
        assert_eq!(g.to_value(root).unwrap(), value);
    }

    #[test]
    fn to_value_copies_shared_nodes() {
        let mut g = ObjectGraph::new();
        let shared = g.mapping();
        let x = g.scalar(1i64);
        g.insert(shared, "x", x).unwrap();
        let seq = g.sequence();
        g.push(seq, shared).unwrap();
        g.push(seq, shared).unwrap();

        let Value::List(items) = g.to_value(seq).unwrap() else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], items[1]);
    }

    #[test]
    fn to_value_rejects_cycles() {
        let mut g = ObjectGraph::new();
        let m = g.mapping();
        g.insert(m, "self", m).unwrap();
        assert!(matches!(g.to_value(m), Err(GraphError::CycleInTree(n)) if n == m));
    }

    #[test]
    fn isomorphic_identical_trees() {
        let (a, ra) = ObjectGraph::from_value(&sample());
        let (b, rb) = ObjectGraph::from_value(&sample());
        assert!(a.isomorphic(ra, &b, rb));
    }

    #[test]
    fn isomorphic_detects_value_difference() {
        let (a, ra) = ObjectGraph::from_value(&sample());
        let (b, rb) = ObjectGraph::from_value(&Value::List(vec![]));
        assert!(!a.isomorphic(ra, &b, rb));

        let (c, rc) = ObjectGraph::from_value(&Value::List(vec![Value::from(1i64)]));
        let (d, rd) = ObjectGraph::from_value(&Value::List(vec![Value::from(2i64)]));
        assert!(!c.isomorphic(rc, &d, rd));
    }

    #[test]
    fn isomorphic_distinguishes_sharing() {
        // [m, m] with one shared mapping.
        let mut shared = ObjectGraph::new();
        let m = shared.mapping();
        let s1 = shared.sequence();
        shared.push(s1, m).unwrap();
        shared.push(s1, m).unwrap();

        // [m1, m2] with two equal mappings.
        let mut split = ObjectGraph::new();
        let m1 = split.mapping();
        let m2 = split.mapping();
        let s2 = split.sequence();
        split.push(s2, m1).unwrap();
        split.push(s2, m2).unwrap();

        assert!(!shared.isomorphic(s1, &split, s2));
        assert!(shared.isomorphic(s1, &shared.clone(), s1));
    }

    #[test]
    fn isomorphic_ignores_scalar_identity() {
        let mut one = ObjectGraph::new();
        let x = one.scalar("x");
        let s1 = one.sequence();
        one.push(s1, x).unwrap();
        one.push(s1, x).unwrap();

        let (two, s2) = ObjectGraph::from_value(&Value::List(vec![
            Value::from("x"),
            Value::from("x"),
        ]));
        assert!(one.isomorphic(s1, &two, s2));
    }

    #[test]
    fn isomorphic_cycles() {
        let build = |len: usize| {
            let mut g = ObjectGraph::new();
            let nodes: Vec<_> = (0..len).map(|_| g.mapping()).collect();
            for i in 0..len {
                g.insert(nodes[i], "next", nodes[(i + 1) % len]).unwrap();
            }
            (g, nodes[0])
        };
        let (a, ra) = build(2);
        let (b, rb) = build(2);
        let (c, rc) = build(3);
        assert!(a.isomorphic(ra, &b, rb));
        assert!(!a.isomorphic(ra, &c, rc));
    }

    #[test]
    fn value_serde_roundtrip() {
        let value = sample();
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
