//! Decomposition of object graphs into anchors and relations, and
//! reconstruction back into object graphs.
//!
//! Both directions walk the graph with an explicit worklist and a memo
//! table, so shared sub-objects map to one anchor (or one node) and cycles
//! terminate.
//!
//! # Mapping
//!
//! | object            | anchor                         | out-edges                              |
//! |-------------------|--------------------------------|----------------------------------------|
//! | scalar            | interned scalar anchor         | none                                   |
//! | sequence          | structural, [`Shape::Sequence`]| label `item`, ordinal = element index  |
//! | mapping           | structural, [`Shape::Mapping`] | label = key, no ordinal                |

use std::collections::HashMap;

use tags_store::{GraphRead, Repository, Transaction};
use tags_types::{AnchorId, AnchorValue, Label, Relation, Shape};
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::object::{Node, NodeRef, ObjectGraph, Value};

/// Decompose the subgraph under `root` and commit it in one transaction.
///
/// Any failure rolls back every anchor and relation created by the call.
pub fn store(repo: &Repository, graph: &ObjectGraph, root: NodeRef) -> GraphResult<AnchorId> {
    repo.with_transaction(|txn| store_in(txn, graph, root))
}

/// Decompose a tree and commit it in one transaction.
pub fn store_value(repo: &Repository, value: &Value) -> GraphResult<AnchorId> {
    let (graph, root) = ObjectGraph::from_value(value);
    store(repo, &graph, root)
}

/// Decompose the subgraph under `root` inside an open transaction.
pub fn store_in(
    txn: &mut Transaction<'_>,
    graph: &ObjectGraph,
    root: NodeRef,
) -> GraphResult<AnchorId> {
    let mut decomposer = Decomposer {
        txn,
        graph,
        anchors: HashMap::new(),
        pending: Vec::new(),
    };
    let anchor = decomposer.anchor_for(root)?;

    while let Some(node) = decomposer.pending.pop() {
        decomposer.link_children(node)?;
    }
    debug!(%anchor, nodes = decomposer.anchors.len(), "decomposed object graph");
    Ok(anchor)
}

struct Decomposer<'t, 'r, 'g> {
    txn: &'t mut Transaction<'r>,
    graph: &'g ObjectGraph,
    /// Anchors already assigned to nodes, by node identity.
    anchors: HashMap<NodeRef, AnchorId>,
    /// Containers whose anchor exists but whose relations are not written.
    pending: Vec<NodeRef>,
}

impl Decomposer<'_, '_, '_> {
    fn anchor_for(&mut self, node: NodeRef) -> GraphResult<AnchorId> {
        if let Some(&id) = self.anchors.get(&node) {
            return Ok(id);
        }
        let graph = self.graph;
        let id = match graph.node(node).ok_or(GraphError::InvalidNode(node))? {
            Node::Scalar(value) => self.txn.intern(value)?,
            Node::Sequence(_) => {
                self.pending.push(node);
                self.txn.create_structural(Shape::Sequence)?
            }
            Node::Mapping(_) => {
                self.pending.push(node);
                self.txn.create_structural(Shape::Mapping)?
            }
        };
        self.anchors.insert(node, id);
        Ok(id)
    }

    fn link_children(&mut self, node: NodeRef) -> GraphResult<()> {
        let subject = self.anchor_for(node)?;
        let graph = self.graph;
        match graph.node(node).ok_or(GraphError::InvalidNode(node))? {
            Node::Scalar(_) => {}
            Node::Sequence(items) => {
                for (index, &item) in items.iter().enumerate() {
                    let object = self.anchor_for(item)?;
                    self.txn
                        .add_relation(subject, Label::item(), object, Some(index as u64))?;
                }
            }
            Node::Mapping(entries) => {
                for (key, &value) in entries {
                    let label = Label::new(key.as_str())?;
                    let object = self.anchor_for(value)?;
                    self.txn.add_relation(subject, label, object, None)?;
                }
            }
        }
        Ok(())
    }
}

/// Rebuild the object graph reachable from `anchor`.
///
/// Each anchor becomes exactly one node, so shared sub-objects stay shared
/// and cycles come back as back-references.
pub fn load(reader: &impl GraphRead, anchor: AnchorId) -> GraphResult<(ObjectGraph, NodeRef)> {
    let mut rebuilder = Rebuilder {
        reader,
        graph: ObjectGraph::new(),
        nodes: HashMap::new(),
        pending: Vec::new(),
    };
    let root = rebuilder.node_for(anchor)?;

    while let Some((id, shape)) = rebuilder.pending.pop() {
        rebuilder.fill(id, shape)?;
    }
    debug!(%anchor, nodes = rebuilder.graph.len(), "reconstructed object graph");
    Ok((rebuilder.graph, root))
}

/// Rebuild the object under `anchor` as a tree. Fails on cycles.
pub fn load_value(reader: &impl GraphRead, anchor: AnchorId) -> GraphResult<Value> {
    let (graph, root) = load(reader, anchor)?;
    graph.to_value(root)
}

struct Rebuilder<'a, R> {
    reader: &'a R,
    graph: ObjectGraph,
    /// Nodes already allocated for anchors, by anchor id.
    nodes: HashMap<AnchorId, NodeRef>,
    /// Structural anchors whose node is a placeholder still to be filled.
    pending: Vec<(AnchorId, Shape)>,
}

impl<R: GraphRead> Rebuilder<'_, R> {
    fn node_for(&mut self, id: AnchorId) -> GraphResult<NodeRef> {
        if let Some(&node) = self.nodes.get(&id) {
            return Ok(node);
        }
        let node = match self.reader.get(id)? {
            AnchorValue::Scalar(value) => self.graph.scalar(value),
            AnchorValue::Structural(shape) => {
                self.pending.push((id, shape));
                // Allocated before its children so back-edges resolve to it.
                self.graph.sequence()
            }
        };
        self.nodes.insert(id, node);
        Ok(node)
    }

    fn fill(&mut self, id: AnchorId, shape: Shape) -> GraphResult<()> {
        let edges = self.reader.out_edges(id, None)?;
        let node = match classify(id, shape, &edges)? {
            Shape::Sequence => {
                let items = edges
                    .iter()
                    .map(|rel| self.node_for(rel.object))
                    .collect::<GraphResult<_>>()?;
                Node::Sequence(items)
            }
            _ => {
                let entries = edges
                    .iter()
                    .map(|rel| -> GraphResult<(String, NodeRef)> {
                        Ok((rel.label.as_str().to_string(), self.node_for(rel.object)?))
                    })
                    .collect::<GraphResult<_>>()?;
                Node::Mapping(entries)
            }
        };
        let placeholder = self.node_for(id)?;
        self.graph.replace(placeholder, node)
    }
}

/// Decide whether a structural anchor reads back as a sequence or a mapping.
///
/// Anchors stored with an explicit shape must have matching edges. Bare
/// [`Shape::Node`] anchors are classified by ordinal presence.
fn classify(anchor: AnchorId, shape: Shape, edges: &[Relation]) -> GraphResult<Shape> {
    let ordered = edges.iter().filter(|r| r.ordinal.is_some()).count();
    let unordered = edges.len() - ordered;
    let unrepresentable = |reason: &str| GraphError::Unrepresentable {
        anchor,
        reason: reason.to_string(),
    };
    match shape {
        Shape::Sequence if unordered > 0 => Err(unrepresentable("sequence has unordered relations")),
        Shape::Mapping if ordered > 0 => Err(unrepresentable("mapping has ordered relations")),
        Shape::Sequence | Shape::Mapping => Ok(shape),
        Shape::Node if ordered > 0 && unordered > 0 => {
            Err(unrepresentable("mixes ordered and unordered relations"))
        }
        Shape::Node if ordered > 0 => Ok(Shape::Sequence),
        Shape::Node => Ok(Shape::Mapping),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use tags_codec::CodecError;
    use tags_store::{RepoError, RepositoryConfig};
    use tags_types::Scalar;

    fn repo() -> Repository {
        Repository::in_memory(RepositoryConfig::default()).unwrap()
    }

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    fn document() -> Value {
        map(vec![
            ("title", Value::from("Graphs")),
            ("pages", Value::from(212i64)),
            ("rating", Value::from(4.5)),
            ("draft", Value::from(false)),
            ("cover", Value::from(Scalar::Bytes(vec![0, 159, 146, 150]))),
            ("editor", Value::from(Scalar::Null)),
            (
                "authors",
                Value::List(vec![
                    map(vec![("name", Value::from("ada"))]),
                    map(vec![("name", Value::from("grace"))]),
                ]),
            ),
            ("tags", Value::List(vec![])),
            ("extra", Value::Map(BTreeMap::new())),
        ])
    }

    #[test]
    fn tree_roundtrip() {
        let repo = repo();
        let value = document();
        let id = store_value(&repo, &value).unwrap();
        let snap = repo.snapshot().unwrap();
        assert_eq!(load_value(&snap, id).unwrap(), value);
    }

    #[test]
    fn scalar_root_roundtrip() {
        let repo = repo();
        let id = store_value(&repo, &Value::from("alone")).unwrap();
        assert_eq!(
            load_value(&repo.snapshot().unwrap(), id).unwrap(),
            Value::from("alone")
        );
    }

    #[test]
    fn empty_composites_keep_their_kind() {
        let repo = repo();
        let list = store_value(&repo, &Value::List(vec![])).unwrap();
        let mapping = store_value(&repo, &Value::Map(BTreeMap::new())).unwrap();
        let snap = repo.snapshot().unwrap();
        assert_eq!(load_value(&snap, list).unwrap(), Value::List(vec![]));
        assert_eq!(load_value(&snap, mapping).unwrap(), Value::Map(BTreeMap::new()));
    }

    #[test]
    fn equal_scalars_are_normalized() {
        let repo = repo();
        let a = store_value(&repo, &map(vec![("lang", Value::from("en"))])).unwrap();
        let b = store_value(
            &repo,
            &Value::List(vec![Value::from("en"), Value::from("en")]),
        )
        .unwrap();

        let snap = repo.snapshot().unwrap();
        let en = snap.find_anchor(&Scalar::from("en")).unwrap().unwrap();
        assert_eq!(snap.anchor(en).unwrap().refcount, 3);
        assert_eq!(snap.in_edges(en).unwrap().len(), 3);
        assert!(snap.is_linked(a, en).unwrap());
        assert!(snap.is_linked(b, en).unwrap());
        // Two structural anchors plus one shared scalar.
        assert_eq!(snap.anchor_count().unwrap(), 3);
    }

    #[test]
    fn sequence_ordinals_ascend() {
        let repo = repo();
        let items: Vec<Value> = (0..10).rev().map(|i| Value::from(i as i64)).collect();
        let id = store_value(&repo, &Value::List(items.clone())).unwrap();

        let snap = repo.snapshot().unwrap();
        let edges = snap.out_edges(id, None).unwrap();
        let ordinals: Vec<_> = edges.iter().map(|r| r.ordinal.unwrap()).collect();
        assert_eq!(ordinals, (0..10).collect::<Vec<u64>>());
        assert!(edges.iter().all(|r| r.label == Label::item()));
        assert_eq!(load_value(&snap, id).unwrap(), Value::List(items));
    }

    #[test]
    fn shared_sub_object_stored_once() {
        let mut g = ObjectGraph::new();
        let address = g.mapping();
        let city = g.scalar("Lisbon");
        g.insert(address, "city", city).unwrap();
        let home = g.mapping();
        g.insert(home, "address", address).unwrap();
        let work = g.mapping();
        g.insert(work, "address", address).unwrap();
        let root = g.sequence();
        g.push(root, home).unwrap();
        g.push(root, work).unwrap();

        let repo = repo();
        let id = store(&repo, &g, root).unwrap();
        let snap = repo.snapshot().unwrap();
        // root, home, work, address, "Lisbon"
        assert_eq!(snap.anchor_count().unwrap(), 5);

        let (loaded, loaded_root) = load(&snap, id).unwrap();
        assert_eq!(loaded.len(), 5);
        assert!(g.isomorphic(root, &loaded, loaded_root));

        let Some(Node::Sequence(items)) = loaded.node(loaded_root) else {
            panic!("expected sequence");
        };
        let address_of = |n: NodeRef| match loaded.node(n) {
            Some(Node::Mapping(m)) => m["address"],
            other => panic!("expected mapping, got {other:?}"),
        };
        assert_eq!(address_of(items[0]), address_of(items[1]));
    }

    #[test]
    fn cycles_roundtrip() {
        let mut g = ObjectGraph::new();
        let a = g.mapping();
        let b = g.mapping();
        let name = g.scalar("a");
        g.insert(a, "name", name).unwrap();
        g.insert(a, "next", b).unwrap();
        g.insert(b, "next", a).unwrap();
        g.insert(b, "self", b).unwrap();

        let repo = repo();
        let id = store(&repo, &g, a).unwrap();
        let snap = repo.snapshot().unwrap();
        assert_eq!(snap.anchor_count().unwrap(), 3);

        let (loaded, root) = load(&snap, id).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(g.isomorphic(a, &loaded, root));
        assert!(matches!(
            load_value(&snap, id),
            Err(GraphError::CycleInTree(_))
        ));
    }

    #[test]
    fn self_containing_sequence() {
        let mut g = ObjectGraph::new();
        let s = g.sequence();
        let one = g.scalar(1i64);
        g.push(s, one).unwrap();
        g.push(s, s).unwrap();

        let repo = repo();
        let id = store(&repo, &g, s).unwrap();
        let snap = repo.snapshot().unwrap();
        // A self-loop counts against both of its endpoints.
        assert_eq!(snap.anchor(id).unwrap().refcount, 3);
        let (loaded, root) = load(&snap, id).unwrap();
        let Some(Node::Sequence(items)) = loaded.node(root) else {
            panic!("expected sequence");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(loaded.node(items[0]), Some(&Node::Scalar(Scalar::Int(1))));
        assert_eq!(items[1], root);
    }

    #[test]
    fn unsupported_value_rolls_back_everything() {
        let repo = repo();
        store_value(&repo, &map(vec![("keep", Value::from("me"))])).unwrap();
        let before = repo.stats().unwrap();

        let poisoned = map(vec![
            ("ok", Value::from("fine")),
            (
                "deep",
                Value::List(vec![
                    Value::from(1i64),
                    map(vec![("nan", Value::from(f64::NAN))]),
                ]),
            ),
        ]);
        let err = store_value(&repo, &poisoned).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Repo(RepoError::Codec(CodecError::UnsupportedValueKind(_)))
        ));

        let after = repo.stats().unwrap();
        assert_eq!(after.anchors, before.anchors);
        assert_eq!(after.relations, before.relations);
        assert!(repo.transaction().is_ok());
    }

    #[test]
    fn invalid_key_rolls_back() {
        let repo = repo();
        let err = store_value(&repo, &map(vec![("bad\u{7}key", Value::from(1i64))])).unwrap_err();
        assert!(matches!(err, GraphError::InvalidKey(_)));
        assert_eq!(repo.stats().unwrap().anchors, 0);
    }

    #[test]
    fn store_in_shares_transaction() {
        let repo = repo();
        let mut txn = repo.transaction().unwrap();
        let (g1, r1) = ObjectGraph::from_value(&Value::from("shared"));
        let (g2, r2) = ObjectGraph::from_value(&Value::List(vec![Value::from("shared")]));
        let a = store_in(&mut txn, &g1, r1).unwrap();
        let b = store_in(&mut txn, &g2, r2).unwrap();
        txn.bind_root("list", b).unwrap();
        assert_eq!(txn.out_edges(b, None).unwrap()[0].object, a);
        txn.commit().unwrap();

        let snap = repo.snapshot().unwrap();
        let root = snap.resolve_root("list").unwrap();
        assert_eq!(
            load_value(&snap, root).unwrap(),
            Value::List(vec![Value::from("shared")])
        );
    }

    #[test]
    fn load_missing_anchor() {
        let repo = repo();
        let err = load(&repo.snapshot().unwrap(), AnchorId::from_raw(12)).unwrap_err();
        assert!(matches!(err, GraphError::Repo(RepoError::AnchorNotFound(_))));
    }

    #[test]
    fn bare_nodes_classified_by_ordinals() {
        let repo = repo();
        let mut txn = repo.transaction().unwrap();
        let seq = txn.create_structural(Shape::Node).unwrap();
        let rec = txn.create_structural(Shape::Node).unwrap();
        let mixed = txn.create_structural(Shape::Node).unwrap();
        let x = txn.intern(&Scalar::from("x")).unwrap();
        let y = txn.intern(&Scalar::from("y")).unwrap();
        txn.add_relation(seq, Label::item(), y, Some(1)).unwrap();
        txn.add_relation(seq, Label::item(), x, Some(0)).unwrap();
        txn.add_relation(rec, Label::new("k").unwrap(), x, None).unwrap();
        txn.add_relation(mixed, Label::item(), x, Some(0)).unwrap();
        txn.add_relation(mixed, Label::new("k").unwrap(), y, None).unwrap();

        assert_eq!(
            load_value(&txn, seq).unwrap(),
            Value::List(vec![Value::from("x"), Value::from("y")])
        );
        assert_eq!(
            load_value(&txn, rec).unwrap(),
            map(vec![("k", Value::from("x"))])
        );
        assert!(matches!(
            load(&txn, mixed),
            Err(GraphError::Unrepresentable { anchor, .. }) if anchor == mixed
        ));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn scalar() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::from(Scalar::Null)),
                any::<bool>().prop_map(Value::from),
                any::<i64>().prop_map(Value::from),
                (-1.0e9f64..1.0e9).prop_map(Value::from),
                "[a-z]{0,8}".prop_map(Value::from),
                proptest::collection::vec(any::<u8>(), 0..8)
                    .prop_map(|b| Value::from(Scalar::Bytes(b))),
            ]
        }

        fn value() -> impl Strategy<Value = Value> {
            scalar().prop_recursive(4, 48, 6, |inner| {
                prop_oneof![
                    proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                    proptest::collection::btree_map("[a-z]{0,4}", inner, 0..6)
                        .prop_map(Value::Map),
                ]
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(48))]

            #[test]
            fn trees_roundtrip(v in value()) {
                let repo = repo();
                let id = store_value(&repo, &v).unwrap();
                let snap = repo.snapshot().unwrap();
                prop_assert_eq!(load_value(&snap, id).unwrap(), v);
            }

            #[test]
            fn storing_twice_is_idempotent_for_scalars(v in scalar()) {
                let repo = repo();
                let a = store_value(&repo, &v).unwrap();
                let b = store_value(&repo, &v).unwrap();
                prop_assert_eq!(a, b);
            }
        }
    }
}
