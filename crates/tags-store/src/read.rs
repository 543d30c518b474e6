//! Read access to the graph: the [`GraphRead`] trait, shared by committed
//! [`Snapshot`]s and open [`Transaction`](crate::Transaction)s.
//!
//! Every lookup goes through an index: anchors by id and fingerprint,
//! relations by subject and by object. Nothing here scans the whole graph
//! except the explicit counting and enumeration helpers.

use redb::{ReadTransaction, ReadableMultimapTable, ReadableTable};
use tags_codec::Encoded;
use tags_types::{Anchor, AnchorId, AnchorValue, Label, Relation, RelationId, Scalar};

use crate::error::{RepoError, RepoResult};
use crate::tables::{
    decode_row, AnchorRow, Payload, RelationRow, SubjectKey, KEY_REPOSITORY_ID,
    KEY_SCHEMA_VERSION, ROOT_PREFIX, ROOT_PREFIX_END, ROW_ANCHOR, ROW_RELATION,
};

/// Read operations over the anchor and relation stores.
pub trait GraphRead {
    /// Look up an anchor, returning `None` when it does not exist.
    fn try_anchor(&self, id: AnchorId) -> RepoResult<Option<Anchor>>;

    /// Look up a relation, returning `None` when it does not exist.
    fn try_relation(&self, id: RelationId) -> RepoResult<Option<Relation>>;

    /// Relations whose subject is `id`, optionally restricted to one label.
    ///
    /// Relations with an ordinal come first in ascending ordinal order,
    /// followed by unordered relations in insertion order.
    fn out_edges(&self, id: AnchorId, label: Option<&Label>) -> RepoResult<Vec<Relation>>;

    /// Relations whose object is `id`, in no particular order.
    fn in_edges(&self, id: AnchorId) -> RepoResult<Vec<Relation>>;

    /// Find the anchor holding `value` without creating one.
    fn find_anchor(&self, value: &Scalar) -> RepoResult<Option<AnchorId>>;

    /// Look up a root binding, returning `None` when the name is unbound.
    fn try_resolve_root(&self, name: &str) -> RepoResult<Option<AnchorId>>;

    /// All root bindings, sorted by name.
    fn list_roots(&self) -> RepoResult<Vec<(String, AnchorId)>>;

    /// Every anchor id in ascending order. Scans the graph table.
    fn anchor_ids(&self) -> RepoResult<Vec<AnchorId>>;

    /// Number of anchors. Scans the graph table.
    fn anchor_count(&self) -> RepoResult<u64>;

    /// Number of relations. Scans the graph table.
    fn relation_count(&self) -> RepoResult<u64>;

    /// Look up an anchor, failing with [`RepoError::AnchorNotFound`].
    fn anchor(&self, id: AnchorId) -> RepoResult<Anchor> {
        self.try_anchor(id)?.ok_or(RepoError::AnchorNotFound(id))
    }

    /// The value held by an anchor: a scalar or the structural marker.
    fn get(&self, id: AnchorId) -> RepoResult<AnchorValue> {
        Ok(self.anchor(id)?.value)
    }

    /// Look up a relation, failing with [`RepoError::RelationNotFound`].
    fn relation(&self, id: RelationId) -> RepoResult<Relation> {
        self.try_relation(id)?.ok_or(RepoError::RelationNotFound(id))
    }

    /// Resolve a root binding, failing with [`RepoError::RootNotFound`].
    fn resolve_root(&self, name: &str) -> RepoResult<AnchorId> {
        self.try_resolve_root(name)?
            .ok_or_else(|| RepoError::RootNotFound(name.to_string()))
    }

    /// All relations from `subject` to `object`.
    fn relations_between(&self, subject: AnchorId, object: AnchorId) -> RepoResult<Vec<Relation>> {
        Ok(self
            .out_edges(subject, None)?
            .into_iter()
            .filter(|r| r.object == object)
            .collect())
    }

    /// Whether any relation links `subject` to `object`.
    fn is_linked(&self, subject: AnchorId, object: AnchorId) -> RepoResult<bool> {
        Ok(!self.relations_between(subject, object)?.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Table-level helpers, generic over read-only and writable tables
// ---------------------------------------------------------------------------

pub(crate) fn anchor_row(
    graph: &impl ReadableTable<(u8, u64), &'static [u8]>,
    id: AnchorId,
) -> RepoResult<Option<AnchorRow>> {
    let Some(guard) = graph.get((ROW_ANCHOR, id.get()))? else {
        return Ok(None);
    };
    Ok(Some(decode_row(guard.value())?))
}

pub(crate) fn relation_row(
    graph: &impl ReadableTable<(u8, u64), &'static [u8]>,
    id: RelationId,
) -> RepoResult<Option<RelationRow>> {
    let Some(guard) = graph.get((ROW_RELATION, id.get()))? else {
        return Ok(None);
    };
    Ok(Some(decode_row(guard.value())?))
}

pub(crate) fn anchor(
    graph: &impl ReadableTable<(u8, u64), &'static [u8]>,
    id: AnchorId,
) -> RepoResult<Option<Anchor>> {
    match anchor_row(graph, id)? {
        Some(row) => Ok(Some(row.into_anchor(id)?)),
        None => Ok(None),
    }
}

pub(crate) fn relation(
    graph: &impl ReadableTable<(u8, u64), &'static [u8]>,
    id: RelationId,
) -> RepoResult<Option<Relation>> {
    Ok(relation_row(graph, id)?.map(|row| row.into_relation(id)))
}

pub(crate) fn out_edge_ids(
    subjects: &impl ReadableTable<SubjectKey<'static>, u64>,
    subject: AnchorId,
    label: Option<&Label>,
) -> RepoResult<Vec<RelationId>> {
    let s = subject.get();
    let mut ids = Vec::new();
    match label {
        Some(label) => {
            let lo: SubjectKey<'_> = (s, label.as_str(), 0, 0);
            let hi: SubjectKey<'_> = (s, label.as_str(), 1, u64::MAX);
            for entry in subjects.range(lo..=hi)? {
                let (_, rel) = entry?;
                ids.push(RelationId::from_raw(rel.value()));
            }
        }
        None => {
            let lo: SubjectKey<'_> = (s, "", 0, 0);
            let hi: SubjectKey<'_> = (s.saturating_add(1), "", 0, 0);
            for entry in subjects.range(lo..hi)? {
                let (_, rel) = entry?;
                ids.push(RelationId::from_raw(rel.value()));
            }
        }
    }
    Ok(ids)
}

pub(crate) fn in_edge_ids(
    objects: &impl ReadableTable<(u64, u64), ()>,
    object: AnchorId,
) -> RepoResult<Vec<RelationId>> {
    let o = object.get();
    let mut ids = Vec::new();
    for entry in objects.range((o, 0)..=(o, u64::MAX))? {
        let (key, _) = entry?;
        ids.push(RelationId::from_raw(key.value().1));
    }
    Ok(ids)
}

pub(crate) fn load_relations(
    graph: &impl ReadableTable<(u8, u64), &'static [u8]>,
    ids: Vec<RelationId>,
) -> RepoResult<Vec<Relation>> {
    ids.into_iter()
        .map(|id| relation(graph, id)?.ok_or(RepoError::RelationNotFound(id)))
        .collect()
}

pub(crate) fn find_encoded(
    fingerprints: &impl ReadableMultimapTable<&'static [u8; 32], u64>,
    graph: &impl ReadableTable<(u8, u64), &'static [u8]>,
    encoded: &Encoded,
) -> RepoResult<Option<AnchorId>> {
    let fp = encoded.fingerprint();
    for entry in fingerprints.get(fp.as_bytes())? {
        let id = AnchorId::from_raw(entry?.value());
        let Some(row) = anchor_row(graph, id)? else {
            continue;
        };
        // Fingerprints can collide; only identical bytes are the same value.
        if let Payload::Scalar { kind, bytes, .. } = &row.payload {
            if *kind == encoded.kind && *bytes == encoded.bytes {
                return Ok(Some(id));
            }
        }
    }
    Ok(None)
}

pub(crate) fn config_value<T: for<'de> serde::Deserialize<'de>>(
    config: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> RepoResult<Option<T>> {
    let Some(guard) = config.get(key)? else {
        return Ok(None);
    };
    Ok(Some(decode_row(guard.value())?))
}

pub(crate) fn roots(
    config: &impl ReadableTable<&'static str, &'static [u8]>,
) -> RepoResult<Vec<(String, AnchorId)>> {
    let mut out = Vec::new();
    for entry in config.range(ROOT_PREFIX..ROOT_PREFIX_END)? {
        let (key, value) = entry?;
        let name = key.value().trim_start_matches(ROOT_PREFIX).to_string();
        out.push((name, decode_row(value.value())?));
    }
    Ok(out)
}

pub(crate) fn anchor_ids(
    graph: &impl ReadableTable<(u8, u64), &'static [u8]>,
) -> RepoResult<Vec<AnchorId>> {
    let mut ids = Vec::new();
    for entry in graph.range((ROW_ANCHOR, 0)..=(ROW_ANCHOR, u64::MAX))? {
        let (key, _) = entry?;
        ids.push(AnchorId::from_raw(key.value().1));
    }
    Ok(ids)
}

pub(crate) fn count_rows(
    graph: &impl ReadableTable<(u8, u64), &'static [u8]>,
    kind: u8,
) -> RepoResult<u64> {
    let mut n = 0;
    for entry in graph.range((kind, 0)..=(kind, u64::MAX))? {
        entry?;
        n += 1;
    }
    Ok(n)
}

/// Implements [`GraphRead`] for a type whose `$tx` field has redb's
/// `open_table` / `open_multimap_table` methods.
macro_rules! impl_graph_read {
    ($ty:ty, $tx:ident) => {
        impl $crate::read::GraphRead for $ty {
            fn try_anchor(
                &self,
                id: ::tags_types::AnchorId,
            ) -> $crate::error::RepoResult<Option<::tags_types::Anchor>> {
                let graph = self.$tx.open_table($crate::tables::GRAPH_TABLE)?;
                $crate::read::anchor(&graph, id)
            }

            fn try_relation(
                &self,
                id: ::tags_types::RelationId,
            ) -> $crate::error::RepoResult<Option<::tags_types::Relation>> {
                let graph = self.$tx.open_table($crate::tables::GRAPH_TABLE)?;
                $crate::read::relation(&graph, id)
            }

            fn out_edges(
                &self,
                id: ::tags_types::AnchorId,
                label: Option<&::tags_types::Label>,
            ) -> $crate::error::RepoResult<Vec<::tags_types::Relation>> {
                let ids = {
                    let subjects = self.$tx.open_table($crate::tables::SUBJECT_INDEX)?;
                    $crate::read::out_edge_ids(&subjects, id, label)?
                };
                let graph = self.$tx.open_table($crate::tables::GRAPH_TABLE)?;
                let mut relations = $crate::read::load_relations(&graph, ids)?;
                $crate::tables::sort_out_edges(&mut relations);
                Ok(relations)
            }

            fn in_edges(
                &self,
                id: ::tags_types::AnchorId,
            ) -> $crate::error::RepoResult<Vec<::tags_types::Relation>> {
                let ids = {
                    let objects = self.$tx.open_table($crate::tables::OBJECT_INDEX)?;
                    $crate::read::in_edge_ids(&objects, id)?
                };
                let graph = self.$tx.open_table($crate::tables::GRAPH_TABLE)?;
                $crate::read::load_relations(&graph, ids)
            }

            fn find_anchor(
                &self,
                value: &::tags_types::Scalar,
            ) -> $crate::error::RepoResult<Option<::tags_types::AnchorId>> {
                let encoded = ::tags_codec::encode(value)?;
                let fingerprints = self
                    .$tx
                    .open_multimap_table($crate::tables::FINGERPRINT_INDEX)?;
                let graph = self.$tx.open_table($crate::tables::GRAPH_TABLE)?;
                $crate::read::find_encoded(&fingerprints, &graph, &encoded)
            }

            fn try_resolve_root(
                &self,
                name: &str,
            ) -> $crate::error::RepoResult<Option<::tags_types::AnchorId>> {
                let config = self.$tx.open_table($crate::tables::CONFIG_TABLE)?;
                $crate::read::config_value(&config, &$crate::tables::root_key(name))
            }

            fn list_roots(
                &self,
            ) -> $crate::error::RepoResult<Vec<(String, ::tags_types::AnchorId)>> {
                let config = self.$tx.open_table($crate::tables::CONFIG_TABLE)?;
                $crate::read::roots(&config)
            }

            fn anchor_ids(&self) -> $crate::error::RepoResult<Vec<::tags_types::AnchorId>> {
                let graph = self.$tx.open_table($crate::tables::GRAPH_TABLE)?;
                $crate::read::anchor_ids(&graph)
            }

            fn anchor_count(&self) -> $crate::error::RepoResult<u64> {
                let graph = self.$tx.open_table($crate::tables::GRAPH_TABLE)?;
                $crate::read::count_rows(&graph, $crate::tables::ROW_ANCHOR)
            }

            fn relation_count(&self) -> $crate::error::RepoResult<u64> {
                let graph = self.$tx.open_table($crate::tables::GRAPH_TABLE)?;
                $crate::read::count_rows(&graph, $crate::tables::ROW_RELATION)
            }
        }
    };
}

pub(crate) use impl_graph_read;

/// A read-only view of the last committed state.
///
/// Snapshots never observe writes from a transaction that has not yet
/// committed, and stay consistent while a writer is active.
pub struct Snapshot {
    tx: ReadTransaction,
}

impl Snapshot {
    pub(crate) fn new(tx: ReadTransaction) -> Self {
        Self { tx }
    }

    /// Schema version recorded in the config table.
    pub fn schema_version(&self) -> RepoResult<Option<u32>> {
        let config = self.tx.open_table(crate::tables::CONFIG_TABLE)?;
        config_value(&config, KEY_SCHEMA_VERSION)
    }

    /// Repository identifier recorded at creation.
    pub fn repository_id(&self) -> RepoResult<Option<String>> {
        let config = self.tx.open_table(crate::tables::CONFIG_TABLE)?;
        config_value(&config, KEY_REPOSITORY_ID)
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot").finish_non_exhaustive()
    }
}

impl_graph_read!(Snapshot, tx);
