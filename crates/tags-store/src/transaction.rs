//! Write transactions: the anchor store and relation store mutations.
//!
//! Every mutation goes into one redb write transaction and becomes visible
//! only at [`Transaction::commit`]. Anchors whose refcount drops to zero are
//! not deleted on the spot; they are collected in a pending set and
//! re-checked at commit, so a relation recreated later in the same
//! transaction keeps them alive.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use redb::{Database, ReadableTable, WriteTransaction};
use tags_types::{AnchorId, Label, RelationId, Scalar, Shape};
use tracing::{debug, info, warn};

use crate::error::{Endpoint, RepoError, RepoResult};
use crate::read::{self, impl_graph_read};
use crate::roots::validate_root_name;
use crate::tables::{
    encode_row, root_key, subject_key, AnchorRow, Payload, RelationRow, CONFIG_TABLE,
    FINGERPRINT_INDEX, GRAPH_TABLE, KEY_NEXT_ANCHOR, KEY_NEXT_RELATION, OBJECT_INDEX, ROW_ANCHOR,
    ROW_RELATION, SUBJECT_INDEX,
};

/// Counts of what a committed transaction changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub anchors_created: u64,
    pub anchors_deleted: u64,
    pub relations_added: u64,
    pub relations_removed: u64,
}

/// Marks the repository's single writer slot as taken for its lifetime.
pub(crate) struct WriterGuard<'r> {
    slot: &'r AtomicBool,
    finished: bool,
}

impl<'r> WriterGuard<'r> {
    pub(crate) fn acquire(slot: &'r AtomicBool) -> RepoResult<Self> {
        slot.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RepoError::TransactionInProgress)?;
        Ok(Self {
            slot,
            finished: false,
        })
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("write transaction ended without commit; changes rolled back");
        }
        self.slot.store(false, Ordering::Release);
    }
}

/// An open write transaction over the graph and config tables.
///
/// Dropping a transaction without calling [`commit`](Self::commit) rolls
/// back every change made through it.
pub struct Transaction<'r> {
    pub(crate) txn: WriteTransaction,
    max_label_len: usize,
    next_anchor: u64,
    next_relation: u64,
    /// Anchors that reached zero refcount and zero pins; re-checked at commit.
    pub(crate) pending: BTreeSet<AnchorId>,
    summary: CommitSummary,
    // Declared last so the slot is released after the redb transaction ends.
    guard: WriterGuard<'r>,
}

impl<'r> Transaction<'r> {
    pub(crate) fn begin(db: &Database, slot: &'r AtomicBool, max_label_len: usize) -> RepoResult<Self> {
        let guard = WriterGuard::acquire(slot)?;
        let txn = db.begin_write()?;
        let (next_anchor, next_relation) = {
            let config = txn.open_table(CONFIG_TABLE)?;
            let next_anchor: u64 =
                read::config_value(&config, KEY_NEXT_ANCHOR)?.ok_or(RepoError::NotInitialized)?;
            let next_relation: u64 = read::config_value(&config, KEY_NEXT_RELATION)?
                .ok_or(RepoError::NotInitialized)?;
            (next_anchor, next_relation)
        };
        Ok(Self {
            txn,
            max_label_len,
            next_anchor,
            next_relation,
            pending: BTreeSet::new(),
            summary: CommitSummary::default(),
            guard,
        })
    }

    // -----------------------------------------------------------------------
    // Anchor store
    // -----------------------------------------------------------------------

    /// Return the anchor holding `value`, creating it if no such anchor
    /// exists. Repeated calls with equal values converge on one id.
    ///
    /// An anchor released earlier in this transaction is taken off the
    /// deletion schedule, so the returned id survives commit either way.
    pub fn intern(&mut self, value: &Scalar) -> RepoResult<AnchorId> {
        let encoded = tags_codec::encode(value)?;
        let existing = {
            let fingerprints = self.txn.open_multimap_table(FINGERPRINT_INDEX)?;
            let graph = self.txn.open_table(GRAPH_TABLE)?;
            read::find_encoded(&fingerprints, &graph, &encoded)?
        };
        if let Some(id) = existing {
            if self.pending.remove(&id) {
                debug!(anchor = %id, "re-interned anchor; deletion cancelled");
            }
            return Ok(id);
        }

        let id = self.allocate_anchor();
        let fingerprint = encoded.fingerprint();
        let kind = encoded.kind;
        let row = AnchorRow {
            payload: Payload::Scalar {
                kind,
                bytes: encoded.bytes,
                fingerprint,
            },
            refcount: 0,
            pins: 0,
        };
        self.put_anchor_row(id, &row)?;
        {
            let mut fingerprints = self.txn.open_multimap_table(FINGERPRINT_INDEX)?;
            fingerprints.insert(fingerprint.as_bytes(), id.get())?;
        }
        debug!(anchor = %id, %kind, fp = %fingerprint.short_hex(), "interned new anchor");
        Ok(id)
    }

    /// Create a fresh structural anchor. Never deduplicated.
    pub fn create_structural(&mut self, shape: Shape) -> RepoResult<AnchorId> {
        let id = self.allocate_anchor();
        let row = AnchorRow {
            payload: Payload::Structural(shape),
            refcount: 0,
            pins: 0,
        };
        self.put_anchor_row(id, &row)?;
        debug!(anchor = %id, %shape, "created structural anchor");
        Ok(id)
    }

    /// Drop one reference to an anchor. When nothing references or pins it
    /// any more, it is scheduled for deletion at commit.
    pub fn release(&mut self, id: AnchorId) -> RepoResult<()> {
        let row = self.update_anchor(id, |row| {
            row.refcount = row
                .refcount
                .checked_sub(1)
                .ok_or(RepoError::RefcountUnderflow(id))?;
            Ok(())
        })?;
        if row.is_unreferenced() {
            debug!(anchor = %id, "anchor unreferenced; deletion deferred to commit");
            self.pending.insert(id);
        }
        Ok(())
    }

    /// Delete an anchor and every relation touching it.
    ///
    /// Fails with [`RepoError::AnchorPinned`] while a root binding names it.
    pub fn delete_anchor(&mut self, id: AnchorId) -> RepoResult<()> {
        let row = self.anchor_row(id)?;
        if row.pins > 0 {
            return Err(RepoError::AnchorPinned(id));
        }

        let mut relations: BTreeSet<RelationId> = BTreeSet::new();
        {
            let subjects = self.txn.open_table(SUBJECT_INDEX)?;
            relations.extend(read::out_edge_ids(&subjects, id, None)?);
        }
        {
            let objects = self.txn.open_table(OBJECT_INDEX)?;
            relations.extend(read::in_edge_ids(&objects, id)?);
        }
        for rel in relations {
            self.remove_relation(rel)?;
        }

        let row = self.anchor_row(id)?;
        self.drop_anchor_row(id, &row)?;
        self.pending.remove(&id);
        Ok(())
    }

    fn acquire(&mut self, id: AnchorId) -> RepoResult<()> {
        self.update_anchor(id, |row| {
            row.refcount += 1;
            Ok(())
        })?;
        Ok(())
    }

    fn allocate_anchor(&mut self) -> AnchorId {
        let id = AnchorId::from_raw(self.next_anchor);
        self.next_anchor += 1;
        self.summary.anchors_created += 1;
        id
    }

    fn anchor_row(&self, id: AnchorId) -> RepoResult<AnchorRow> {
        let graph = self.txn.open_table(GRAPH_TABLE)?;
        read::anchor_row(&graph, id)?.ok_or(RepoError::AnchorNotFound(id))
    }

    fn put_anchor_row(&mut self, id: AnchorId, row: &AnchorRow) -> RepoResult<()> {
        let bytes = encode_row(row)?;
        let mut graph = self.txn.open_table(GRAPH_TABLE)?;
        graph.insert((ROW_ANCHOR, id.get()), bytes.as_slice())?;
        Ok(())
    }

    fn update_anchor(
        &mut self,
        id: AnchorId,
        f: impl FnOnce(&mut AnchorRow) -> RepoResult<()>,
    ) -> RepoResult<AnchorRow> {
        let mut row = self.anchor_row(id)?;
        f(&mut row)?;
        self.put_anchor_row(id, &row)?;
        Ok(row)
    }

    fn drop_anchor_row(&mut self, id: AnchorId, row: &AnchorRow) -> RepoResult<()> {
        {
            let mut graph = self.txn.open_table(GRAPH_TABLE)?;
            graph.remove((ROW_ANCHOR, id.get()))?;
        }
        if let Some(fp) = row.fingerprint() {
            let mut fingerprints = self.txn.open_multimap_table(FINGERPRINT_INDEX)?;
            fingerprints.remove(fp.as_bytes(), id.get())?;
        }
        self.summary.anchors_deleted += 1;
        debug!(anchor = %id, "deleted anchor");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Relation store
    // -----------------------------------------------------------------------

    /// Record `subject --label[ordinal]--> object`.
    ///
    /// Fails with [`RepoError::DanglingEndpoint`] if either anchor is
    /// missing and with [`RepoError::DuplicateRelation`] if the
    /// `(subject, label, ordinal)` slot is taken.
    pub fn add_relation(
        &mut self,
        subject: AnchorId,
        label: Label,
        object: AnchorId,
        ordinal: Option<u64>,
    ) -> RepoResult<RelationId> {
        label.check_len(self.max_label_len)?;
        {
            let graph = self.txn.open_table(GRAPH_TABLE)?;
            for (endpoint, anchor) in [(Endpoint::Subject, subject), (Endpoint::Object, object)] {
                if read::anchor_row(&graph, anchor)?.is_none() {
                    return Err(RepoError::DanglingEndpoint { endpoint, anchor });
                }
            }
        }
        let existing = {
            let subjects = self.txn.open_table(SUBJECT_INDEX)?;
            let guard = subjects.get(subject_key(subject, &label, ordinal))?;
            guard.map(|g| RelationId::from_raw(g.value()))
        };
        if let Some(existing) = existing {
            return Err(RepoError::DuplicateRelation {
                subject,
                label,
                ordinal,
                existing,
            });
        }

        let id = RelationId::from_raw(self.next_relation);
        self.next_relation += 1;
        let row = RelationRow {
            subject,
            label,
            object,
            ordinal,
        };
        let bytes = encode_row(&row)?;
        {
            let mut graph = self.txn.open_table(GRAPH_TABLE)?;
            graph.insert((ROW_RELATION, id.get()), bytes.as_slice())?;
            let mut subjects = self.txn.open_table(SUBJECT_INDEX)?;
            subjects.insert(subject_key(subject, &row.label, ordinal), id.get())?;
            let mut objects = self.txn.open_table(OBJECT_INDEX)?;
            objects.insert((object.get(), id.get()), ())?;
        }
        self.acquire(subject)?;
        self.acquire(object)?;
        self.summary.relations_added += 1;
        debug!(relation = %id, %subject, label = %row.label, %object, ?ordinal, "added relation");
        Ok(id)
    }

    /// Delete a relation, releasing both endpoints.
    pub fn remove_relation(&mut self, id: RelationId) -> RepoResult<()> {
        let row = {
            let graph = self.txn.open_table(GRAPH_TABLE)?;
            read::relation_row(&graph, id)?.ok_or(RepoError::RelationNotFound(id))?
        };
        {
            let mut graph = self.txn.open_table(GRAPH_TABLE)?;
            graph.remove((ROW_RELATION, id.get()))?;
            let mut subjects = self.txn.open_table(SUBJECT_INDEX)?;
            subjects.remove(subject_key(row.subject, &row.label, row.ordinal))?;
            let mut objects = self.txn.open_table(OBJECT_INDEX)?;
            objects.remove((row.object.get(), id.get()))?;
        }
        self.release(row.subject)?;
        self.release(row.object)?;
        self.summary.relations_removed += 1;
        debug!(relation = %id, "removed relation");
        Ok(())
    }

    /// Delete every out-edge of `subject`, optionally only those carrying
    /// `label`. Returns how many relations were removed.
    pub fn remove_edges(&mut self, subject: AnchorId, label: Option<&Label>) -> RepoResult<usize> {
        let ids = {
            let subjects = self.txn.open_table(SUBJECT_INDEX)?;
            read::out_edge_ids(&subjects, subject, label)?
        };
        let n = ids.len();
        for id in ids {
            self.remove_relation(id)?;
        }
        Ok(n)
    }

    // -----------------------------------------------------------------------
    // Root bindings
    // -----------------------------------------------------------------------

    /// Bind `name` to `anchor`, pinning it. Rebinding an existing name
    /// unpins the previous anchor, which is returned.
    pub fn bind_root(&mut self, name: &str, anchor: AnchorId) -> RepoResult<Option<AnchorId>> {
        validate_root_name(name)?;
        // Pin first so rebinding to the same anchor never passes through zero.
        self.update_anchor(anchor, |row| {
            row.pins += 1;
            Ok(())
        })?;
        let key = root_key(name);
        let bytes = encode_row(&anchor)?;
        let previous: Option<AnchorId> = {
            let mut config = self.txn.open_table(CONFIG_TABLE)?;
            let previous = read::config_value(&config, &key)?;
            config.insert(key.as_str(), bytes.as_slice())?;
            previous
        };
        if let Some(prev) = previous {
            self.unpin(prev)?;
        }
        info!(root = name, %anchor, "bound root");
        Ok(previous)
    }

    /// Remove the binding for `name`, unpinning its anchor.
    pub fn unbind_root(&mut self, name: &str) -> RepoResult<AnchorId> {
        let key = root_key(name);
        let bound: Option<AnchorId> = {
            let mut config = self.txn.open_table(CONFIG_TABLE)?;
            let bound = read::config_value(&config, &key)?;
            if bound.is_some() {
                config.remove(key.as_str())?;
            }
            bound
        };
        let bound = bound.ok_or_else(|| RepoError::RootNotFound(name.to_string()))?;
        self.unpin(bound)?;
        info!(root = name, anchor = %bound, "unbound root");
        Ok(bound)
    }

    fn unpin(&mut self, id: AnchorId) -> RepoResult<()> {
        let row = self.update_anchor(id, |row| {
            row.pins = row
                .pins
                .checked_sub(1)
                .ok_or(RepoError::PinUnderflow(id))?;
            Ok(())
        })?;
        if row.is_unreferenced() {
            self.pending.insert(id);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Flush deferred deletions and commit atomically.
    pub fn commit(mut self) -> RepoResult<CommitSummary> {
        for id in std::mem::take(&mut self.pending) {
            let row = {
                let graph = self.txn.open_table(GRAPH_TABLE)?;
                read::anchor_row(&graph, id)?
            };
            // Skip anchors already deleted or referenced again since release.
            if let Some(row) = row.filter(AnchorRow::is_unreferenced) {
                self.drop_anchor_row(id, &row)?;
            }
        }
        {
            let next_anchor = encode_row(&self.next_anchor)?;
            let next_relation = encode_row(&self.next_relation)?;
            let mut config = self.txn.open_table(CONFIG_TABLE)?;
            config.insert(KEY_NEXT_ANCHOR, next_anchor.as_slice())?;
            config.insert(KEY_NEXT_RELATION, next_relation.as_slice())?;
        }

        let Self {
            txn,
            summary,
            mut guard,
            ..
        } = self;
        txn.commit()?;
        guard.finish();
        info!(
            anchors_created = summary.anchors_created,
            anchors_deleted = summary.anchors_deleted,
            relations_added = summary.relations_added,
            relations_removed = summary.relations_removed,
            "committed transaction"
        );
        Ok(summary)
    }

    /// Discard every change made in this transaction.
    pub fn abort(self) -> RepoResult<()> {
        let Self { txn, mut guard, .. } = self;
        txn.abort()?;
        guard.finish();
        debug!("aborted transaction");
        Ok(())
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("next_anchor", &self.next_anchor)
            .field("next_relation", &self.next_relation)
            .field("pending", &self.pending.len())
            .field("summary", &self.summary)
            .finish()
    }
}

impl_graph_read!(Transaction<'_>, txn);
