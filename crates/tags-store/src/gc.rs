//! Mark-and-sweep collection of anchors unreachable from any root.
//!
//! Refcounting alone never frees a cycle: two anchors pointing at each other
//! keep each other's counts above zero after their last root is unbound.
//! The collector walks out-edges from every root binding, then strips all
//! out-edges of the anchors it did not reach. Those anchors end with zero
//! refcount and are deleted when the transaction commits.

use std::collections::{HashSet, VecDeque};

use tags_types::AnchorId;
use tracing::info;

use crate::error::RepoResult;
use crate::read::GraphRead;
use crate::transaction::Transaction;

/// What a collection pass found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Anchors present when the pass started.
    pub anchors_scanned: u64,
    /// Anchors reachable from at least one root.
    pub reachable: u64,
    /// Anchors scheduled for deletion.
    pub unreachable: u64,
    /// Relations removed to break unreachable structures apart.
    pub relations_removed: u64,
    /// Anchors actually deleted. Only known once the transaction commits,
    /// so filled in by [`Repository::collect_garbage`](crate::Repository::collect_garbage).
    pub anchors_deleted: u64,
}

impl Transaction<'_> {
    /// Schedule every anchor not reachable from a root for deletion.
    pub fn collect_garbage(&mut self) -> RepoResult<GcReport> {
        let reachable = self.reachable_from_roots()?;
        let all = self.anchor_ids()?;

        let mut report = GcReport {
            anchors_scanned: all.len() as u64,
            reachable: reachable.len() as u64,
            ..Default::default()
        };
        for id in all {
            if reachable.contains(&id) {
                continue;
            }
            report.unreachable += 1;
            report.relations_removed += self.remove_edges(id, None)? as u64;
            self.pending.insert(id);
        }

        info!(
            scanned = report.anchors_scanned,
            unreachable = report.unreachable,
            relations_removed = report.relations_removed,
            "garbage collection pass"
        );
        Ok(report)
    }

    fn reachable_from_roots(&self) -> RepoResult<HashSet<AnchorId>> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<AnchorId> =
            self.list_roots()?.into_iter().map(|(_, id)| id).collect();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            for rel in self.out_edges(id, None)? {
                if !seen.contains(&rel.object) {
                    queue.push_back(rel.object);
                }
            }
        }
        Ok(seen)
    }
}
