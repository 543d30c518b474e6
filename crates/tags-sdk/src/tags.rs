use std::path::Path;

use tags_graph::{NodeRef, ObjectGraph, Value};
use tags_store::{GcReport, GraphRead, RepoStats, Repository, RepositoryConfig, Snapshot};
use tags_types::AnchorId;
use tracing::info;

use crate::config::TagsConfig;
use crate::error::SdkResult;
use crate::json;

/// High-level TAGS API.
///
/// Every mutating call runs in its own transaction; reads see the last
/// committed state. For batching, use [`repository`](Self::repository)
/// and [`tags_graph::store_in`].
#[derive(Debug)]
pub struct Tags {
    repo: Repository,
}

impl Tags {
    /// Open the repository described by `config`.
    pub fn open(config: &TagsConfig) -> SdkResult<Self> {
        match &config.path {
            Some(path) => Self::open_path(path, config.repository.clone()),
            None => Ok(Self {
                repo: Repository::in_memory(config.repository.clone())?,
            }),
        }
    }

    pub fn open_path(path: impl AsRef<Path>, config: RepositoryConfig) -> SdkResult<Self> {
        Ok(Self {
            repo: Repository::open(path, config)?,
        })
    }

    /// A throwaway in-memory repository.
    pub fn in_memory() -> SdkResult<Self> {
        Self::open(&TagsConfig::default())
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn snapshot(&self) -> SdkResult<Snapshot> {
        Ok(self.repo.snapshot()?)
    }

    // ---- Object graphs ----

    pub fn store(&self, graph: &ObjectGraph, root: NodeRef) -> SdkResult<AnchorId> {
        Ok(tags_graph::store(&self.repo, graph, root)?)
    }

    pub fn load(&self, anchor: AnchorId) -> SdkResult<(ObjectGraph, NodeRef)> {
        Ok(tags_graph::load(&self.repo.snapshot()?, anchor)?)
    }

    pub fn store_value(&self, value: &Value) -> SdkResult<AnchorId> {
        Ok(tags_graph::store_value(&self.repo, value)?)
    }

    pub fn load_value(&self, anchor: AnchorId) -> SdkResult<Value> {
        Ok(tags_graph::load_value(&self.repo.snapshot()?, anchor)?)
    }

    pub fn store_json(&self, doc: &serde_json::Value) -> SdkResult<AnchorId> {
        self.store_value(&json::from_json(doc)?)
    }

    pub fn load_json(&self, anchor: AnchorId) -> SdkResult<serde_json::Value> {
        json::to_json(&self.load_value(anchor)?)
    }

    // ---- Named documents ----

    /// Store `value` and bind it as root `name` in one transaction,
    /// returning the new anchor. A previous document under `name` stays in
    /// place until garbage is collected.
    pub fn save(&self, name: &str, value: &Value) -> SdkResult<AnchorId> {
        let (graph, root) = ObjectGraph::from_value(value);
        let anchor = self.repo.with_transaction(|txn| {
            let anchor = tags_graph::store_in(txn, &graph, root)?;
            txn.bind_root(name, anchor)?;
            Ok::<_, crate::SdkError>(anchor)
        })?;
        info!(root = name, %anchor, "saved document");
        Ok(anchor)
    }

    pub fn save_json(&self, name: &str, doc: &serde_json::Value) -> SdkResult<AnchorId> {
        self.save(name, &json::from_json(doc)?)
    }

    /// Load the document bound to `name` as a tree.
    pub fn get(&self, name: &str) -> SdkResult<Value> {
        let snapshot = self.repo.snapshot()?;
        let anchor = snapshot.resolve_root(name)?;
        Ok(tags_graph::load_value(&snapshot, anchor)?)
    }

    pub fn get_json(&self, name: &str) -> SdkResult<serde_json::Value> {
        json::to_json(&self.get(name)?)
    }

    /// Unbind `name` and collect everything that became unreachable, in
    /// one transaction.
    pub fn delete(&self, name: &str) -> SdkResult<GcReport> {
        let mut txn = self.repo.transaction()?;
        txn.unbind_root(name)?;
        let mut report = txn.collect_garbage()?;
        report.anchors_deleted = txn.commit()?.anchors_deleted;
        info!(root = name, anchors_deleted = report.anchors_deleted, "deleted document");
        Ok(report)
    }

    // ---- Roots ----

    pub fn bind_root(&self, name: &str, anchor: AnchorId) -> SdkResult<Option<AnchorId>> {
        Ok(self.repo.bind_root(name, anchor)?)
    }

    pub fn resolve_root(&self, name: &str) -> SdkResult<AnchorId> {
        Ok(self.repo.resolve_root(name)?)
    }

    pub fn unbind_root(&self, name: &str) -> SdkResult<AnchorId> {
        Ok(self.repo.unbind_root(name)?)
    }

    pub fn list_roots(&self) -> SdkResult<Vec<(String, AnchorId)>> {
        Ok(self.repo.snapshot()?.list_roots()?)
    }

    // ---- Maintenance ----

    pub fn collect_garbage(&self) -> SdkResult<GcReport> {
        Ok(self.repo.collect_garbage()?)
    }

    pub fn stats(&self) -> SdkResult<RepoStats> {
        Ok(self.repo.stats()?)
    }

    pub fn close(self) -> SdkResult<()> {
        Ok(self.repo.close()?)
    }
}
