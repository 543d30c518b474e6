//! The repository handle: opens the backing database, checks its schema,
//! and hands out snapshots and write transactions.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use redb::{Builder, Database, TableError};
use tags_types::AnchorId;
use tracing::{debug, info};

use crate::config::RepositoryConfig;
use crate::error::{RepoError, RepoResult};
use crate::gc::GcReport;
use crate::read::{self, GraphRead, Snapshot};
use crate::tables::{
    encode_row, CONFIG_TABLE, FINGERPRINT_INDEX, GRAPH_TABLE, KEY_NEXT_ANCHOR, KEY_NEXT_RELATION,
    KEY_REPOSITORY_ID, KEY_SCHEMA_VERSION, OBJECT_INDEX, SCHEMA_VERSION, SUBJECT_INDEX,
};
use crate::transaction::{CommitSummary, Transaction};

/// Counts describing a repository at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoStats {
    pub schema_version: u32,
    pub anchors: u64,
    pub relations: u64,
    pub roots: u64,
}

/// An open TAGS repository.
///
/// Any number of [`Snapshot`]s may be open at once. At most one
/// [`Transaction`] may be open; a second call to
/// [`transaction`](Self::transaction) fails with
/// [`RepoError::TransactionInProgress`] instead of blocking.
pub struct Repository {
    db: Database,
    config: RepositoryConfig,
    path: Option<PathBuf>,
    repository_id: String,
    writer: AtomicBool,
}

impl Repository {
    /// Open the repository at `path`, creating it when allowed by
    /// `config.create_if_missing`. A `read_only` config opens existing
    /// repositories only.
    pub fn open(path: impl AsRef<Path>, config: RepositoryConfig) -> RepoResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            if !config.may_create() {
                return Err(RepoError::Missing(path.to_path_buf()));
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!(path = %path.display(), read_only = config.read_only, "opening repository");
        let db = if config.read_only {
            builder(&config).open(path)?
        } else {
            builder(&config).create(path)?
        };
        Self::from_database(db, config, Some(path.to_path_buf()))
    }

    /// A fresh repository held entirely in memory.
    pub fn in_memory(config: RepositoryConfig) -> RepoResult<Self> {
        let db = builder(&config).create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::from_database(db, config, None)
    }

    fn from_database(
        db: Database,
        config: RepositoryConfig,
        path: Option<PathBuf>,
    ) -> RepoResult<Self> {
        let repository_id = match read_header(&db)? {
            Some((version, _)) if version != SCHEMA_VERSION => {
                return Err(RepoError::IncompatibleSchema {
                    found: version,
                    expected: SCHEMA_VERSION,
                });
            }
            Some((_, id)) => id,
            None if config.may_create() => initialize(&db)?,
            None => return Err(RepoError::NotInitialized),
        };
        debug!(%repository_id, "repository ready");
        Ok(Self {
            db,
            config,
            path,
            repository_id,
            writer: AtomicBool::new(false),
        })
    }

    /// Begin a write transaction.
    ///
    /// Fails with [`RepoError::ReadOnly`] when the repository was opened
    /// read-only.
    pub fn transaction(&self) -> RepoResult<Transaction<'_>> {
        if self.config.read_only {
            return Err(RepoError::ReadOnly);
        }
        Transaction::begin(&self.db, &self.writer, self.config.max_label_len)
    }

    /// Run `f` inside a transaction, committing when it succeeds and
    /// rolling back when it fails.
    pub fn with_transaction<T, E>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let mut txn = self.transaction()?;
        let out = f(&mut txn)?;
        txn.commit()?;
        Ok(out)
    }

    /// A read-only view of the last committed state.
    pub fn snapshot(&self) -> RepoResult<Snapshot> {
        Ok(Snapshot::new(self.db.begin_read()?))
    }

    /// Bind `name` to `anchor` in its own transaction.
    pub fn bind_root(&self, name: &str, anchor: AnchorId) -> RepoResult<Option<AnchorId>> {
        self.with_transaction(|txn| txn.bind_root(name, anchor))
    }

    /// Resolve `name` against the last committed state.
    pub fn resolve_root(&self, name: &str) -> RepoResult<AnchorId> {
        self.snapshot()?.resolve_root(name)
    }

    /// Remove the binding for `name` in its own transaction.
    pub fn unbind_root(&self, name: &str) -> RepoResult<AnchorId> {
        self.with_transaction(|txn| txn.unbind_root(name))
    }

    /// Run a full collection pass in its own transaction.
    pub fn collect_garbage(&self) -> RepoResult<GcReport> {
        let mut txn = self.transaction()?;
        let mut report = txn.collect_garbage()?;
        let summary: CommitSummary = txn.commit()?;
        report.anchors_deleted = summary.anchors_deleted;
        Ok(report)
    }

    pub fn stats(&self) -> RepoResult<RepoStats> {
        let snapshot = self.snapshot()?;
        Ok(RepoStats {
            schema_version: snapshot.schema_version()?.unwrap_or(SCHEMA_VERSION),
            anchors: snapshot.anchor_count()?,
            relations: snapshot.relation_count()?,
            roots: snapshot.list_roots()?.len() as u64,
        })
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Backing file, or `None` for in-memory repositories.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the repository, releasing the database file.
    pub fn close(self) -> RepoResult<()> {
        info!(repository_id = %self.repository_id, "closing repository");
        drop(self.db);
        Ok(())
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("repository_id", &self.repository_id)
            .field("path", &self.path)
            .field("config", &self.config)
            .finish()
    }
}

fn builder(config: &RepositoryConfig) -> Builder {
    let mut builder = Database::builder();
    if let Some(bytes) = config.cache_size_bytes {
        builder.set_cache_size(bytes);
    }
    builder
}

/// Schema version and repository id, or `None` for an uninitialized database.
fn read_header(db: &Database) -> RepoResult<Option<(u32, String)>> {
    let tx = db.begin_read()?;
    let config = match tx.open_table(CONFIG_TABLE) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let Some(version) = read::config_value::<u32>(&config, KEY_SCHEMA_VERSION)? else {
        return Ok(None);
    };
    let id = read::config_value::<String>(&config, KEY_REPOSITORY_ID)?.unwrap_or_default();
    Ok(Some((version, id)))
}

fn initialize(db: &Database) -> RepoResult<String> {
    let repository_id = uuid::Uuid::now_v7().to_string();
    let tx = db.begin_write()?;
    {
        tx.open_table(GRAPH_TABLE)?;
        tx.open_multimap_table(FINGERPRINT_INDEX)?;
        tx.open_table(SUBJECT_INDEX)?;
        tx.open_table(OBJECT_INDEX)?;
        let mut config = tx.open_table(CONFIG_TABLE)?;
        // Ids start at 1 so a zeroed id is never valid.
        let entries = [
            (KEY_SCHEMA_VERSION, encode_row(&SCHEMA_VERSION)?),
            (KEY_REPOSITORY_ID, encode_row(&repository_id)?),
            (KEY_NEXT_ANCHOR, encode_row(&1u64)?),
            (KEY_NEXT_RELATION, encode_row(&1u64)?),
        ];
        for (key, value) in &entries {
            config.insert(*key, value.as_slice())?;
        }
    }
    tx.commit()?;
    info!(%repository_id, schema_version = SCHEMA_VERSION, "initialized repository");
    Ok(repository_id)
}
