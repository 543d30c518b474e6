//! Anchor store, relation store, and repository for TAGS.
//!
//! A repository is a single redb database holding two logical tables: the
//! *graph* table (anchors, relations, and their indexes) and the *config*
//! table (schema version, id counters, root bindings).
//!
//! # Key Types
//!
//! - [`Repository`]: Opens the database and hands out transactions and snapshots
//! - [`Transaction`]: The only way to mutate the graph; atomic on commit
//! - [`Snapshot`]: Read-only view of the last committed state
//! - [`GraphRead`]: Read operations shared by snapshots and transactions
//!
//! # Lifetime of an anchor
//!
//! Scalar anchors are interned: storing an equal value twice yields the same
//! [`AnchorId`](tags_types::AnchorId). Every relation counts once against
//! each endpoint and every root binding pins its anchor. An anchor with no
//! references and no pins is deleted when the transaction that released it
//! commits. Unreachable cycles are reclaimed by
//! [`Transaction::collect_garbage`].

pub mod config;
pub mod error;
pub mod gc;
pub mod read;
pub mod repository;
pub mod roots;
pub mod tables;
pub mod transaction;

pub use config::RepositoryConfig;
pub use error::{Endpoint, RepoError, RepoResult};
pub use gc::GcReport;
pub use read::{GraphRead, Snapshot};
pub use repository::{RepoStats, Repository};
pub use transaction::{CommitSummary, Transaction};
