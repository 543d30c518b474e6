use std::path::PathBuf;

use tags_codec::CodecError;
use tags_types::{AnchorId, Label, RelationId, TypeError};

/// Which end of a relation a [`RepoError::DanglingEndpoint`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Subject,
    Object,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subject => write!(f, "subject"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// Errors from repository, anchor store, and relation store operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// No anchor with this id exists.
    #[error("anchor not found: {0}")]
    AnchorNotFound(AnchorId),

    /// No root is bound under this name.
    #[error("root not found: {0}")]
    RootNotFound(String),

    /// No relation with this id exists.
    #[error("relation not found: {0}")]
    RelationNotFound(RelationId),

    /// A relation endpoint does not exist.
    #[error("dangling {endpoint} endpoint: anchor {anchor} does not exist")]
    DanglingEndpoint { endpoint: Endpoint, anchor: AnchorId },

    /// The `(subject, label, ordinal)` slot is already occupied.
    #[error("duplicate relation: {subject} --{label}--> (ordinal {ordinal:?}) already exists as {existing}")]
    DuplicateRelation {
        subject: AnchorId,
        label: Label,
        ordinal: Option<u64>,
        existing: RelationId,
    },

    /// The anchor is bound as a root and cannot be deleted.
    #[error("anchor {0} is pinned by a root binding")]
    AnchorPinned(AnchorId),

    /// A release was issued for an anchor whose refcount is already zero.
    #[error("refcount underflow on anchor {0}")]
    RefcountUnderflow(AnchorId),

    /// A root binding was removed from an anchor with no pins.
    #[error("pin underflow on anchor {0}")]
    PinUnderflow(AnchorId),

    /// The repository was opened read-only.
    #[error("repository is read-only")]
    ReadOnly,

    /// The repository was written with a different schema version.
    #[error("incompatible schema: found version {found}, expected {expected}")]
    IncompatibleSchema { found: u32, expected: u32 },

    /// The database exists but was never initialized as a TAGS repository.
    #[error("repository not initialized")]
    NotInitialized,

    /// Opening without `create_if_missing` and nothing exists at the path.
    #[error("repository does not exist: {}", .0.display())]
    Missing(PathBuf),

    /// Another write transaction is open on this repository.
    #[error("a write transaction is already in progress")]
    TransactionInProgress,

    /// Invalid root binding name.
    #[error("invalid root name {name:?}: {reason}")]
    InvalidRootName { name: String, reason: String },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// A persisted row could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failure in the underlying storage engine. The enclosing transaction
    /// is rolled back.
    #[error("repository I/O error: {0}")]
    RepositoryIO(#[from] redb::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

macro_rules! storage_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for RepoError {
                fn from(e: $ty) -> Self {
                    Self::RepositoryIO(e.into())
                }
            }
        )*
    };
}

storage_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<bincode::Error> for RepoError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
