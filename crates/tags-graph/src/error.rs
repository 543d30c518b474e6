//! Error types for the graph assembler.

use tags_store::RepoError;
use tags_types::{AnchorId, TypeError};

use crate::object::NodeRef;

/// Errors from decomposing or reconstructing object graphs.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Failure in the repository. The enclosing transaction is rolled back.
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// A mapping key is not a valid relation label.
    #[error("invalid mapping key: {0}")]
    InvalidKey(#[from] TypeError),

    /// A node reference does not belong to the graph it was used with.
    #[error("node not found: {0}")]
    InvalidNode(NodeRef),

    /// A builder call targeted a node of the wrong kind.
    #[error("node {node} is not a {expected}")]
    WrongNodeKind {
        node: NodeRef,
        expected: &'static str,
    },

    /// Converting to a tree reached a node already on the current path.
    #[error("cycle through node {0} cannot be represented as a tree")]
    CycleInTree(NodeRef),

    /// The stored relations of an anchor fit neither a sequence nor a mapping.
    #[error("anchor {anchor} cannot be reconstructed: {reason}")]
    Unrepresentable { anchor: AnchorId, reason: String },
}

/// Convenience alias for assembler results.
pub type GraphResult<T> = Result<T, GraphError>;
