use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid label {label:?}: {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("unknown scalar kind tag: {0}")]
    UnknownKind(u8),

    #[error("unknown shape tag: {0}")]
    UnknownShape(u8),
}
