use tags_types::ScalarKind;

/// Errors from encoding or decoding values.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// The value has no codec (e.g. NaN, or an integer outside `i64`).
    #[error("unsupported value kind: {0}")]
    UnsupportedValueKind(String),

    /// Persisted bytes do not decode as the declared kind.
    #[error("malformed {kind} payload: {reason}")]
    Malformed { kind: ScalarKind, reason: String },
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
