use thiserror::Error;

use tags_codec::CodecError;
use tags_graph::GraphError;
use tags_store::RepoError;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A stored value has no JSON equivalent.
    #[error("value cannot be represented as JSON: {0}")]
    NotJson(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
