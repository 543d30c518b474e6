//! High-level SDK for TAGS, the Totally Approachable Graph System.
//!
//! Provides a single handle, [`Tags`], for applications embedding TAGS:
//! storing and loading object graphs, naming them with root bindings,
//! JSON conversion, and garbage collection.
//!
//! ```
//! use serde_json::json;
//! use tags_sdk::Tags;
//!
//! let tags = Tags::in_memory().unwrap();
//! tags.save_json("config", &json!({"retries": 3, "hosts": ["a", "b"]})).unwrap();
//! assert_eq!(tags.get_json("config").unwrap()["retries"], json!(3));
//! ```

pub mod config;
pub mod error;
pub mod json;
pub mod tags;
pub mod telemetry;

pub use config::TagsConfig;
pub use error::{SdkError, SdkResult};
pub use tags::Tags;
pub use telemetry::init_tracing;

// Re-export key types
pub use tags_graph::{Node, NodeRef, ObjectGraph, Value};
pub use tags_store::{GcReport, GraphRead, RepoStats, Repository, RepositoryConfig};
pub use tags_types::{AnchorId, Label, RelationId, Scalar, Shape};
