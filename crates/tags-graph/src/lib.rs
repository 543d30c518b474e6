//! Graph assembler for TAGS.
//!
//! Turns in-memory object graphs into anchors and relations
//! ([`store`]) and back ([`load`]). Objects are built in an arena
//! ([`ObjectGraph`]) so that shared sub-objects and cycles have a plain
//! representation; tree-shaped data can use [`Value`] directly.
//!
//! ```
//! use tags_graph::{load_value, store_value, Value};
//! use tags_store::{Repository, RepositoryConfig};
//!
//! let repo = Repository::in_memory(RepositoryConfig::default()).unwrap();
//! let value = Value::List(vec![Value::from("a"), Value::from(1i64)]);
//! let id = store_value(&repo, &value).unwrap();
//! assert_eq!(load_value(&repo.snapshot().unwrap(), id).unwrap(), value);
//! ```

pub mod assemble;
pub mod error;
pub mod object;

pub use assemble::{load, load_value, store, store_in, store_value};
pub use error::{GraphError, GraphResult};
pub use object::{Node, NodeRef, ObjectGraph, Value};
