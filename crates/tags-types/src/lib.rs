//! Foundation types for TAGS, the Totally Approachable Graph System.
//!
//! TAGS stores object graphs as two primitive record kinds: **anchors**
//! (individually addressable values) and **relations** (labelled, directed
//! links between anchors). This crate provides the vocabulary shared by
//! every other TAGS crate.
//!
//! # Key Types
//!
//! - [`AnchorId`] / [`RelationId`]: Opaque, never-reused record identifiers
//! - [`Fingerprint`]: Content fingerprint used to deduplicate scalar anchors
//! - [`Label`]: Semantic role of a relation (`"item"`, `"name"`, ...)
//! - [`Scalar`] / [`ScalarKind`]: The fixed set of storable scalar values
//! - [`Shape`] / [`AnchorValue`]: Structural marker vs. scalar payload
//! - [`Anchor`] / [`Relation`]: Decoded graph records

pub mod error;
pub mod fingerprint;
pub mod id;
pub mod label;
pub mod record;
pub mod value;

pub use error::TypeError;
pub use fingerprint::Fingerprint;
pub use id::{AnchorId, RelationId};
pub use label::Label;
pub use record::{Anchor, Relation};
pub use value::{AnchorValue, Scalar, ScalarKind, Shape};
